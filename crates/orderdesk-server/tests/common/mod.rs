#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use orderdesk_agent::{AgentConfig, LiveKitConfig, VoiceService};
use orderdesk_db::{create_pool, DbPool, DbRuntimeSettings};
use orderdesk_server::{app, AppState};
use serde_json::Value;
use tempfile::NamedTempFile;
use tower::ServiceExt;

pub const LIVEKIT_SECRET: &str = "secret-that-is-long-enough-for-hs256";

pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    pub state: AppState,
    // Keeps the database file alive for the test.
    _db_file: NamedTempFile,
}

fn build(voice: Option<VoiceService>) -> TestApp {
    let db_file = NamedTempFile::new().expect("should create temp db file");
    let db_path = db_file.path().to_str().expect("utf-8 path");
    let pool = create_pool(db_path, DbRuntimeSettings::default()).expect("should create pool");
    {
        let conn = pool.get().expect("should get connection");
        orderdesk_db::run_migrations(&conn).expect("migrations should succeed");
    }

    let state = AppState::new(pool.clone(), AgentConfig::default(), voice);
    TestApp {
        router: app(state.clone()),
        pool,
        state,
        _db_file: db_file,
    }
}

pub fn test_app() -> TestApp {
    build(None)
}

pub fn test_app_with_livekit() -> TestApp {
    let voice = VoiceService::new(LiveKitConfig::new(
        "ws://localhost:7880",
        "devkey",
        LIVEKIT_SECRET,
    ))
    .expect("configured LiveKit");
    build(Some(voice))
}

impl TestApp {
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("should build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request should complete");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("should read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };
        (status, json)
    }
}
