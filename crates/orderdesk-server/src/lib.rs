//! orderdesk server library logic.

pub mod api;
pub mod api_sessions;
pub mod background;
pub mod config;
pub mod sink;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use orderdesk_agent::{AgentConfig, CallSession, ConversationSink, VoiceService};
use orderdesk_db::DbPool;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Live call sessions by id.
///
/// The map lock is only held for get/insert/remove. Each session has its own
/// mutex, held for the duration of one dispatch on a blocking thread.
pub type SessionMap = Arc<RwLock<HashMap<String, Arc<Mutex<CallSession>>>>>;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Persona and pipeline settings for new sessions.
    pub agent: Arc<AgentConfig>,
    /// Calls in progress.
    pub sessions: SessionMap,
    /// Where ended calls are written.
    pub sink: Arc<dyn ConversationSink>,
    /// LiveKit token issuer, absent when LiveKit is not configured.
    pub voice_service: Option<Arc<VoiceService>>,
}

impl AppState {
    /// Builds state whose sessions persist into `pool`.
    pub fn new(pool: DbPool, agent: AgentConfig, voice_service: Option<VoiceService>) -> Self {
        Self {
            sink: Arc::new(sink::DbSink::new(pool.clone())),
            pool,
            agent: Arc::new(agent),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            voice_service: voice_service.map(Arc::new),
        }
    }
}

const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/conversations",
            get(api::list_conversations_handler).post(api::save_conversation_handler),
        )
        .route(
            "/api/conversations/{id}",
            get(api::get_conversation_handler).delete(api::delete_conversation_handler),
        )
        .route("/api/agent/profile", get(api_sessions::agent_profile_handler))
        .route("/api/agent/tools", get(api_sessions::agent_tools_handler))
        .route("/api/sessions", post(api_sessions::create_session_handler))
        .route(
            "/api/sessions/{id}",
            get(api_sessions::get_session_handler).delete(api_sessions::close_session_handler),
        )
        .route(
            "/api/sessions/{id}/messages",
            post(api_sessions::record_message_handler),
        )
        .route(
            "/api/sessions/{id}/tools/{name}",
            post(api_sessions::dispatch_tool_handler),
        )
        .route(
            "/api/connection-details",
            get(api_sessions::connection_details_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
