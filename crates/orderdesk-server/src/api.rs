//! Conversation log handlers and the shared API error type.

use crate::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use orderdesk_history::HistoryError;
use orderdesk_types::{ConversationDetail, ConversationRecord, ConversationSummary};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<HistoryError> for ApiError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::NotFound(_) => ApiError::NotFound("Conversation not found".to_string()),
            HistoryError::Conflict(id) => {
                ApiError::Conflict(format!("conversation already exists: {id}"))
            }
            other => ApiError::InternalServerError(other.to_string()),
        }
    }
}

/// Runs `f` with a pooled connection on a blocking thread.
async fn with_conn<T, F>(state: Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        f(&mut *conn)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))?
}

/// Handler for `GET /api/conversations`.
pub async fn list_conversations_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let list = with_conn(state, |conn| Ok(orderdesk_history::list_conversations(conn)?)).await?;
    Ok(Json(list))
}

/// Handler for `GET /api/conversations/{id}`.
pub async fn get_conversation_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let detail = with_conn(state, move |conn| {
        Ok(orderdesk_history::get_conversation(conn, &id)?)
    })
    .await?;
    Ok(Json(detail))
}

/// Handler for `POST /api/conversations`.
pub async fn save_conversation_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(record): Json<ConversationRecord>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if record.conversation_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "conversation_id must not be empty".to_string(),
        ));
    }
    let id = record.conversation_id.clone();
    with_conn(state, move |conn| {
        Ok(orderdesk_history::save_conversation(conn, &record)?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"status": "success", "conversation_id": id})),
    ))
}

/// Handler for `DELETE /api/conversations/{id}`.
pub async fn delete_conversation_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    with_conn(state, move |conn| {
        Ok(orderdesk_history::delete_conversation(conn, &id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
