//! Call-session bridge for the voice pipeline worker, plus agent metadata
//! and LiveKit connection details.

use crate::api::ApiError;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
};
use orderdesk_agent::{
    tool_definitions, AgentConfig, CallSession, ConnectionDetails, HeardIdentifiers,
    SessionSnapshot, ToolError, ToolReply, ToolSchema,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

impl From<ToolError> for ApiError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::UnknownTool(_) => ApiError::NotFound(e.to_string()),
            ToolError::InvalidArguments { .. } => ApiError::BadRequest(e.to_string()),
            ToolError::SessionEnded => ApiError::Conflict(e.to_string()),
            ToolError::Encode(_) => ApiError::InternalServerError(e.to_string()),
        }
    }
}

/// Response body for `POST /api/sessions`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    /// What the agent says first.
    pub greeting: String,
}

/// Request body for `POST /api/sessions/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
}

/// Response body for `POST /api/sessions/{id}/messages`.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub recorded: bool,
    /// Digit runs heard in a caller utterance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heard: Option<HeardIdentifiers>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionQuery {
    pub participant_name: Option<String>,
}

fn find_session(state: &AppState, id: &str) -> Result<Arc<Mutex<CallSession>>, ApiError> {
    let sessions = state
        .sessions
        .read()
        .map_err(|_| ApiError::InternalServerError("session map lock poisoned".to_string()))?;
    sessions
        .get(id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

/// Locks the session on a blocking thread and runs `f` against it.
async fn with_session<T, F>(state: &AppState, id: &str, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut CallSession) -> Result<T, ApiError> + Send + 'static,
{
    let session = find_session(state, id)?;
    tokio::task::spawn_blocking(move || {
        let mut guard = session
            .lock()
            .map_err(|_| ApiError::InternalServerError("session lock poisoned".to_string()))?;
        f(&mut guard)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))?
}

/// Handler for `GET /api/agent/profile`.
pub async fn agent_profile_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<AgentConfig> {
    Json(state.agent.as_ref().clone())
}

/// Handler for `GET /api/agent/tools`.
pub async fn agent_tools_handler() -> Json<Vec<ToolSchema>> {
    Json(tool_definitions())
}

/// Handler for `POST /api/sessions`.
pub async fn create_session_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let session = CallSession::new(state.agent.clone(), state.sink.clone());
    let response = CreateSessionResponse {
        session_id: session.id().to_string(),
        greeting: session.greeting().to_string(),
    };

    state
        .sessions
        .write()
        .map_err(|_| ApiError::InternalServerError("session map lock poisoned".to_string()))?
        .insert(response.session_id.clone(), Arc::new(Mutex::new(session)));

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for `GET /api/sessions/{id}`.
pub async fn get_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = with_session(&state, &id, |session| Ok(session.snapshot())).await?;
    Ok(Json(snapshot))
}

/// Handler for `DELETE /api/sessions/{id}`.
///
/// For calls that drop without `end_conversation`: the session leaves memory
/// and whatever it recorded is saved.
pub async fn close_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session = state
        .sessions
        .write()
        .map_err(|_| ApiError::InternalServerError("session map lock poisoned".to_string()))?
        .remove(&id)
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    crate::background::hang_up(session)
        .await
        .map_err(ApiError::InternalServerError)?;
    tracing::info!(session_id = %id, "call session closed by pipeline");
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `POST /api/sessions/{id}/messages`.
pub async fn record_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let response = with_session(&state, &id, move |session| match payload.role.as_str() {
        "user" => Ok(MessageResponse {
            recorded: true,
            heard: Some(session.record_user_utterance(&payload.content)?),
        }),
        "assistant" => {
            session.record_assistant_utterance(&payload.content)?;
            Ok(MessageResponse {
                recorded: true,
                heard: None,
            })
        }
        other => Err(ApiError::BadRequest(format!(
            "role must be `user` or `assistant`, got `{other}`"
        ))),
    })
    .await?;
    Ok(Json(response))
}

/// Handler for `POST /api/sessions/{id}/tools/{name}`.
///
/// The body is the tool's JSON arguments; an empty body means no arguments.
/// Once `end_conversation` runs, the session is dropped from memory.
pub async fn dispatch_tool_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<ToolReply>, ApiError> {
    let args: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("arguments are not valid JSON: {e}")))?
    };

    let reply = with_session(&state, &id, move |session| {
        Ok(session.dispatch(&name, &args)?)
    })
    .await?;

    if reply.ended {
        state
            .sessions
            .write()
            .map_err(|_| ApiError::InternalServerError("session map lock poisoned".to_string()))?
            .remove(&id);
        tracing::info!(session_id = %id, "call session closed");
    }
    Ok(Json(reply))
}

/// Handler for `GET /api/connection-details`.
pub async fn connection_details_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ConnectionQuery>,
) -> Result<Json<ConnectionDetails>, ApiError> {
    let voice = state
        .voice_service
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("LiveKit is not configured".to_string()))?;
    let name = query.participant_name.as_deref().unwrap_or("caller");
    let details = voice
        .connection_details(name)
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;
    Ok(Json(details))
}
