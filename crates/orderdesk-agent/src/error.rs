use thiserror::Error;

use crate::tools::ToolName;

/// Errors returned by tool dispatch and session bookkeeping.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: ToolName, reason: String },

    #[error("call session has already ended")]
    SessionEnded,

    #[error("failed to encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure reported by a [`ConversationSink`](crate::ConversationSink).
#[derive(Error, Debug)]
#[error("conversation sink failed: {0}")]
pub struct SinkError(pub String);

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("LiveKit API error: {0}")]
    LiveKit(#[from] livekit_api::access_token::AccessTokenError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
