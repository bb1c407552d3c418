//! Conversation record shapes shared by the agent, the history store, and
//! the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ActionType, OrderId, Role, UserId};

/// One line of the call transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    /// Who spoke.
    pub role: Role,
    /// What was said (transcribed for the caller, generated for the agent).
    pub content: String,
    /// When the line was recorded.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TranscriptMessage {
    /// Creates a message stamped with the current time.
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A tool call the agent executed during the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedFunction {
    /// Tool name, e.g. `cancel_order`.
    pub function: String,
    /// The validated arguments the tool ran with.
    #[serde(alias = "args")]
    pub arguments: Value,
    /// When the call started.
    pub timestamp: DateTime<Utc>,
}

/// Everything persisted about a finished call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// UUID assigned when the call ended.
    pub conversation_id: String,
    /// When the call started.
    pub timestamp: DateTime<Utc>,
    /// When the call ended, if it ended cleanly.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Action types in first-seen order.
    #[serde(default)]
    pub action_types: Vec<ActionType>,
    /// Last user id the agent acted on.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Last order id the agent acted on.
    #[serde(default)]
    pub order_id: Option<OrderId>,
    /// Human-readable summary of the call.
    #[serde(default)]
    pub summary: Option<String>,
    /// User and assistant messages, in order.
    #[serde(default)]
    pub conversation_history: Vec<TranscriptMessage>,
    /// Tool calls, in order.
    #[serde(default)]
    pub executed_functions: Vec<ExecutedFunction>,
}

/// A row in the conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation id.
    pub id: String,
    /// When the call started.
    pub timestamp: DateTime<Utc>,
    /// When the call ended.
    pub end_time: Option<DateTime<Utc>>,
    /// Action types in stored order.
    pub action_types: Vec<ActionType>,
    /// User id the call was about.
    pub user_id: Option<String>,
    /// Order id the call was about.
    pub order_id: Option<String>,
    /// Summary text.
    pub summary: Option<String>,
}

/// A conversation with its transcript and tool log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub summary: ConversationSummary,
    pub conversation_history: Vec<TranscriptMessage>,
    pub executed_functions: Vec<ExecutedFunction>,
}
