//! Error types for the conversation log.

/// Errors that can occur while reading or writing conversations.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// A database operation failed.
    #[error("history database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Tool arguments could not be encoded or decoded.
    #[error("history serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No conversation has the given id.
    #[error("conversation not found: {0}")]
    NotFound(String),

    /// A conversation with the given id is already stored.
    #[error("conversation already exists: {0}")]
    Conflict(String),

    /// A stored value could not be parsed back into its type.
    #[error("corrupt conversation row: {0}")]
    Corrupt(String),
}
