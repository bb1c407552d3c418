//! Database-backed [`ConversationSink`].

use orderdesk_agent::{ConversationSink, SinkError};
use orderdesk_db::DbPool;
use orderdesk_types::ConversationRecord;

/// Writes ended calls to the conversation log.
///
/// `save` blocks on SQLite, so callers must already be on a blocking thread.
pub struct DbSink {
    pool: DbPool,
}

impl DbSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ConversationSink for DbSink {
    fn save(&self, record: &ConversationRecord) -> Result<(), SinkError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| SinkError(format!("db connection failed: {e}")))?;
        orderdesk_history::save_conversation(&mut conn, record)
            .map_err(|e| SinkError(e.to_string()))
    }
}
