//! Persistence operations for the conversation log.
//!
//! Timestamps are stored as RFC 3339 strings in UTC with microsecond
//! precision, so lexical order matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use orderdesk_types::{
    ActionType, ConversationDetail, ConversationRecord, ConversationSummary, ExecutedFunction,
    Role, TranscriptMessage,
};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::HistoryError;

fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(s: &str) -> Result<DateTime<Utc>, HistoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| HistoryError::Corrupt(format!("bad timestamp {s:?}: {e}")))
}

/// Writes a finished call and all of its children in one transaction.
///
/// System messages are dropped; only caller and agent lines are kept.
///
/// # Errors
///
/// Returns `HistoryError::Conflict` if the id is already stored, or a
/// database/serialization error. Nothing is written on error.
pub fn save_conversation(
    conn: &mut Connection,
    record: &ConversationRecord,
) -> Result<(), HistoryError> {
    let tx = conn.transaction()?;

    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
        [&record.conversation_id],
        |row| row.get(0),
    )?;
    if exists {
        return Err(HistoryError::Conflict(record.conversation_id.clone()));
    }

    tx.execute(
        "INSERT INTO conversations (id, timestamp, end_time, summary, user_id, order_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.conversation_id,
            encode_time(&record.timestamp),
            record.end_time.as_ref().map(encode_time),
            record.summary,
            record.user_id.as_ref().map(|id| id.as_str()),
            record.order_id.as_ref().map(|id| id.as_str()),
        ],
    )?;

    for (position, action) in record.action_types.iter().enumerate() {
        tx.execute(
            "INSERT INTO action_types (conversation_id, position, action_type)
             VALUES (?1, ?2, ?3)",
            params![record.conversation_id, position as i64, action.label()],
        )?;
    }

    let persisted = record
        .conversation_history
        .iter()
        .filter(|msg| msg.role != Role::System);
    for (seq, msg) in persisted.enumerate() {
        tx.execute(
            "INSERT INTO messages (conversation_id, seq, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.conversation_id,
                seq as i64,
                msg.role.as_str(),
                msg.content,
                encode_time(&msg.timestamp),
            ],
        )?;
    }

    for (seq, func) in record.executed_functions.iter().enumerate() {
        let arguments = serde_json::to_string(&func.arguments)?;
        tx.execute(
            "INSERT INTO executed_functions
                (conversation_id, seq, function_name, arguments, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.conversation_id,
                seq as i64,
                func.function,
                arguments,
                encode_time(&func.timestamp),
            ],
        )?;
    }

    tx.commit()?;

    tracing::info!(
        conversation_id = %record.conversation_id,
        messages = record.conversation_history.len(),
        functions = record.executed_functions.len(),
        "conversation saved"
    );
    Ok(())
}

/// Raw `conversations` row before timestamps are parsed.
struct ConversationRow {
    id: String,
    timestamp: String,
    end_time: Option<String>,
    summary: Option<String>,
    user_id: Option<String>,
    order_id: Option<String>,
}

const CONVERSATION_COLUMNS: &str = "id, timestamp, end_time, summary, user_id, order_id";

fn map_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        end_time: row.get(2)?,
        summary: row.get(3)?,
        user_id: row.get(4)?,
        order_id: row.get(5)?,
    })
}

fn load_action_types(conn: &Connection, id: &str) -> Result<Vec<ActionType>, HistoryError> {
    let mut stmt = conn.prepare(
        "SELECT action_type FROM action_types WHERE conversation_id = ?1 ORDER BY position",
    )?;
    let labels = stmt.query_map([id], |row| row.get::<_, String>(0))?;
    labels
        .map(|label| label.map(ActionType::from).map_err(HistoryError::from))
        .collect()
}

fn into_summary(conn: &Connection, row: ConversationRow) -> Result<ConversationSummary, HistoryError> {
    let action_types = load_action_types(conn, &row.id)?;
    Ok(ConversationSummary {
        timestamp: decode_time(&row.timestamp)?,
        end_time: row.end_time.as_deref().map(decode_time).transpose()?,
        action_types,
        user_id: row.user_id,
        order_id: row.order_id,
        summary: row.summary,
        id: row.id,
    })
}

/// Lists every stored conversation, newest first.
///
/// # Errors
///
/// Returns `HistoryError` on SQL failure or if a stored row cannot be parsed.
pub fn list_conversations(conn: &Connection) -> Result<Vec<ConversationSummary>, HistoryError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations ORDER BY timestamp DESC, id ASC"
    ))?;
    let rows = stmt.query_map([], map_conversation_row)?;

    let mut raw = Vec::new();
    for row in rows {
        raw.push(row?);
    }

    raw.into_iter().map(|row| into_summary(conn, row)).collect()
}

/// Loads one conversation with its transcript and tool log.
///
/// # Errors
///
/// Returns `HistoryError::NotFound` if no conversation has this id.
pub fn get_conversation(conn: &Connection, id: &str) -> Result<ConversationDetail, HistoryError> {
    let row = conn
        .query_row(
            &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
            [id],
            map_conversation_row,
        )
        .optional()?
        .ok_or_else(|| HistoryError::NotFound(id.to_string()))?;
    let summary = into_summary(conn, row)?;

    let mut stmt = conn.prepare(
        "SELECT role, content, timestamp FROM messages
         WHERE conversation_id = ?1 ORDER BY seq",
    )?;
    let rows = stmt.query_map([id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    let mut conversation_history = Vec::new();
    for row in rows {
        let (role, content, timestamp) = row?;
        conversation_history.push(TranscriptMessage {
            role: role
                .parse()
                .map_err(|e| HistoryError::Corrupt(format!("{e}")))?,
            content,
            timestamp: decode_time(&timestamp)?,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT function_name, arguments, timestamp FROM executed_functions
         WHERE conversation_id = ?1 ORDER BY seq",
    )?;
    let rows = stmt.query_map([id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    let mut executed_functions = Vec::new();
    for row in rows {
        let (function, arguments, timestamp) = row?;
        executed_functions.push(ExecutedFunction {
            function,
            arguments: serde_json::from_str(&arguments)?,
            timestamp: decode_time(&timestamp)?,
        });
    }

    Ok(ConversationDetail {
        summary,
        conversation_history,
        executed_functions,
    })
}

/// Deletes a conversation and its children.
///
/// # Errors
///
/// Returns `HistoryError::NotFound` if no conversation has this id.
pub fn delete_conversation(conn: &Connection, id: &str) -> Result<(), HistoryError> {
    let tx = conn.unchecked_transaction()?;
    for table in ["action_types", "messages", "executed_functions"] {
        tx.execute(
            &format!("DELETE FROM {table} WHERE conversation_id = ?1"),
            [id],
        )?;
    }
    let deleted = tx.execute("DELETE FROM conversations WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(HistoryError::NotFound(id.to_string()));
    }
    tx.commit()?;
    tracing::info!(conversation_id = id, "conversation deleted");
    Ok(())
}
