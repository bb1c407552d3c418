//! Conversation log for finished calls.
//!
//! When a call ends the agent produces a
//! [`ConversationRecord`](orderdesk_types::ConversationRecord); this crate
//! writes it to SQLite and reads it back for the admin screens.
//!
//! | Table | Contents |
//! |-------|----------|
//! | `conversations` | one row per call: start/end time, summary, user and order id |
//! | `action_types` | what the call was about, in first-seen order |
//! | `messages` | caller and agent utterances, in order |
//! | `executed_functions` | tool calls with their JSON arguments, in order |
//!
//! A record is written in a single transaction: either every row lands or
//! none do.

mod error;
mod store;

pub use error::HistoryError;
pub use store::{delete_conversation, get_conversation, list_conversations, save_conversation};

#[cfg(test)]
mod tests;
