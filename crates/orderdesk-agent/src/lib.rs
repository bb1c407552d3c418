//! The call agent: everything between the voice pipeline and the order book.
//!
//! The external pipeline handles audio, transcription, and the language
//! model. For each call it drives a [`CallSession`]:
//!
//! - caller utterances go through [`CallSession::record_user_utterance`],
//!   which reports any digit runs heard so the model can confirm them;
//! - model tool calls go through [`CallSession::dispatch`], which validates
//!   the five-digit identifiers, speaks a filler line, and runs the order
//!   operation;
//! - `end_conversation` says goodbye and hands a
//!   [`ConversationRecord`](orderdesk_types::ConversationRecord) to the
//!   session's [`ConversationSink`].
//!
//! [`VoiceService`] issues LiveKit tokens so the web client can join the
//! room the pipeline listens in.

pub mod config;
pub mod digits;
pub mod error;
pub mod session;
pub mod tools;
pub mod voice;

pub use config::{AgentConfig, LiveKitConfig};
pub use digits::{extract_identifiers, normalize_digits, HeardIdentifiers};
pub use error::{SinkError, ToolError, VoiceError};
pub use session::{CallSession, ConversationSink, SessionSnapshot, ToolReply, Utterance};
pub use tools::{tool_definitions, ToolName, ToolSchema};
pub use voice::{ConnectionDetails, VoiceService};
