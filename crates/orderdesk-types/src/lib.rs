//! Shared types for the orderdesk call-center agent.
//!
//! This crate holds the vocabulary every other crate speaks: the two
//! five-digit identifiers a caller reads out (user id and order id), order
//! statuses, the action types a call is classified under, transcript roles,
//! and the conversation record handed from the agent to the history store.
//!
//! Nothing here touches the database or the network.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod conversation;

pub use conversation::{
    ConversationDetail, ConversationRecord, ConversationSummary, ExecutedFunction,
    TranscriptMessage,
};

/// Number of digits in both user ids and order ids.
pub const ID_DIGITS: usize = 5;

/// Kana reading of each digit, indexed by value.
const DIGIT_READINGS: [&str; 10] = [
    "ぜろ", "いち", "に", "さん", "よん", "ご", "ろく", "なな", "はち", "きゅう",
];

/// Errors produced when a string is not a valid five-digit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The input had the wrong number of digits.
    #[error("expected 5 digits, got {0}")]
    WrongLength(usize),

    /// The input contained something other than ASCII digits.
    #[error("identifier contains a non-digit character: {0:?}")]
    NonDigit(char),

    /// A numeric identifier was outside 10000..=99999 and cannot be
    /// zero-padded unambiguously.
    #[error("numeric identifier out of range: {0}")]
    OutOfRange(i64),
}

fn parse_five_digits(s: &str) -> Result<String, IdError> {
    let trimmed = s.trim();
    if let Some(c) = trimmed.chars().find(|c| !c.is_ascii_digit()) {
        return Err(IdError::NonDigit(c));
    }
    if trimmed.len() != ID_DIGITS {
        return Err(IdError::WrongLength(trimmed.len()));
    }
    Ok(trimmed.to_string())
}

fn spoken_digits(digits: &str) -> String {
    digits
        .bytes()
        .map(|b| DIGIT_READINGS[usize::from(b - b'0')])
        .collect::<Vec<_>>()
        .join(" ")
}

/// A caller's user id: exactly five ASCII digits, leading zeros preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

/// An order id: exactly five ASCII digits, leading zeros preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl UserId {
    /// Returns the five digits as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds an id from an integer in `10000..=99999`.
    pub fn from_number(n: i64) -> Result<Self, IdError> {
        number_to_digits(n).map(Self)
    }

    /// Reads the id one digit at a time, e.g. `01135` -> `ぜろ いち いち さん ご`.
    pub fn spoken(&self) -> String {
        spoken_digits(&self.0)
    }
}

impl OrderId {
    /// Returns the five digits as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds an id from an integer in `10000..=99999`.
    pub fn from_number(n: i64) -> Result<Self, IdError> {
        number_to_digits(n).map(Self)
    }

    /// Reads the id one digit at a time.
    pub fn spoken(&self) -> String {
        spoken_digits(&self.0)
    }
}

fn number_to_digits(n: i64) -> Result<String, IdError> {
    if (10_000..=99_999).contains(&n) {
        Ok(n.to_string())
    } else {
        Err(IdError::OutOfRange(n))
    }
}

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_five_digits(s).map(Self)
    }
}

impl FromStr for OrderId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_five_digits(s).map(Self)
    }
}

impl TryFrom<String> for UserId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for OrderId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of an order.
///
/// Serialized by the Japanese label the agent speaks to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Being prepared; the only status that allows cancellation or edits.
    #[serde(rename = "準備中")]
    Preparing,
    /// Handed to the carrier.
    #[serde(rename = "配送中")]
    Shipping,
    /// Delivered to the customer.
    #[serde(rename = "配達完了")]
    Delivered,
    /// Cancelled by the customer.
    #[serde(rename = "キャンセル済み")]
    Cancelled,
}

impl OrderStatus {
    /// Returns the Japanese label for this status.
    pub fn label(self) -> &'static str {
        match self {
            Self::Preparing => "準備中",
            Self::Shipping => "配送中",
            Self::Delivered => "配達完了",
            Self::Cancelled => "キャンセル済み",
        }
    }

    /// Whether the order's contents may still be changed.
    pub fn is_modifiable(self) -> bool {
        matches!(self, Self::Preparing)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseLabelError {
    /// What was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl FromStr for OrderStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "準備中" => Ok(Self::Preparing),
            "配送中" => Ok(Self::Shipping),
            "配達完了" => Ok(Self::Delivered),
            "キャンセル済み" => Ok(Self::Cancelled),
            _ => Err(ParseLabelError {
                kind: "order status",
                value: s.to_string(),
            }),
        }
    }
}

/// What a call was about, derived from the tools the agent executed.
///
/// Records saved through the API may carry labels the agent never produces;
/// those are kept verbatim as [`ActionType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    /// The caller asked about an order.
    Check,
    /// The caller asked to cancel an order.
    Cancel,
    /// The caller asked to change quantities.
    Update,
    /// No order tool ran during the call.
    Unknown,
    /// Any other free-text label.
    Other(String),
}

impl ActionType {
    /// Returns the Japanese label stored in the conversation log.
    pub fn label(&self) -> &str {
        match self {
            Self::Check => "確認",
            Self::Cancel => "キャンセル",
            Self::Update => "変更",
            Self::Unknown => "不明",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for ActionType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "確認" => Self::Check,
            "キャンセル" => Self::Cancel,
            "変更" => Self::Update,
            "不明" => Self::Unknown,
            _ => Self::Other(label),
        }
    }
}

impl From<ActionType> for String {
    fn from(action: ActionType) -> Self {
        match action {
            ActionType::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

/// Speaker of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions given to the LLM. Never persisted.
    System,
    /// The caller.
    User,
    /// The agent.
    Assistant,
}

impl Role {
    /// Returns the lowercase role name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl FromStr for Role {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(ParseLabelError {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}
