//! One phone call: transcript, tool dispatch, remembered identifiers, and
//! the end-of-call record.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use orderdesk_orders::OrderBook;
use orderdesk_types::{
    ActionType, ConversationRecord, ExecutedFunction, OrderId, Role, TranscriptMessage, UserId,
};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::AgentConfig;
use crate::digits::{extract_identifiers, HeardIdentifiers};
use crate::error::{SinkError, ToolError};
use crate::tools::{parse_call, ArgumentProblem, ToolCall, ToolName};

const NO_ACTION_SUMMARY: &str = "お問い合わせ内容は特定できませんでした";

/// Where finished conversation records go.
pub trait ConversationSink: Send + Sync {
    fn save(&self, record: &ConversationRecord) -> Result<(), SinkError>;
}

/// Something the agent should say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Utterance {
    pub text: String,
    pub allow_interruptions: bool,
}

/// What a tool call produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolReply {
    pub function: ToolName,
    /// False when the arguments were rejected and nothing ran.
    pub executed: bool,
    /// Speech the session already added to the transcript.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub utterances: Vec<Utterance>,
    /// The result handed back to the model.
    pub result: Value,
    pub ended: bool,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub user_id: Option<UserId>,
    pub order_id: Option<OrderId>,
    pub action_types: Vec<ActionType>,
    pub transcript_len: usize,
    pub executed_functions: usize,
    pub ended: bool,
}

/// State for a single call.
///
/// Orders live in the session's own [`OrderBook`], so an order generated by
/// one call is never seen by another.
pub struct CallSession<R = StdRng> {
    id: String,
    started_at: DateTime<Utc>,
    config: Arc<AgentConfig>,
    orders: OrderBook<R>,
    transcript: Vec<TranscriptMessage>,
    executed: Vec<ExecutedFunction>,
    summary_lines: Vec<String>,
    user_id: Option<UserId>,
    order_id: Option<OrderId>,
    sink: Arc<dyn ConversationSink>,
    last_activity: Instant,
    ended: bool,
}

impl CallSession<StdRng> {
    pub fn new(config: Arc<AgentConfig>, sink: Arc<dyn ConversationSink>) -> Self {
        Self::with_orders(config, sink, OrderBook::new())
    }
}

impl<R: Rng> CallSession<R> {
    /// Starts a call over the given order book. The transcript opens with the
    /// system prompt and the greeting.
    pub fn with_orders(
        config: Arc<AgentConfig>,
        sink: Arc<dyn ConversationSink>,
        orders: OrderBook<R>,
    ) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let transcript = vec![
            TranscriptMessage::now(Role::System, config.system_prompt.clone()),
            TranscriptMessage::now(Role::Assistant, config.greeting.clone()),
        ];
        tracing::info!(session_id = %id, "call session started");
        Self {
            id,
            started_at: Utc::now(),
            config,
            orders,
            transcript,
            executed: Vec::new(),
            summary_lines: Vec::new(),
            user_id: None,
            order_id: None,
            sink,
            last_activity: Instant::now(),
            ended: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn greeting(&self) -> &str {
        &self.config.greeting
    }

    pub fn transcript(&self) -> &[TranscriptMessage] {
        &self.transcript
    }

    pub fn executed_functions(&self) -> &[ExecutedFunction] {
        &self.executed
    }

    /// The last user id an order tool ran with.
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// The last order id an order tool ran with.
    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    pub fn orders(&self) -> &OrderBook<R> {
        &self.orders
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Action types from the executed-function log, first-seen order,
    /// `不明` if there are none.
    pub fn action_types(&self) -> Vec<ActionType> {
        let mut actions = Vec::new();
        for func in &self.executed {
            let action = func
                .function
                .parse::<ToolName>()
                .ok()
                .and_then(ToolName::action_type);
            if let Some(action) = action {
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
        }
        if actions.is_empty() {
            actions.push(ActionType::Unknown);
        }
        actions
    }

    /// The summary text as it would be saved right now.
    pub fn summary(&self) -> String {
        if self.summary_lines.is_empty() {
            NO_ACTION_SUMMARY.to_string()
        } else {
            self.summary_lines.join("\n")
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            started_at: self.started_at,
            user_id: self.user_id.clone(),
            order_id: self.order_id.clone(),
            action_types: self.action_types(),
            transcript_len: self.transcript.len(),
            executed_functions: self.executed.len(),
            ended: self.ended,
        }
    }

    fn ensure_active(&self) -> Result<(), ToolError> {
        if self.ended {
            Err(ToolError::SessionEnded)
        } else {
            Ok(())
        }
    }

    /// Records what the caller said and reports the digit runs heard in it.
    pub fn record_user_utterance(&mut self, text: &str) -> Result<HeardIdentifiers, ToolError> {
        self.ensure_active()?;
        self.last_activity = Instant::now();
        let heard = extract_identifiers(text);
        if !heard.misheard.is_empty() {
            tracing::debug!(
                session_id = %self.id,
                misheard = ?heard.misheard,
                "caller gave digits of the wrong length"
            );
        }
        self.transcript.push(TranscriptMessage::now(Role::User, text));
        Ok(heard)
    }

    /// Records something the agent said outside of a tool call.
    pub fn record_assistant_utterance(&mut self, text: &str) -> Result<(), ToolError> {
        self.ensure_active()?;
        self.last_activity = Instant::now();
        self.transcript
            .push(TranscriptMessage::now(Role::Assistant, text));
        Ok(())
    }

    /// Validates and runs a tool call.
    ///
    /// A malformed identifier is not an error: the reply carries an apology
    /// for the model to relay, and nothing is logged or executed.
    pub fn dispatch(&mut self, name: &str, args: &Value) -> Result<ToolReply, ToolError> {
        self.ensure_active()?;
        self.last_activity = Instant::now();
        let tool: ToolName = name.parse()?;

        let call = match parse_call(tool, args) {
            Ok(call) => call,
            Err(ArgumentProblem::Invalid(reason)) => {
                return Err(ToolError::InvalidArguments { tool, reason });
            }
            Err(ArgumentProblem::BadIdentifier {
                field,
                heard,
                error,
            }) => {
                tracing::warn!(
                    session_id = %self.id,
                    tool = %tool,
                    field,
                    heard = %heard,
                    error = %error,
                    "rejected tool call with malformed identifier"
                );
                return Ok(ToolReply {
                    function: tool,
                    executed: false,
                    utterances: Vec::new(),
                    result: json!({
                        "error": "invalid_identifier",
                        "field": field,
                        "heard": heard,
                        "message": apology(field),
                    }),
                    ended: false,
                });
            }
        };

        self.executed.push(ExecutedFunction {
            function: tool.as_str().to_string(),
            arguments: call.logged_arguments(),
            timestamp: Utc::now(),
        });
        tracing::info!(session_id = %self.id, tool = %tool, "executing tool");

        match call {
            ToolCall::CheckOrderDetails { user_id, order_id } => {
                let utterances = self.filler(&user_id, &order_id, |u, o| {
                    format!("ユーザーID{u}、注文ID{o}の注文のステータスを確認中です")
                });
                let order = self.orders.check_order_details(&user_id, &order_id);
                self.summary_lines.push(format!(
                    "注文確認: ユーザーID {user_id} / 注文ID {order_id} ({})",
                    order.status
                ));
                self.remember(user_id, order_id);
                Ok(self.reply(tool, utterances, serde_json::to_value(order)?))
            }
            ToolCall::CancelOrder { user_id, order_id } => {
                let utterances = self.filler(&user_id, &order_id, |u, o| {
                    format!("ユーザーID{u}の注文ID{o}のキャンセル処理を実行中です")
                });
                let outcome = self.orders.cancel_order(&user_id, &order_id);
                self.summary_lines.push(if outcome.cancelled {
                    format!("キャンセル: ユーザーID {user_id} / 注文ID {order_id} 成功")
                } else {
                    format!(
                        "キャンセル不可: ユーザーID {user_id} / 注文ID {order_id} {}",
                        outcome.message
                    )
                });
                self.remember(user_id, order_id);
                Ok(self.reply(tool, utterances, serde_json::to_value(outcome)?))
            }
            ToolCall::UpdateOrderQuantity {
                user_id,
                order_id,
                product_name,
                new_quantity,
            } => {
                let utterances = self.filler(&user_id, &order_id, |u, o| {
                    format!(
                        "ユーザーID{u}の注文ID{o}の商品「{product_name}」の数量を{new_quantity}個に変更しています"
                    )
                });
                let outcome = self.orders.update_order_quantity(
                    &user_id,
                    &order_id,
                    &product_name,
                    new_quantity,
                );
                self.summary_lines.push(format!(
                    "数量変更: ユーザーID {user_id} / 注文ID {order_id} {}",
                    outcome.message
                ));
                self.remember(user_id, order_id);
                Ok(self.reply(tool, utterances, serde_json::to_value(outcome)?))
            }
            ToolCall::EndConversation => Ok(self.finish()),
        }
    }

    /// Ends the call: says goodbye, builds the record, and hands it to the
    /// sink. Equivalent to dispatching `end_conversation`.
    pub fn end_conversation(&mut self) -> Result<ToolReply, ToolError> {
        self.dispatch(ToolName::EndConversation.as_str(), &Value::Null)
    }

    /// Time since the last utterance or tool call.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Closes a call that ended without `end_conversation`, e.g. the caller
    /// hung up. Saves the record as it stands, without a farewell.
    ///
    /// Returns false if the call had already ended.
    pub fn hang_up(&mut self) -> bool {
        if self.ended {
            return false;
        }
        tracing::info!(session_id = %self.id, "call dropped before end_conversation");
        self.persist();
        self.ended = true;
        true
    }

    /// Adds a filler line unless the agent was the last to speak.
    fn filler(
        &mut self,
        user_id: &UserId,
        order_id: &OrderId,
        render: impl FnOnce(&str, &str) -> String,
    ) -> Vec<Utterance> {
        let agent_spoke_last = self
            .transcript
            .last()
            .is_some_and(|msg| msg.role == Role::Assistant);
        if agent_spoke_last {
            return Vec::new();
        }
        let text = render(&user_id.spoken(), &order_id.spoken());
        self.transcript
            .push(TranscriptMessage::now(Role::Assistant, text.clone()));
        vec![Utterance {
            text,
            allow_interruptions: true,
        }]
    }

    fn remember(&mut self, user_id: UserId, order_id: OrderId) {
        self.user_id = Some(user_id);
        self.order_id = Some(order_id);
    }

    fn reply(&self, function: ToolName, utterances: Vec<Utterance>, result: Value) -> ToolReply {
        ToolReply {
            function,
            executed: true,
            utterances,
            result,
            ended: false,
        }
    }

    fn finish(&mut self) -> ToolReply {
        tracing::info!(session_id = %self.id, "ending call");
        let farewell = self.config.farewell.clone();
        self.transcript
            .push(TranscriptMessage::now(Role::Assistant, farewell.clone()));

        self.persist();
        self.ended = true;

        ToolReply {
            function: ToolName::EndConversation,
            executed: true,
            utterances: vec![Utterance {
                text: farewell,
                allow_interruptions: false,
            }],
            result: json!({"status": "success", "message": "会話を終了しました"}),
            ended: true,
        }
    }

    /// Hands the current record to the sink. Failures are logged only.
    fn persist(&self) {
        let record = self.to_record();
        match self.sink.save(&record) {
            Ok(()) => tracing::info!(
                conversation_id = %record.conversation_id,
                "conversation record saved"
            ),
            Err(e) => tracing::error!(
                conversation_id = %record.conversation_id,
                error = %e,
                "failed to save conversation record"
            ),
        }
    }

    /// Builds the record for this call as it stands.
    pub fn to_record(&self) -> ConversationRecord {
        ConversationRecord {
            conversation_id: self.id.clone(),
            timestamp: self.started_at,
            end_time: Some(Utc::now()),
            action_types: self.action_types(),
            user_id: self.user_id.clone(),
            order_id: self.order_id.clone(),
            summary: Some(self.summary()),
            conversation_history: self
                .transcript
                .iter()
                .filter(|msg| msg.role != Role::System)
                .cloned()
                .collect(),
            executed_functions: self.executed.clone(),
        }
    }
}

fn apology(field: &str) -> String {
    let label = if field == "user_id" {
        "ユーザーID"
    } else {
        "注文ID"
    };
    format!(
        "申し訳ありません、{label}を5桁の数字として聞き取れませんでした。もう一度ゆっくりお話しいただけますか。"
    )
}
