//! The function-calling contract exposed to the language model.
//!
//! Each tool is described by a JSON-schema definition the pipeline passes to
//! the model. Arguments coming back are validated here before anything runs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use orderdesk_types::{ActionType, IdError, OrderId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::digits::normalize_digits;
use crate::error::ToolError;

/// The tools the agent can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CheckOrderDetails,
    CancelOrder,
    UpdateOrderQuantity,
    EndConversation,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::CheckOrderDetails,
        ToolName::CancelOrder,
        ToolName::UpdateOrderQuantity,
        ToolName::EndConversation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::CheckOrderDetails => "check_order_details",
            ToolName::CancelOrder => "cancel_order",
            ToolName::UpdateOrderQuantity => "update_order_quantity",
            ToolName::EndConversation => "end_conversation",
        }
    }

    /// The action type a successful call of this tool contributes to the
    /// conversation record. `end_conversation` contributes none.
    pub fn action_type(self) -> Option<ActionType> {
        match self {
            ToolName::CheckOrderDetails => Some(ActionType::Check),
            ToolName::CancelOrder => Some(ActionType::Cancel),
            ToolName::UpdateOrderQuantity => Some(ActionType::Update),
            ToolName::EndConversation => None,
        }
    }

    pub fn schema(self) -> ToolSchema {
        let ids = || {
            InputSchema::object()
                .property("user_id", PropertySchema::identifier("ユーザーID（5桁の数字）"), true)
                .property("order_id", PropertySchema::identifier("注文ID（5桁の数字）"), true)
        };
        match self {
            ToolName::CheckOrderDetails => ToolSchema::new(
                self,
                "user_idとorder_idを引数に取り、注文のステータスを返します。user_idとorder_idはともに5桁の数字です。",
                ids(),
            ),
            ToolName::CancelOrder => {
                ToolSchema::new(self, "ユーザーの注文をキャンセルする", ids())
            }
            ToolName::UpdateOrderQuantity => ToolSchema::new(
                self,
                "ユーザーの注文内容（商品の数量）を変更する。一つずつしか変更ができないので注意",
                ids()
                    .property("product_name", PropertySchema::string("商品名"), true)
                    .property(
                        "new_quantity",
                        PropertySchema::integer("新しい数量。0で注文から削除").with_minimum(0),
                        true,
                    ),
            ),
            ToolName::EndConversation => ToolSchema::new(
                self,
                "会話の終わりかけに選択する関数です。サービスの提供が終わりそうなタイミングに利用します。終了前に締めの挨拶を行います。",
                InputSchema::object(),
            ),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// A tool definition in the shape function-calling models expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: ToolName,
    pub description: String,
    pub parameters: InputSchema,
}

impl ToolSchema {
    fn new(name: ToolName, description: &str, parameters: InputSchema) -> Self {
        Self {
            name,
            description: description.to_string(),
            parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

impl InputSchema {
    pub fn object() -> Self {
        Self {
            schema_type: "object",
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn property(mut self, name: &str, schema: PropertySchema, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub prop_type: &'static str,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
}

impl PropertySchema {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            prop_type: "string",
            description: description.into(),
            pattern: None,
            minimum: None,
        }
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self {
            prop_type: "integer",
            ..Self::string(description)
        }
    }

    /// A five-digit identifier. Typed as a string so leading zeros survive.
    pub fn identifier(description: impl Into<String>) -> Self {
        Self {
            pattern: Some("^[0-9]{5}$"),
            ..Self::string(description)
        }
    }

    pub fn with_minimum(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }
}

/// All tool definitions, in a stable order.
pub fn tool_definitions() -> Vec<ToolSchema> {
    ToolName::ALL.into_iter().map(ToolName::schema).collect()
}

/// A validated tool call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ToolCall {
    CheckOrderDetails {
        user_id: UserId,
        order_id: OrderId,
    },
    CancelOrder {
        user_id: UserId,
        order_id: OrderId,
    },
    UpdateOrderQuantity {
        user_id: UserId,
        order_id: OrderId,
        product_name: String,
        new_quantity: u32,
    },
    EndConversation,
}

impl ToolCall {
    /// Arguments as they are written to the executed-function log.
    pub(crate) fn logged_arguments(&self) -> Value {
        match self {
            ToolCall::CheckOrderDetails { user_id, order_id }
            | ToolCall::CancelOrder { user_id, order_id } => json!({
                "user_id": user_id,
                "order_id": order_id,
            }),
            ToolCall::UpdateOrderQuantity {
                user_id,
                order_id,
                product_name,
                new_quantity,
            } => json!({
                "user_id": user_id,
                "order_id": order_id,
                "product_name": product_name,
                "new_quantity": new_quantity,
            }),
            ToolCall::EndConversation => json!({}),
        }
    }
}

/// Why arguments were not turned into a [`ToolCall`].
#[derive(Debug)]
pub(crate) enum ArgumentProblem {
    /// Missing or ill-typed argument.
    Invalid(String),
    /// An identifier was present but is not five digits.
    BadIdentifier {
        field: &'static str,
        heard: String,
        error: IdError,
    },
}

fn arguments_object(args: &Value) -> Result<Map<String, Value>, ArgumentProblem> {
    match args {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        other => Err(ArgumentProblem::Invalid(format!(
            "arguments must be a JSON object, got {other}"
        ))),
    }
}

/// Reads an identifier given as a digit string or as a JSON integer.
///
/// Integers go through `from_number`, which only accepts 10000..=99999 since
/// a number cannot carry a leading zero.
fn identifier<T>(
    args: &Map<String, Value>,
    field: &'static str,
    from_number: fn(i64) -> Result<T, IdError>,
) -> Result<T, ArgumentProblem>
where
    T: FromStr<Err = IdError>,
{
    let bad = move |heard: String| {
        move |error: IdError| ArgumentProblem::BadIdentifier { field, heard, error }
    };
    match args.get(field) {
        None | Some(Value::Null) => {
            Err(ArgumentProblem::Invalid(format!("missing field `{field}`")))
        }
        Some(Value::String(s)) => {
            let text = normalize_digits(s.trim());
            text.parse().map_err(bad(text))
        }
        Some(Value::Number(n)) => match n.as_i64() {
            Some(value) => from_number(value).map_err(bad(n.to_string())),
            None => {
                let text = n.to_string();
                text.parse().map_err(bad(text))
            }
        },
        Some(other) => Err(ArgumentProblem::Invalid(format!(
            "`{field}` must be a string or integer, got {other}"
        ))),
    }
}

fn product_name(args: &Map<String, Value>) -> Result<String, ArgumentProblem> {
    match args.get("product_name") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(ArgumentProblem::Invalid(
            "`product_name` must not be empty".to_string(),
        )),
        None | Some(Value::Null) => Err(ArgumentProblem::Invalid(
            "missing field `product_name`".to_string(),
        )),
        Some(other) => Err(ArgumentProblem::Invalid(format!(
            "`product_name` must be a string, got {other}"
        ))),
    }
}

fn new_quantity(args: &Map<String, Value>) -> Result<u32, ArgumentProblem> {
    match args.get("new_quantity") {
        None | Some(Value::Null) => Err(ArgumentProblem::Invalid(
            "missing field `new_quantity`".to_string(),
        )),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|q| u32::try_from(q).ok())
            .ok_or_else(|| {
                ArgumentProblem::Invalid(format!(
                    "`new_quantity` must be a non-negative integer, got {n}"
                ))
            }),
        Some(other) => Err(ArgumentProblem::Invalid(format!(
            "`new_quantity` must be an integer, got {other}"
        ))),
    }
}

/// Validates raw arguments for the given tool.
pub(crate) fn parse_call(tool: ToolName, args: &Value) -> Result<ToolCall, ArgumentProblem> {
    let args = arguments_object(args)?;
    let call = match tool {
        ToolName::CheckOrderDetails => ToolCall::CheckOrderDetails {
            user_id: identifier(&args, "user_id", UserId::from_number)?,
            order_id: identifier(&args, "order_id", OrderId::from_number)?,
        },
        ToolName::CancelOrder => ToolCall::CancelOrder {
            user_id: identifier(&args, "user_id", UserId::from_number)?,
            order_id: identifier(&args, "order_id", OrderId::from_number)?,
        },
        ToolName::UpdateOrderQuantity => ToolCall::UpdateOrderQuantity {
            user_id: identifier(&args, "user_id", UserId::from_number)?,
            order_id: identifier(&args, "order_id", OrderId::from_number)?,
            product_name: product_name(&args)?,
            new_quantity: new_quantity(&args)?,
        },
        ToolName::EndConversation => ToolCall::EndConversation,
    };
    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().expect("known tool"), tool);
        }
        assert!(matches!(
            "refund_order".parse::<ToolName>(),
            Err(ToolError::UnknownTool(name)) if name == "refund_order"
        ));
    }

    #[test]
    fn definitions_serialize_as_json_schema() {
        let defs = serde_json::to_value(tool_definitions()).expect("should serialize");
        assert_eq!(defs.as_array().map(Vec::len), Some(4));

        let update = &defs[2];
        assert_eq!(update["name"], "update_order_quantity");
        assert_eq!(update["parameters"]["type"], "object");
        assert_eq!(
            update["parameters"]["required"],
            json!(["user_id", "order_id", "product_name", "new_quantity"])
        );
        assert_eq!(
            update["parameters"]["properties"]["order_id"]["pattern"],
            "^[0-9]{5}$"
        );
        assert_eq!(
            update["parameters"]["properties"]["new_quantity"]["minimum"],
            0
        );

        let end = &defs[3];
        assert_eq!(end["parameters"]["properties"], json!({}));
    }

    #[test]
    fn identifiers_accept_strings_and_five_digit_integers() {
        let call = parse_call(
            ToolName::CheckOrderDetails,
            &json!({"user_id": 67890, "order_id": "０１１３５"}),
        )
        .expect("should parse");
        assert_eq!(
            call,
            ToolCall::CheckOrderDetails {
                user_id: "67890".parse().expect("valid"),
                order_id: "01135".parse().expect("valid"),
            }
        );
    }

    #[test]
    fn short_identifier_is_reported_not_invalid() {
        let problem = parse_call(
            ToolName::CancelOrder,
            &json!({"user_id": "67890", "order_id": 1135}),
        )
        .expect_err("should be rejected");
        match problem {
            ArgumentProblem::BadIdentifier {
                field,
                heard,
                error,
            } => {
                assert_eq!(field, "order_id");
                assert_eq!(heard, "1135");
                assert_eq!(error, IdError::OutOfRange(1135));
            }
            other => panic!("expected bad identifier, got {other:?}"),
        }
    }

    #[test]
    fn missing_or_ill_typed_arguments_are_invalid() {
        for args in [
            json!({"user_id": "67890"}),
            json!({"user_id": true, "order_id": "01135"}),
            json!(["67890", "01135"]),
        ] {
            assert!(matches!(
                parse_call(ToolName::CheckOrderDetails, &args),
                Err(ArgumentProblem::Invalid(_))
            ));
        }

        let negative = json!({
            "user_id": "67890", "order_id": "01135",
            "product_name": "スマートウォッチ", "new_quantity": -1
        });
        assert!(matches!(
            parse_call(ToolName::UpdateOrderQuantity, &negative),
            Err(ArgumentProblem::Invalid(_))
        ));
    }

    #[test]
    fn end_conversation_accepts_null_or_empty_args() {
        for args in [Value::Null, json!({})] {
            assert_eq!(
                parse_call(ToolName::EndConversation, &args).expect("should parse"),
                ToolCall::EndConversation
            );
        }
    }

    #[test]
    fn logged_arguments_keep_leading_zeros() {
        let call = ToolCall::UpdateOrderQuantity {
            user_id: "00042".parse().expect("valid"),
            order_id: "01135".parse().expect("valid"),
            product_name: "ポータブル充電器".to_string(),
            new_quantity: 0,
        };
        assert_eq!(
            call.logged_arguments(),
            json!({
                "user_id": "00042",
                "order_id": "01135",
                "product_name": "ポータブル充電器",
                "new_quantity": 0,
            })
        );
    }
}
