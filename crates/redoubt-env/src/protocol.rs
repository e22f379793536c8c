//! Wire protocol: messages from programs, replies back to them.
//!
//! A program's messages are JSON dicts carrying an optional `status` (the
//! response to `run_code`), a `method` naming one of the three referee
//! verbs, and method-specific fields. The dynamic strings are pinned down
//! into the [`Command`] sum type at the edge; everything past the parse is
//! statically typed.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The `status` value a healthy `run_code` reply carries.
pub const STATUS_SUCCESS: &str = "success";

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One raw message from a player program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Program status, present on the reply to `run_code`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Referee verb to dispatch to; messages without one are dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Method-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Message {
    /// A `select` request over the given field queries.
    pub fn select(fields: Vec<Value>) -> Self {
        let mut msg = Self {
            method: Some("select".to_owned()),
            ..Self::default()
        };
        msg.fields.insert("fields".to_owned(), Value::Array(fields));
        msg
    }

    /// A `set_action` request.
    pub fn set_action(action: &str, data: Value) -> Self {
        let mut msg = Self {
            method: Some("set_action".to_owned()),
            ..Self::default()
        };
        msg.fields.insert("action".to_owned(), json!(action));
        msg.fields.insert("data".to_owned(), data);
        msg
    }

    /// A `subscribe` request.
    pub fn subscribe(event: &str, lookup_key: &str, data: Value) -> Self {
        let mut msg = Self {
            method: Some("subscribe".to_owned()),
            ..Self::default()
        };
        msg.fields.insert("event".to_owned(), json!(event));
        msg.fields.insert("lookup_key".to_owned(), json!(lookup_key));
        msg.fields.insert("data".to_owned(), data);
        msg
    }

    /// Tag a message with a status, as the first reply to `run_code` is.
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_owned());
        self
    }

    /// Parse the message into a typed [`Command`].
    pub fn command(&self) -> Result<Command, CommandError> {
        let method = self.method.as_deref().ok_or(CommandError::NoMethod)?;
        match method {
            "select" => {
                let fields = self
                    .fields
                    .get("fields")
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or(CommandError::MissingField {
                        method: "select",
                        field: "fields",
                    })?;
                Ok(Command::Select { fields })
            }
            "set_action" => {
                let action = self
                    .fields
                    .get("action")
                    .and_then(Value::as_str)
                    .ok_or(CommandError::MissingField {
                        method: "set_action",
                        field: "action",
                    })?
                    .to_owned();
                let data = self.fields.get("data").cloned().unwrap_or(Value::Null);
                Ok(Command::SetAction { action, data })
            }
            "subscribe" => {
                let event = self
                    .fields
                    .get("event")
                    .and_then(Value::as_str)
                    .ok_or(CommandError::MissingField {
                        method: "subscribe",
                        field: "event",
                    })?
                    .to_owned();
                let lookup_key = self
                    .fields
                    .get("lookup_key")
                    .and_then(Value::as_str)
                    .ok_or(CommandError::MissingField {
                        method: "subscribe",
                        field: "lookup_key",
                    })?
                    .to_owned();
                let data = self.fields.get("data").cloned().unwrap_or(Value::Null);
                Ok(Command::Subscribe {
                    event,
                    lookup_key,
                    data,
                })
            }
            other => Err(CommandError::UnknownMethod(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A parsed program request -- one variant per referee verb.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Query battle state; each entry is a `{field, data}` dict.
    Select { fields: Vec<Value> },
    /// Replace the item's pending action.
    SetAction { action: String, data: Value },
    /// Register a one-shot event subscription.
    Subscribe {
        event: String,
        lookup_key: String,
        data: Value,
    },
}

/// Why a message did not parse into a [`Command`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The message carries no `method`; such messages are dropped.
    #[error("message has no method")]
    NoMethod,

    /// The method name is not one of the referee verbs.
    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    /// A required field is absent or has the wrong shape.
    #[error("method '{method}' is missing field '{field}'")]
    MissingField {
        method: &'static str,
        field: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// One reply from the referee to a program.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Responses to a `select`, in query order.
    SelectResult(Vec<Value>),
    /// A `set_action` or `subscribe` succeeded.
    Confirm,
    /// A request was rejected; the payload is the stringified error.
    BadAction(Option<String>),
    /// A fired subscription.
    Event { lookup_key: String, data: Value },
}

impl Reply {
    /// The canonical JSON frame a transport would write.
    pub fn to_wire(&self) -> Value {
        match self {
            Reply::SelectResult(data) => json!({"status": 200, "data": data}),
            Reply::Confirm => json!({"status": 200}),
            Reply::BadAction(None) => json!({"status": 400}),
            Reply::BadAction(Some(error)) => {
                json!({"status": 400, "data": {"error": error}})
            }
            Reply::Event { lookup_key, data } => {
                json!({"action": "event", "lookup_key": lookup_key, "data": data})
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
