use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RecordError;

/// An error-like value carried in a record's message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLike {
    /// The error type, `Error` unless the record names one.
    pub name: String,
    /// The error message.
    pub message: String,
    /// A stack trace, copied verbatim from the record when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorLike {
    /// Creates an error with the default `Error` name and no stack.
    pub fn new<M: Into<String>>(message: M) -> ErrorLike {
        ErrorLike {
            name: "Error".into(),
            message: message.into(),
            stack: None,
        }
    }
}

impl fmt::Display for ErrorLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

/// The message of a record: either plain text or an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageValue {
    /// A plain diagnostic message.
    Text(String),
    /// An error that should be reported as is.
    Error(ErrorLike),
}

impl MessageValue {
    /// Renders the message as text.
    pub fn to_text(&self) -> String {
        match self {
            MessageValue::Text(text) => text.clone(),
            MessageValue::Error(error) => error.to_string(),
        }
    }
}

impl From<&str> for MessageValue {
    fn from(text: &str) -> MessageValue {
        MessageValue::Text(text.to_owned())
    }
}

impl From<String> for MessageValue {
    fn from(text: String) -> MessageValue {
        MessageValue::Text(text)
    }
}

impl From<ErrorLike> for MessageValue {
    fn from(error: ErrorLike) -> MessageValue {
        MessageValue::Error(error)
    }
}

/// A single structured log record handed over by the logging pipeline.
///
/// The severity is always read from the `level` field.  `tags` and `user`
/// are kept apart from the remaining `fields` since every capture mode
/// treats them specially.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct LogRecord {
    /// The source severity name, e.g. `info` or `error`.
    pub level: String,
    /// The message or error of the record.
    pub message: MessageValue,
    /// Categorical labels, normally a string to string mapping.
    pub tags: Option<Value>,
    /// Identity context, normally a mapping.
    pub user: Option<Value>,
    /// Every other field of the record.
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// Creates a record with a level and a message.
    pub fn new<L, M>(level: L, message: M) -> LogRecord
    where
        L: Into<String>,
        M: Into<MessageValue>,
    {
        LogRecord {
            level: level.into(),
            message: message.into(),
            tags: None,
            user: None,
            fields: Map::new(),
        }
    }

    /// Sets the tags of the record.
    pub fn with_tags<V: Into<Value>>(mut self, tags: V) -> LogRecord {
        self.tags = Some(tags.into());
        self
    }

    /// Sets the user of the record.
    pub fn with_user<V: Into<Value>>(mut self, user: V) -> LogRecord {
        self.user = Some(user.into());
        self
    }

    /// Adds a field to the record.
    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> LogRecord {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns a field of the record.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a field of the record if it holds a string.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl TryFrom<Value> for LogRecord {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<LogRecord, RecordError> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            _ => return Err(RecordError::NotAnObject),
        };

        let level = match fields.remove("level") {
            Some(Value::String(level)) if !level.is_empty() => level,
            _ => return Err(RecordError::MissingLevel),
        };
        let message = match fields.remove("message") {
            Some(message) => message_from_value(message),
            None => return Err(RecordError::MissingMessage),
        };
        let tags = fields.remove("tags");
        let user = fields.remove("user");

        Ok(LogRecord {
            level,
            message,
            tags,
            user,
            fields,
        })
    }
}

fn message_from_value(value: Value) -> MessageValue {
    match value {
        Value::String(text) => MessageValue::Text(text),
        Value::Object(mut error) if error.get("message").map_or(false, Value::is_string) => {
            let message = match error.remove("message") {
                Some(Value::String(message)) => message,
                _ => String::new(),
            };
            MessageValue::Error(ErrorLike {
                name: match error.remove("name") {
                    Some(Value::String(name)) if !name.is_empty() => name,
                    _ => "Error".into(),
                },
                message,
                stack: match error.remove("stack") {
                    Some(Value::String(stack)) => Some(stack),
                    _ => None,
                },
            })
        }
        Value::Null => MessageValue::Text(String::new()),
        other => MessageValue::Text(other.to_string()),
    }
}

/// Whether a value would count as present in a boolean context.
///
/// `null`, `false`, zero and the empty string do not.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Returns the mapping if the value may be applied to a scope.
pub(crate) fn as_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object)
}
