use serde_json::Value;
use std::borrow::Cow;

/// Payload carried between filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Raw(Vec<u8>),
    Text(String),
    Structured(Value),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Raw(Vec::new())
    }
}

impl Payload {
    /// Structured view of the payload. Byte payloads become (lossy) strings.
    pub fn to_structured(&self) -> Value {
        match self {
            Payload::Raw(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
            Payload::Text(text) => Value::String(text.clone()),
            Payload::Structured(value) => value.clone(),
        }
    }

    /// Borrowing variant of [`Payload::to_structured`].
    pub fn structured_view(&self) -> Cow<'_, Value> {
        match self {
            Payload::Structured(value) => Cow::Borrowed(value),
            other => Cow::Owned(other.to_structured()),
        }
    }

    /// Textual rendering used for opaque content types.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Payload::Raw(bytes) => String::from_utf8_lossy(bytes),
            Payload::Text(text) => Cow::Borrowed(text),
            Payload::Structured(Value::String(text)) => Cow::Borrowed(text),
            Payload::Structured(value) => Cow::Owned(value.to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Raw(_) => "raw",
            Payload::Text(_) => "text",
            Payload::Structured(_) => "structured",
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Structured(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(bytes)
    }
}

/// The single value threaded through a pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Data {
    pub content_type: String,
    pub payload: Payload,
}

impl Data {
    pub fn new<T: Into<String>, P: Into<Payload>>(content_type: T, payload: P) -> Self {
        Self {
            content_type: content_type.into(),
            payload: payload.into(),
        }
    }
}
