//! Pluggable text codec.
//!
//! The session core never touches `serde_json` directly for framing; it
//! goes through a [`Codec`] so alternative JSON implementations can be
//! swapped in. Deserialization never panics: malformed input comes back as
//! a [`DecodeError`] carrying the underlying parser message.

use serde_json::Value;
use std::fmt;

/// Failure to decode a message text into a value tree.
#[derive(Debug, Clone, thiserror::Error)]
#[error("decode failure: {message}")]
pub struct DecodeError {
    /// Human-readable message from the underlying parser.
    pub message: String,
}

impl DecodeError {
    /// Wrap a parser message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure to serialize a value tree.
#[derive(Debug, thiserror::Error)]
#[error("encode failure: {0}")]
pub struct EncodeError(pub String);

/// Marshals between message text and a generic JSON value tree.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Serialize a value to text.
    fn serialize(&self, value: &Value) -> Result<String, EncodeError>;

    /// Deserialize text to a value. Must not panic on malformed input.
    fn deserialize(&self, text: &str) -> Result<Value, DecodeError>;
}

/// Default codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn serialize(&self, value: &Value) -> Result<String, EncodeError> {
        serde_json::to_string(value).map_err(|e| EncodeError(e.to_string()))
    }

    fn deserialize(&self, text: &str) -> Result<Value, DecodeError> {
        serde_json::from_str(text).map_err(|e| DecodeError::new(e.to_string()))
    }
}
