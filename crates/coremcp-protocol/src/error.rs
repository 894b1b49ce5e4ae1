//! Typed error model.
//!
//! One enum covers the four error kinds the protocol distinguishes:
//! protocol errors produced by the wire parser, method errors returned by
//! handlers, internal errors from the error middleware, and the local-only
//! kinds that surface on server-originated requests (client rejections,
//! timeouts, cancellation). [`McpError::to_wire`] renders the wire-facing
//! subset into a JSON-RPC error object with its code and data payload.

use serde_json::{json, Value};

use crate::error_codes;
use crate::jsonrpc::JsonRpcError;

/// Error type used throughout the session core.
#[derive(Debug, Clone, thiserror::Error)]
pub enum McpError {
    /// Message text could not be decoded (-32700).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Envelope violated JSON-RPC 2.0 (-32600).
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    /// `initialize` carried a protocol revision outside the supported set
    /// (-32600, data names the allowed revisions).
    #[error("Unsupported protocol version: {requested}")]
    UnsupportedProtocolVersion {
        /// Revision the client asked for.
        requested: String,
        /// Revisions the server accepts.
        supported: Vec<String>,
    },

    /// No handler registered for the method (-32601).
    #[error("Method '{0}' not found")]
    MethodNotFound(String),

    /// Parameters missing or malformed for the method (-32602).
    #[error("{0}")]
    InvalidParams(String),

    /// Handler panicked or failed unexpectedly (-32603).
    #[error("{0}")]
    Internal(String),

    /// No resource at the requested URI (-32002, data carries the URI).
    #[error("Resource not found: {uri}")]
    ResourceNotFound {
        /// The URI that failed to resolve.
        uri: String,
    },

    /// A server-originated request exceeded its deadline. Never written to
    /// the wire; surfaces only to the local caller awaiting the response.
    #[error("Client request timed out after {after_ms}ms")]
    Timeout {
        /// Configured timeout that elapsed.
        after_ms: u64,
    },

    /// The client answered a server-originated request with an error.
    #[error("Client error {code}: {message}")]
    ClientError {
        /// JSON-RPC code from the client's error object.
        code: i32,
        /// Message from the client's error object.
        message: String,
        /// Data from the client's error object.
        data: Option<Value>,
    },

    /// A server-originated request was cancelled locally before completion.
    #[error("Request cancelled{}", reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Cancelled {
        /// Reason supplied by whoever cancelled.
        reason: Option<String>,
    },
}

impl McpError {
    /// Invalid-params error from anything printable.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    /// Internal error from anything printable.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// JSON-RPC code this error maps to on the wire.
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => error_codes::PARSE_ERROR,
            Self::InvalidRequest(_) | Self::UnsupportedProtocolVersion { .. } => {
                error_codes::INVALID_REQUEST
            }
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
            Self::ResourceNotFound { .. } => error_codes::RESOURCE_NOT_FOUND,
            Self::ClientError { code, .. } => *code,
            Self::Internal(_) | Self::Timeout { .. } | Self::Cancelled { .. } => {
                error_codes::INTERNAL_ERROR
            }
        }
    }

    /// Data payload attached to the wire error, when the kind carries one.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::UnsupportedProtocolVersion {
                requested,
                supported,
            } => Some(json!({
                "protocolVersion": requested,
                "supportedVersions": supported,
            })),
            Self::ResourceNotFound { uri } => Some(json!(uri)),
            Self::ClientError { data, .. } => data.clone(),
            _ => None,
        }
    }

    /// Render into a JSON-RPC error object.
    pub fn to_wire(&self) -> JsonRpcError {
        JsonRpcError {
            code: self.code(),
            message: self.to_string(),
            data: self.data(),
        }
    }
}

impl From<JsonRpcError> for McpError {
    fn from(error: JsonRpcError) -> Self {
        Self::ClientError {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}
