//! # coremcp-protocol
//!
//! Protocol layer for the coremcp MCP server library: JSON-RPC 2.0 message
//! types, the wire parser that classifies decoded envelopes, the pluggable
//! text codec, the typed error model, and the full set of MCP request,
//! response, and notification types.
//!
//! This crate is transport-agnostic and runtime-agnostic. The session core
//! in `coremcp-server` consumes it; the transports only ever see text.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod jsonrpc;
pub mod types;
pub mod wire;

pub use codec::{Codec, DecodeError, JsonCodec};
pub use error::McpError;
pub use jsonrpc::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JsonRpcVersion, RequestId,
    ResponseId,
};
pub use wire::{Parsed, ParsedItem};

/// Latest protocol revision this library speaks.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol revisions accepted during `initialize`, newest first.
pub const SUPPORTED_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Default timeout applied to server-originated client requests.
pub const DEFAULT_CLIENT_REQUEST_TIMEOUT_MS: u64 = 120_000;

/// Minimum interval between two timeout sweeps of the outstanding table.
pub const TIMEOUT_SWEEP_INTERVAL_MS: u64 = 500;

/// MCP method names.
pub mod methods {
    /// Connection handshake.
    pub const INITIALIZE: &str = "initialize";
    /// Liveness check, legal in any session state.
    pub const PING: &str = "ping";
    /// List configured tools.
    pub const LIST_TOOLS: &str = "tools/list";
    /// Invoke a tool by name.
    pub const CALL_TOOL: &str = "tools/call";
    /// List configured prompts.
    pub const LIST_PROMPTS: &str = "prompts/list";
    /// Render a prompt by name.
    pub const GET_PROMPT: &str = "prompts/get";
    /// List resources from the configured provider.
    pub const LIST_RESOURCES: &str = "resources/list";
    /// Read a resource body by URI.
    pub const READ_RESOURCE: &str = "resources/read";
    /// Subscribe to updates for a URI.
    pub const SUBSCRIBE_RESOURCE: &str = "resources/subscribe";
    /// Unsubscribe from updates for a URI.
    pub const UNSUBSCRIBE_RESOURCE: &str = "resources/unsubscribe";
    /// List configured resource templates.
    pub const LIST_RESOURCE_TEMPLATES: &str = "resources/templates/list";
    /// Argument autocompletion.
    pub const COMPLETE: &str = "completion/complete";
    /// Adjust the level gate for `notifications/message`.
    pub const SET_LOG_LEVEL: &str = "logging/setLevel";

    /// Client signals the handshake is done.
    pub const NOTIF_INITIALIZED: &str = "notifications/initialized";
    /// Either side abandons an in-flight request.
    pub const NOTIF_CANCELLED: &str = "notifications/cancelled";
    /// Progress report correlated by token.
    pub const NOTIF_PROGRESS: &str = "notifications/progress";
    /// Client's root set changed.
    pub const NOTIF_ROOTS_LIST_CHANGED: &str = "notifications/roots/list_changed";

    /// Server's tool catalogue changed.
    pub const NOTIF_TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
    /// Server's prompt catalogue changed.
    pub const NOTIF_PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";
    /// Server's resource catalogue changed.
    pub const NOTIF_RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
    /// A subscribed resource changed.
    pub const NOTIF_RESOURCE_UPDATED: &str = "notifications/resources/updated";
    /// Server-emitted log record.
    pub const NOTIF_MESSAGE: &str = "notifications/message";

    /// Server asks the client for its roots.
    pub const LIST_ROOTS: &str = "roots/list";
    /// Server asks the client to run an LLM completion.
    pub const CREATE_MESSAGE: &str = "sampling/createMessage";

    /// Internal pseudo-method the wire parser assigns to client responses.
    pub const CLIENT_RESPONSE: &str = "client-response";
}

/// JSON-RPC and MCP error codes.
pub mod error_codes {
    /// Parse error (-32700).
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid request (-32600).
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found (-32601).
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params (-32602).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error (-32603).
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Resource not found (-32002).
    pub const RESOURCE_NOT_FOUND: i32 = -32002;
}
