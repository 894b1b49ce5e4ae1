//! Handshake types.

use serde::{Deserialize, Serialize};

use super::capabilities::{ClientCapabilities, ServerCapabilities};
use super::core::Implementation;

/// `initialize` request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Protocol revision the client wants to speak.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    /// Client implementation info.
    #[serde(rename = "clientInfo")]
    pub client_info: Implementation,
}

/// `initialize` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    /// Protocol revision the session will speak.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capabilities derived from configured handlers.
    pub capabilities: ServerCapabilities,
    /// Server implementation info.
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,
    /// Free-form usage instructions for the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}
