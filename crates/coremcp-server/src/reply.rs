//! Handler reply types and their wire normalization.
//!
//! Handlers return whichever shape is natural for them; a single
//! normalization step per family converts to the wire form. Strings become
//! text content, raw bytes become an embedded `application/octet-stream`
//! resource, arbitrary JSON is stringified, and a typed [`McpError`]
//! bypasses normalization to become a JSON-RPC error response.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use coremcp_protocol::types::{
    BlobResourceContents, CallToolResult, ContentBlock, EmbeddedResource, GetPromptResult,
    PromptMessage, Resource, ResourceContents, TextResourceContents,
};
use coremcp_protocol::McpError;

/// Wrap raw bytes into an embedded octet-stream resource block.
fn bytes_block(bytes: &[u8]) -> ContentBlock {
    ContentBlock::Resource(EmbeddedResource {
        resource: ResourceContents::Blob(BlobResourceContents {
            uri: None,
            mime_type: Some("application/octet-stream".to_string()),
            blob: BASE64.encode(bytes),
        }),
        annotations: None,
    })
}

/// Stringify an arbitrary JSON value into a text block. Strings are used
/// as-is rather than quoted.
fn json_block(value: &Value) -> ContentBlock {
    match value {
        Value::String(s) => ContentBlock::text(s.clone()),
        other => ContentBlock::text(other.to_string()),
    }
}

/// What a tool handler returns.
#[derive(Debug, Clone)]
pub enum ToolReply {
    /// Successful call with content.
    Content(Vec<ContentBlock>),
    /// Domain-level failure: a successful response with `isError: true`.
    Error(Vec<ContentBlock>),
    /// Protocol-level failure: becomes a JSON-RPC error response.
    Rpc(McpError),
}

impl ToolReply {
    /// Successful text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Content(vec![ContentBlock::text(text)])
    }

    /// Domain failure with a text explanation.
    pub fn error_text(text: impl Into<String>) -> Self {
        Self::Error(vec![ContentBlock::text(text)])
    }

    /// Normalize into the `tools/call` wire result.
    pub fn into_result(self) -> Result<CallToolResult, McpError> {
        match self {
            Self::Content(content) => Ok(CallToolResult {
                content,
                is_error: false,
            }),
            Self::Error(content) => Ok(CallToolResult {
                content,
                is_error: true,
            }),
            Self::Rpc(error) => Err(error),
        }
    }
}

impl From<String> for ToolReply {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<&str> for ToolReply {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<ContentBlock> for ToolReply {
    fn from(block: ContentBlock) -> Self {
        Self::Content(vec![block])
    }
}

impl From<Vec<ContentBlock>> for ToolReply {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Self::Content(blocks)
    }
}

impl From<Vec<u8>> for ToolReply {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Content(vec![bytes_block(&bytes)])
    }
}

impl From<Value> for ToolReply {
    fn from(value: Value) -> Self {
        Self::Content(vec![json_block(&value)])
    }
}

impl From<McpError> for ToolReply {
    fn from(error: McpError) -> Self {
        Self::Rpc(error)
    }
}

impl<T: Into<ToolReply>, E: Into<McpError>> From<Result<T, E>> for ToolReply {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(error) => Self::Rpc(error.into()),
        }
    }
}

/// What a prompt handler returns.
#[derive(Debug, Clone)]
pub enum PromptReply {
    /// Full result with description and messages.
    Result(GetPromptResult),
    /// A list of messages, wrapped without a description.
    Messages(Vec<PromptMessage>),
    /// A single message.
    Message(PromptMessage),
    /// Bare content; becomes a message with a null role.
    Content(ContentBlock),
    /// Protocol-level failure.
    Rpc(McpError),
}

impl PromptReply {
    /// Normalize into the `prompts/get` wire result.
    pub fn into_result(self) -> Result<GetPromptResult, McpError> {
        let wrap = |messages| GetPromptResult {
            description: None,
            messages,
        };
        match self {
            Self::Result(result) => Ok(result),
            Self::Messages(messages) => Ok(wrap(messages)),
            Self::Message(message) => Ok(wrap(vec![message])),
            Self::Content(content) => Ok(wrap(vec![PromptMessage {
                role: None,
                content,
            }])),
            Self::Rpc(error) => Err(error),
        }
    }
}

impl From<GetPromptResult> for PromptReply {
    fn from(result: GetPromptResult) -> Self {
        Self::Result(result)
    }
}

impl From<Vec<PromptMessage>> for PromptReply {
    fn from(messages: Vec<PromptMessage>) -> Self {
        Self::Messages(messages)
    }
}

impl From<PromptMessage> for PromptReply {
    fn from(message: PromptMessage) -> Self {
        Self::Message(message)
    }
}

impl From<ContentBlock> for PromptReply {
    fn from(content: ContentBlock) -> Self {
        Self::Content(content)
    }
}

impl From<String> for PromptReply {
    fn from(text: String) -> Self {
        Self::Content(ContentBlock::text(text))
    }
}

impl From<McpError> for PromptReply {
    fn from(error: McpError) -> Self {
        Self::Rpc(error)
    }
}

/// What a resource reader returns.
#[derive(Debug, Clone)]
pub enum ResourceReply {
    /// Text body; serialized as `{uri, mimeType, text}`.
    Text(String),
    /// Binary body; serialized as `{uri, mimeType, blob}` with base64.
    Bytes(Vec<u8>),
    /// Pre-built contents, passed through.
    Contents(Vec<ResourceContents>),
    /// Protocol-level failure.
    Rpc(McpError),
}

impl ResourceReply {
    /// Normalize into resource contents, filling uri and MIME type from
    /// the descriptor where the reply did not provide them.
    pub fn into_contents(self, descriptor: &Resource) -> Result<Vec<ResourceContents>, McpError> {
        match self {
            Self::Text(text) => Ok(vec![ResourceContents::Text(TextResourceContents {
                uri: Some(descriptor.uri.clone()),
                mime_type: descriptor
                    .mime_type
                    .clone()
                    .or_else(|| Some("text/plain".to_string())),
                text,
            })]),
            Self::Bytes(bytes) => Ok(vec![ResourceContents::Blob(BlobResourceContents {
                uri: Some(descriptor.uri.clone()),
                mime_type: descriptor
                    .mime_type
                    .clone()
                    .or_else(|| Some("application/octet-stream".to_string())),
                blob: BASE64.encode(&bytes),
            })]),
            Self::Contents(contents) => Ok(contents),
            Self::Rpc(error) => Err(error),
        }
    }
}

impl From<String> for ResourceReply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ResourceReply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for ResourceReply {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<McpError> for ResourceReply {
    fn from(error: McpError) -> Self {
        Self::Rpc(error)
    }
}

/// What a completion handler returns.
#[derive(Debug, Clone)]
pub enum CompletionReply {
    /// A full candidate list; total and truncation derived from it.
    Values(Vec<String>),
    /// A partial candidate list with a known total.
    Paged {
        /// Candidate values, truncated to 100 on the wire.
        values: Vec<String>,
        /// Total number of matches.
        total: u64,
    },
    /// Protocol-level failure.
    Rpc(McpError),
}

impl From<Vec<String>> for CompletionReply {
    fn from(values: Vec<String>) -> Self {
        Self::Values(values)
    }
}

impl From<McpError> for CompletionReply {
    fn from(error: McpError) -> Self {
        Self::Rpc(error)
    }
}
