//! MCP protocol types.
//!
//! Request, response, and notification payloads for every method family
//! the session core dispatches. Wire names are camelCase via serde
//! attributes; the Rust field names stay snake_case.

pub mod capabilities;
pub mod completion;
pub mod content;
pub mod core;
pub mod initialization;
pub mod logging;
pub mod notifications;
pub mod prompts;
pub mod resources;
pub mod roots;
pub mod sampling;
pub mod tools;

pub use capabilities::{
    ClientCapabilities, CompletionsCapability, LoggingCapability, PromptsCapability,
    ResourcesCapability, RootsCapability, SamplingCapability, ServerCapabilities, ToolsCapability,
};
pub use completion::{
    CompleteRequest, CompleteResult, CompletionArgument, CompletionData, CompletionReference,
};
pub use content::{
    AudioContent, BlobResourceContents, ContentBlock, EmbeddedResource, ImageContent,
    ResourceContents, TextContent, TextResourceContents,
};
pub use core::{Annotations, Cursor, EmptyResult, Implementation, ProgressToken, Role};
pub use initialization::{InitializeRequest, InitializeResult};
pub use logging::{LogLevel, LoggingMessageParams, SetLevelRequest};
pub use notifications::{CancelledParams, ProgressParams, ProgressUpdate, ResourceUpdatedParams};
pub use prompts::{
    GetPromptRequest, GetPromptResult, ListPromptsRequest, ListPromptsResult, Prompt,
    PromptArgument, PromptMessage,
};
pub use resources::{
    ListResourceTemplatesResult, ListResourcesRequest, ListResourcesResult, ReadResourceRequest,
    ReadResourceResult, Resource, ResourceTemplate, SubscribeRequest, UnsubscribeRequest,
};
pub use roots::{ListRootsResult, Root};
pub use sampling::{
    CreateMessageRequest, CreateMessageResult, IncludeContext, ModelHint, ModelPreferences,
    SamplingMessage, StopReason,
};
pub use tools::{CallToolRequest, CallToolResult, ListToolsRequest, ListToolsResult, Tool};
