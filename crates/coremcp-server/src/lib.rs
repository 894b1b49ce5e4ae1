//! # coremcp-server
//!
//! Transport-neutral MCP session core: JSON-RPC dispatch with middleware,
//! the initialize state machine, bidirectional request correlation with
//! timeouts and cancellation, progress routing, and the full MCP handler
//! families (tools, prompts, resources, completions, logging, roots,
//! sampling).
//!
//! A [`Session`] is configured once through [`SessionBuilder`] and then
//! fed message text by a transport. Replies and server-originated traffic
//! leave through the session's output sink; the `coremcp-transport` crate
//! provides STDIO and HTTP+SSE adapters over exactly this surface.
//!
//! ```no_run
//! use coremcp_server::{Session, reply::ToolReply, handlers::tool_fn};
//! use coremcp_protocol::types::Tool;
//!
//! let session = Session::builder()
//!     .name("calc")
//!     .version("1.0.0")
//!     .tool(
//!         Tool::new("sum").with_description("Add two numbers"),
//!         tool_fn(|_exchange, args| async move {
//!             let a = args.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
//!             let b = args.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
//!             ToolReply::text((a + b).to_string())
//!         }),
//!     )
//!     .build();
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

mod builder;
mod cancel;
mod exchange;
pub mod handlers;
pub mod middleware;
mod outbound;
mod progress;
mod registry;
pub mod reply;
pub mod resources;
mod routing;
mod session;

pub use builder::SessionBuilder;
pub use cancel::CancelToken;
pub use exchange::RequestExchange;
pub use handlers::{
    completion_fn, prompt_fn, tool_fn, CompletionHandler, DefaultCompletionHandler, PromptHandler,
    ToolHandler,
};
pub use middleware::{ErrorBoundary, InitGate, Middleware, RouteHandler, TaskSpawn};
pub use outbound::PendingRequest;
pub use progress::ProgressCallback;
pub use registry::{PromptEntry, ToolEntry};
pub use reply::{CompletionReply, PromptReply, ResourceReply, ToolReply};
pub use resources::{
    resource_fn, InMemoryResources, ResourceHandle, ResourcePage, ResourceProvider, ResourceReader,
};
pub use session::{OutboundSink, RootsChangedCallback, ServerInfo, Session};

// Protocol surface, re-exported for convenience.
pub use coremcp_protocol as protocol;
pub use coremcp_protocol::McpError;
