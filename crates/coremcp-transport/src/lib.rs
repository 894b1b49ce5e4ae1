//! # coremcp-transport
//!
//! Transport adapters over the `coremcp-server` session core:
//!
//! - [`stdio`]: line-delimited JSON over two byte streams, the classic
//!   MCP process transport.
//! - [`http`]: POST for client traffic, an SSE stream for
//!   server-originated traffic, session ids in the `Mcp-Session-Id`
//!   header.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod http;
pub mod stdio;

pub use http::{router, serve as serve_http, HttpServerConfig, SessionFactory};
pub use stdio::{run as run_stdio, serve as serve_stdio};
