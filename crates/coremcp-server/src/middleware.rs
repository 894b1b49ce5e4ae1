//! Middleware over route handlers.
//!
//! The dispatch table is built once with the configured stack applied to
//! every entry: the first middleware in the stack is outermost. Three
//! built-ins cover the core concerns: the error boundary (outermost by
//! default), runtime task spawning, and the initialization gate with its
//! fixed exemption set.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use coremcp_protocol::types::LogLevel;
use coremcp_protocol::{methods, McpError};
use serde_json::Value;

use crate::exchange::RequestExchange;

/// Future returned by a route handler.
pub type RouteFuture = BoxFuture<'static, Result<Value, McpError>>;

/// A composed route handler: exchange plus raw params in, result out.
pub type RouteHandler = Arc<dyn Fn(RequestExchange, Option<Value>) -> RouteFuture + Send + Sync>;

/// A unary transformation over route handlers.
pub trait Middleware: Send + Sync {
    /// Wrap `next`, returning the composed handler.
    fn wrap(&self, next: RouteHandler) -> RouteHandler;
}

impl<F> Middleware for F
where
    F: Fn(RouteHandler) -> RouteHandler + Send + Sync,
{
    fn wrap(&self, next: RouteHandler) -> RouteHandler {
        self(next)
    }
}

/// Methods the initialization gate never applies to. The client-response
/// pseudo-handler is dispatched outside the table and is exempt by
/// construction.
pub(crate) const INIT_EXEMPT_METHODS: &[&str] = &[
    methods::INITIALIZE,
    methods::PING,
    methods::NOTIF_INITIALIZED,
];

/// Rejects every call until the session has seen
/// `notifications/initialized`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitGate;

impl Middleware for InitGate {
    fn wrap(&self, next: RouteHandler) -> RouteHandler {
        Arc::new(move |exchange: RequestExchange, params| {
            if !exchange.session().is_initialized() {
                return futures::future::ready(Err(McpError::invalid_params(
                    "Session not initialized.",
                )))
                .boxed();
            }
            next(exchange, params)
        })
    }
}

/// Converts handler panics into INTERNAL_ERROR responses, logging them
/// locally at the configured level. Typed handler errors pass through
/// unchanged; they are the method-error path, not failures of the server.
#[derive(Debug, Clone, Copy)]
pub struct ErrorBoundary {
    level: LogLevel,
}

impl ErrorBoundary {
    /// Boundary logging at `level`.
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    fn log(&self, method: &str, message: &str) {
        match self.level {
            LogLevel::Debug => tracing::debug!(method, error = %message, "handler failed"),
            LogLevel::Info => tracing::info!(method, error = %message, "handler failed"),
            LogLevel::Notice | LogLevel::Warning => {
                tracing::warn!(method, error = %message, "handler failed");
            }
            _ => tracing::error!(method, error = %message, "handler failed"),
        }
    }
}

impl Default for ErrorBoundary {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

impl Middleware for ErrorBoundary {
    fn wrap(&self, next: RouteHandler) -> RouteHandler {
        let boundary = *self;
        Arc::new(move |exchange: RequestExchange, params| {
            let method = exchange.method().to_string();
            let fut = AssertUnwindSafe(next(exchange, params)).catch_unwind();
            async move {
                match fut.await {
                    Ok(outcome) => outcome,
                    Err(payload) => {
                        let message = panic_message(payload);
                        boundary.log(&method, &message);
                        Err(McpError::internal(message))
                    }
                }
            }
            .boxed()
        })
    }
}

/// Runs the wrapped handler as a task on the tokio runtime. A handler
/// that itself returns an async result is awaited in the task, so nested
/// asynchrony flattens.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskSpawn;

impl Middleware for TaskSpawn {
    fn wrap(&self, next: RouteHandler) -> RouteHandler {
        Arc::new(move |exchange, params| {
            let fut = next(exchange, params);
            async move {
                match tokio::spawn(fut).await {
                    Ok(outcome) => outcome,
                    Err(join) => Err(McpError::internal(join.to_string())),
                }
            }
            .boxed()
        })
    }
}

/// Fold a middleware stack over a raw handler: the first element of
/// `stack` ends up outermost.
pub(crate) fn compose(stack: &[Arc<dyn Middleware>], raw: RouteHandler) -> RouteHandler {
    stack.iter().rev().fold(raw, |inner, mw| mw.wrap(inner))
}
