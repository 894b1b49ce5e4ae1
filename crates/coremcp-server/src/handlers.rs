//! Handler traits for the MCP method families.
//!
//! Each family has an object-safe trait plus a closure adapter so plain
//! `async fn`s register without boilerplate.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

use crate::exchange::RequestExchange;
use crate::reply::{CompletionReply, PromptReply, ToolReply};

/// Handles `tools/call` for one registered tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with the request's arguments.
    async fn call(&self, exchange: RequestExchange, arguments: Map<String, Value>) -> ToolReply;
}

struct FnToolHandler<F>(F);

#[async_trait]
impl<F, Fut, R> ToolHandler for FnToolHandler<F>
where
    F: Fn(RequestExchange, Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: Into<ToolReply>,
{
    async fn call(&self, exchange: RequestExchange, arguments: Map<String, Value>) -> ToolReply {
        (self.0)(exchange, arguments).await.into()
    }
}

/// Wrap an async closure as a [`ToolHandler`].
pub fn tool_fn<F, Fut, R>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(RequestExchange, Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Into<ToolReply>,
{
    Arc::new(FnToolHandler(f))
}

/// Handles `prompts/get` for one registered prompt.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    /// Render the prompt with the request's argument values.
    async fn render(&self, exchange: RequestExchange, arguments: Map<String, Value>)
        -> PromptReply;
}

struct FnPromptHandler<F>(F);

#[async_trait]
impl<F, Fut, R> PromptHandler for FnPromptHandler<F>
where
    F: Fn(RequestExchange, Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: Into<PromptReply>,
{
    async fn render(
        &self,
        exchange: RequestExchange,
        arguments: Map<String, Value>,
    ) -> PromptReply {
        (self.0)(exchange, arguments).await.into()
    }
}

/// Wrap an async closure as a [`PromptHandler`].
pub fn prompt_fn<F, Fut, R>(f: F) -> Arc<dyn PromptHandler>
where
    F: Fn(RequestExchange, Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Into<PromptReply>,
{
    Arc::new(FnPromptHandler(f))
}

/// Completion handler registered for one `(ref type, name)` pair.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    /// Complete one argument of the referenced item.
    async fn complete(
        &self,
        exchange: RequestExchange,
        argument_name: &str,
        argument_value: &str,
    ) -> CompletionReply;
}

struct FnCompletionHandler<F>(F);

#[async_trait]
impl<F, Fut, R> CompletionHandler for FnCompletionHandler<F>
where
    F: Fn(RequestExchange, String, String) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: Into<CompletionReply>,
{
    async fn complete(
        &self,
        exchange: RequestExchange,
        argument_name: &str,
        argument_value: &str,
    ) -> CompletionReply {
        (self.0)(exchange, argument_name.to_string(), argument_value.to_string())
            .await
            .into()
    }
}

/// Wrap an async closure as a [`CompletionHandler`].
pub fn completion_fn<F, Fut, R>(f: F) -> Arc<dyn CompletionHandler>
where
    F: Fn(RequestExchange, String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Into<CompletionReply>,
{
    Arc::new(FnCompletionHandler(f))
}

/// Fallback completion handler consulted when no specific handler matches
/// the reference. Receives the full reference alongside the argument.
#[async_trait]
pub trait DefaultCompletionHandler: Send + Sync {
    /// Complete an argument for an arbitrary reference.
    async fn complete(
        &self,
        exchange: RequestExchange,
        ref_type: &str,
        ref_name: &str,
        argument_name: &str,
        argument_value: &str,
    ) -> CompletionReply;
}
