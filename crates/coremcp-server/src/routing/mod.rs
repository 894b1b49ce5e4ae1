//! Request routing and dispatch.
//!
//! Builds the method table once at session construction (middleware
//! applied per entry, initialization gate on everything outside the
//! exemption set) and drives classified wire items through it. Identified
//! requests are tracked in the in-flight table from before their handler
//! starts until their response is emitted or suppressed.

pub(crate) mod handlers;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use coremcp_protocol::jsonrpc::JsonRpcError;
use coremcp_protocol::wire::ParsedItem;
use coremcp_protocol::{methods, JsonRpcResponse, McpError, RequestId};

use crate::cancel::CancelToken;
use crate::exchange::RequestExchange;
use crate::middleware::{compose, ErrorBoundary, InitGate, Middleware, RouteHandler, INIT_EXEMPT_METHODS};
use crate::session::Session;

/// Upper bound on concurrently running handlers within one batch.
const MAX_BATCH_CONCURRENCY: usize = 16;

/// Dispatch-table configuration assembled by the builder.
pub(crate) struct TableConfig {
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
    pub(crate) error_boundary: ErrorBoundary,
}

fn route<F, Fut>(f: F) -> RouteHandler
where
    F: Fn(RequestExchange, Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, McpError>> + Send + 'static,
{
    Arc::new(move |exchange, params| f(exchange, params).boxed())
}

/// Build the method table with the middleware stack applied to every
/// entry. Composition, outermost first: error boundary, configured
/// middleware in order, initialization gate, handler.
pub(crate) fn build_table(config: &TableConfig) -> HashMap<String, RouteHandler> {
    let entries: Vec<(&str, RouteHandler)> = vec![
        (methods::INITIALIZE, route(handlers::initialize::handle)),
        (methods::PING, route(handlers::ping::handle)),
        (methods::LIST_TOOLS, route(handlers::tools::handle_list)),
        (methods::CALL_TOOL, route(handlers::tools::handle_call)),
        (methods::LIST_PROMPTS, route(handlers::prompts::handle_list)),
        (methods::GET_PROMPT, route(handlers::prompts::handle_get)),
        (methods::LIST_RESOURCES, route(handlers::resources::handle_list)),
        (methods::READ_RESOURCE, route(handlers::resources::handle_read)),
        (
            methods::SUBSCRIBE_RESOURCE,
            route(handlers::resources::handle_subscribe),
        ),
        (
            methods::UNSUBSCRIBE_RESOURCE,
            route(handlers::resources::handle_unsubscribe),
        ),
        (
            methods::LIST_RESOURCE_TEMPLATES,
            route(handlers::resources::handle_list_templates),
        ),
        (methods::COMPLETE, route(handlers::completion::handle)),
        (methods::SET_LOG_LEVEL, route(handlers::logging::handle_set_level)),
        (
            methods::NOTIF_INITIALIZED,
            route(handlers::notifications::handle_initialized),
        ),
        (
            methods::NOTIF_CANCELLED,
            route(handlers::notifications::handle_cancelled),
        ),
        (
            methods::NOTIF_PROGRESS,
            route(handlers::notifications::handle_progress),
        ),
        (
            methods::NOTIF_ROOTS_LIST_CHANGED,
            route(handlers::notifications::handle_roots_list_changed),
        ),
    ];

    let gate = InitGate;
    entries
        .into_iter()
        .map(|(method, raw)| {
            let mut handler = raw;
            if !INIT_EXEMPT_METHODS.contains(&method) {
                handler = gate.wrap(handler);
            }
            handler = compose(&config.middleware, handler);
            handler = config.error_boundary.wrap(handler);
            (method.to_string(), handler)
        })
        .collect()
}

/// Deserialize request params, defaulting absent params to `{}`.
pub(crate) fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, McpError> {
    let value = params.unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(value)
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {e}")))
}

/// A classified item with its in-flight bookkeeping already done.
pub(crate) enum PreparedItem {
    Request {
        method: String,
        params: Option<Value>,
        id: RequestId,
        cancel: Arc<CancelToken>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
    ClientResponse {
        id: RequestId,
        result: Option<Value>,
        error: Option<JsonRpcError>,
    },
    Invalid {
        error: JsonRpcError,
        id: Option<RequestId>,
    },
}

impl PreparedItem {
    pub(crate) fn is_request(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}

/// Enter identified requests into the in-flight table. This runs on the
/// ingest path, before any handler task is spawned, so a cancellation in
/// the very next frame can find its target.
pub(crate) fn prepare(session: &Session, item: ParsedItem) -> PreparedItem {
    match item {
        ParsedItem::Request { method, params, id } => {
            let cancel = Arc::new(CancelToken::new());
            session.inner().in_flight.insert(id.clone(), Arc::clone(&cancel));
            PreparedItem::Request {
                method,
                params,
                id,
                cancel,
            }
        }
        ParsedItem::Notification { method, params } => {
            PreparedItem::Notification { method, params }
        }
        ParsedItem::ClientResponse { id, result, error } => {
            PreparedItem::ClientResponse { id, result, error }
        }
        ParsedItem::Invalid { error, id } => PreparedItem::Invalid { error, id },
    }
}

/// Run one prepared item to completion, returning the response to emit,
/// if any.
pub(crate) async fn run(session: &Session, item: PreparedItem) -> Option<JsonRpcResponse> {
    match item {
        PreparedItem::Invalid { error, id } => Some(match id {
            Some(id) => JsonRpcResponse::error(error, id),
            None => JsonRpcResponse::error_without_id(error),
        }),

        PreparedItem::ClientResponse { id, result, error } => {
            let inner = session.inner();
            inner.outbound.complete(&inner.progress, &id, result, error);
            None
        }

        PreparedItem::Notification { method, params } => {
            let exchange =
                RequestExchange::new(session.clone(), &method, None, params.as_ref(), None);
            if let Some(handler) = session.inner().table.get(&method) {
                if let Err(e) = handler(exchange, params).await {
                    tracing::debug!(method = %method, error = %e, "notification handler failed");
                }
            } else {
                tracing::debug!(method = %method, "unknown notification");
            }
            None
        }

        PreparedItem::Request {
            method,
            params,
            id,
            cancel,
        } => {
            let exchange = RequestExchange::new(
                session.clone(),
                &method,
                Some(id.clone()),
                params.as_ref(),
                Some(Arc::clone(&cancel)),
            );
            let outcome = match session.inner().table.get(&method) {
                Some(handler) => handler(exchange, params).await,
                None => Err(McpError::MethodNotFound(method.clone())),
            };

            session.inner().in_flight.remove(&id);

            // A result produced after cancellation never reaches the wire.
            if cancel.is_cancelled() {
                return None;
            }

            Some(match outcome {
                Ok(value) => JsonRpcResponse::success(value, id),
                Err(error) => JsonRpcResponse::error(error.to_wire(), id),
            })
        }
    }
}

/// Run a batch concurrently; responses arrive in completion order and are
/// emitted as one array.
pub(crate) async fn run_batch(
    session: &Session,
    items: Vec<PreparedItem>,
) -> Vec<JsonRpcResponse> {
    stream::iter(items)
        .map(|item| run(session, item))
        .buffer_unordered(MAX_BATCH_CONCURRENCY)
        .filter_map(futures::future::ready)
        .collect()
        .await
}
