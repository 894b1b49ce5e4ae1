//! Per-connection session state and the ingest entry points.
//!
//! A [`Session`] owns everything scoped to one client connection: the
//! negotiated handshake state, the dispatch table, the registered
//! handlers, the in-flight and outstanding request tables, the progress
//! registry, and the transport output sink. Transports feed it message
//! text through [`Session::ingest`] (fire-and-forget, replies go to the
//! sink) or [`Session::handle`] (request/response, used by HTTP POST).

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use coremcp_protocol::codec::Codec;
use coremcp_protocol::jsonrpc::JsonRpcRequest;
use coremcp_protocol::types::{
    ClientCapabilities, Implementation, LogLevel, Prompt, Root, Tool,
};
use coremcp_protocol::{methods, wire, JsonRpcNotification, JsonRpcResponse, McpError, RequestId};

use dashmap::DashMap;

use crate::builder::SessionBuilder;
use crate::cancel::CancelToken;
use crate::exchange::RequestExchange;
use crate::handlers::{PromptHandler, ToolHandler};
use crate::middleware::RouteHandler;
use crate::outbound::{OutboundTable, PendingRequest};
use crate::progress::{ProgressCallback, ProgressRegistry};
use crate::registry::{HandlerRegistry, PromptEntry, ToolEntry};
use crate::routing;

/// Static server identity advertised during the handshake.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Usage instructions included in the `initialize` result.
    pub instructions: Option<String>,
    /// Whether the server advertises the `logging` capability.
    pub logging: bool,
}

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InitPhase {
    /// No initialize seen yet.
    Fresh,
    /// Initialize answered, awaiting `notifications/initialized`.
    Initializing,
    /// Fully initialized.
    Initialized,
}

#[derive(Debug)]
pub(crate) struct NegotiatedState {
    pub client_info: Option<Implementation>,
    pub client_capabilities: Option<ClientCapabilities>,
    pub protocol_version: Option<String>,
    pub phase: InitPhase,
    pub logging_level: Option<LogLevel>,
}

/// Transport write callback: one serialized envelope per call.
pub type OutboundSink =
    Arc<dyn Fn(String) -> BoxFuture<'static, std::io::Result<()>> + Send + Sync>;

/// Callback invoked when the client announces a roots change.
pub type RootsChangedCallback = Arc<dyn Fn(Session) + Send + Sync>;

pub(crate) struct SessionInner {
    pub(crate) server_info: ServerInfo,
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) registry: HandlerRegistry,
    pub(crate) table: std::collections::HashMap<String, RouteHandler>,
    pub(crate) state: RwLock<NegotiatedState>,
    pub(crate) subscriptions: RwLock<HashSet<String>>,
    pub(crate) context: Map<String, Value>,
    pub(crate) in_flight: DashMap<RequestId, Arc<CancelToken>>,
    pub(crate) outbound: OutboundTable,
    pub(crate) progress: ProgressRegistry,
    pub(crate) roots_cache: tokio::sync::Mutex<Option<Vec<Root>>>,
    pub(crate) roots_changed: Option<RootsChangedCallback>,
    sink: RwLock<Option<OutboundSink>>,
    write_lock: tokio::sync::Mutex<()>,
    pub(crate) spawn_handlers: bool,
}

impl SessionInner {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        server_info: ServerInfo,
        codec: Arc<dyn Codec>,
        registry: HandlerRegistry,
        table: std::collections::HashMap<String, RouteHandler>,
        state: NegotiatedState,
        context: Map<String, Value>,
        outbound: OutboundTable,
        progress: ProgressRegistry,
        roots_changed: Option<RootsChangedCallback>,
        spawn_handlers: bool,
    ) -> Self {
        Self {
            server_info,
            codec,
            registry,
            table,
            state: RwLock::new(state),
            subscriptions: RwLock::new(HashSet::new()),
            context,
            in_flight: DashMap::new(),
            outbound,
            progress,
            roots_cache: tokio::sync::Mutex::new(None),
            roots_changed,
            sink: RwLock::new(None),
            write_lock: tokio::sync::Mutex::new(()),
            spawn_handlers,
        }
    }
}

/// One MCP session. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Start configuring a session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub(crate) fn from_inner(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &SessionInner {
        &self.inner
    }

    /// Static server identity.
    pub fn server_info(&self) -> &ServerInfo {
        &self.inner.server_info
    }

    /// The opaque user context configured at build time.
    pub fn context(&self) -> &Map<String, Value> {
        &self.inner.context
    }

    /// Whether `notifications/initialized` has been seen.
    pub fn is_initialized(&self) -> bool {
        self.inner.state.read().phase == InitPhase::Initialized
    }

    /// Negotiated client implementation info.
    pub fn client_info(&self) -> Option<Implementation> {
        self.inner.state.read().client_info.clone()
    }

    /// Negotiated client capabilities.
    pub fn client_capabilities(&self) -> Option<ClientCapabilities> {
        self.inner.state.read().client_capabilities.clone()
    }

    /// Negotiated protocol revision.
    pub fn protocol_version(&self) -> Option<String> {
        self.inner.state.read().protocol_version.clone()
    }

    /// Level the client set via `logging/setLevel`, if any.
    pub fn logging_level(&self) -> Option<LogLevel> {
        self.inner.state.read().logging_level
    }

    pub(crate) fn roots_cache(&self) -> &tokio::sync::Mutex<Option<Vec<Root>>> {
        &self.inner.roots_cache
    }

    /// An exchange not tied to any inbound request, for out-of-band use
    /// of the client-facing capabilities (roots, sampling, logging).
    pub fn exchange(&self) -> RequestExchange {
        RequestExchange::new(self.clone(), "", None, None, None)
    }

    // ------------------------------------------------------------------
    // Transport wiring
    // ------------------------------------------------------------------

    /// Attach the transport write callback. Replacing an existing sink
    /// drops the previous one; the transport owns closing its streams.
    pub fn set_output(&self, sink: OutboundSink) {
        *self.inner.sink.write() = Some(sink);
    }

    /// Detach the transport write callback (EOF, connection teardown).
    pub fn clear_output(&self) {
        *self.inner.sink.write() = None;
    }

    /// Serialize one value and write it as a single envelope. The write
    /// lock makes the envelope atomic with respect to concurrent senders.
    pub(crate) async fn send_json(&self, value: &Value) -> Result<(), McpError> {
        let text = self
            .inner
            .codec
            .serialize(value)
            .map_err(|e| McpError::internal(e.to_string()))?;
        let sink = self
            .inner
            .sink
            .read()
            .clone()
            .ok_or_else(|| McpError::internal("no transport output attached"))?;
        let _guard = self.inner.write_lock.lock().await;
        sink(text)
            .await
            .map_err(|e| McpError::internal(format!("transport write failed: {e}")))
    }

    pub(crate) async fn send_response(&self, response: JsonRpcResponse) {
        match serde_json::to_value(&response) {
            Ok(value) => {
                if let Err(e) = self.send_json(&value).await {
                    tracing::warn!(error = %e, "failed to emit response");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize response"),
        }
    }

    pub(crate) async fn send_response_batch(&self, responses: Vec<JsonRpcResponse>) {
        match serde_json::to_value(&responses) {
            Ok(value) => {
                if let Err(e) = self.send_json(&value).await {
                    tracing::warn!(error = %e, "failed to emit batch response");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize batch response"),
        }
    }

    /// Send a notification to the client.
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), McpError> {
        let envelope = JsonRpcNotification::new(method, params);
        let value =
            serde_json::to_value(&envelope).map_err(|e| McpError::internal(e.to_string()))?;
        self.send_json(&value).await
    }

    // ------------------------------------------------------------------
    // Server-originated requests
    // ------------------------------------------------------------------

    /// Send a server-originated request; the returned [`PendingRequest`]
    /// resolves with the client's answer.
    pub(crate) async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<PendingRequest, McpError> {
        let id = self.inner.outbound.allocate_id();

        let token = on_progress.map(|callback| {
            let token = uuid::Uuid::new_v4().to_string();
            self.inner.progress.register(token.clone(), callback);
            token
        });

        let mut params = match params {
            Some(Value::Object(map)) => Value::Object(map),
            Some(other) => other,
            None => Value::Object(Map::new()),
        };
        if let Some(token) = &token {
            if let Value::Object(map) = &mut params {
                let meta = map
                    .entry("_meta".to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(meta) = meta {
                    meta.insert("progressToken".to_string(), json!(token));
                }
            }
        }

        let envelope = JsonRpcRequest::new(method, Some(params), RequestId::Number(id));
        let value =
            serde_json::to_value(&envelope).map_err(|e| McpError::internal(e.to_string()))?;

        // Register before writing so a fast response cannot race the
        // table insertion.
        let rx = self.inner.outbound.register(id, token.clone());

        if let Err(e) = self.send_json(&value).await {
            self.inner.outbound.discard(id);
            if let Some(token) = &token {
                self.inner.progress.deregister(token);
            }
            return Err(e);
        }

        Ok(PendingRequest {
            id,
            rx,
            session: self.clone(),
        })
    }

    /// Interrupting cancellation of an outstanding request: remove the
    /// entry, drop the progress registration, notify the client.
    pub(crate) async fn cancel_client_request(&self, id: i64, reason: Option<String>) {
        if let Some(token) = self.inner.outbound.discard(id).flatten() {
            self.inner.progress.deregister(&token);
        }
        let mut params = json!({"requestId": id});
        if let Some(reason) = reason {
            params["reason"] = json!(reason);
        }
        if let Err(e) = self
            .send_notification(methods::NOTIF_CANCELLED, Some(params))
            .await
        {
            tracing::debug!(error = %e, "failed to send cancellation notification");
        }
    }

    /// Non-interrupting cancellation: local removal only.
    pub(crate) fn abandon_client_request(&self, id: i64) {
        if let Some(token) = self.inner.outbound.discard(id).flatten() {
            self.inner.progress.deregister(&token);
        }
    }

    // ------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------

    /// Process one message text and return the serialized reply, if the
    /// input calls for one. Used by request/response transports (HTTP
    /// POST); all work is awaited inline.
    pub async fn handle(&self, text: &str) -> Option<String> {
        self.inner.outbound.sweep(&self.inner.progress);
        let parsed = wire::parse(self.inner.codec.deserialize(text));
        match parsed {
            wire::Parsed::Empty => None,
            wire::Parsed::Single(item) => {
                let prepared = routing::prepare(self, item);
                let response = routing::run(self, prepared).await?;
                self.serialize_reply(&serde_json::to_value(&response).ok()?)
            }
            wire::Parsed::Batch(items) => {
                let prepared: Vec<_> = items
                    .into_iter()
                    .map(|item| routing::prepare(self, item))
                    .collect();
                let responses = routing::run_batch(self, prepared).await;
                if responses.is_empty() {
                    None
                } else {
                    self.serialize_reply(&serde_json::to_value(&responses).ok()?)
                }
            }
        }
    }

    /// Process one message text, emitting any replies through the output
    /// sink. With spawned scheduling (the default) identified requests run
    /// as tasks, so a slow handler does not stall the read loop and later
    /// frames (client responses, cancellations, progress) keep flowing.
    pub async fn ingest(&self, text: &str) {
        self.inner.outbound.sweep(&self.inner.progress);
        let parsed = wire::parse(self.inner.codec.deserialize(text));
        match parsed {
            wire::Parsed::Empty => {}
            wire::Parsed::Single(item) => {
                // The in-flight entry is registered before any spawn so a
                // cancellation in the very next frame finds it.
                let prepared = routing::prepare(self, item);
                if self.inner.spawn_handlers && prepared.is_request() {
                    let session = self.clone();
                    tokio::spawn(async move {
                        if let Some(response) = routing::run(&session, prepared).await {
                            session.send_response(response).await;
                        }
                    });
                } else if let Some(response) = routing::run(self, prepared).await {
                    self.send_response(response).await;
                }
            }
            wire::Parsed::Batch(items) => {
                let prepared: Vec<_> = items
                    .into_iter()
                    .map(|item| routing::prepare(self, item))
                    .collect();
                let session = self.clone();
                let task = async move {
                    let responses = routing::run_batch(&session, prepared).await;
                    if !responses.is_empty() {
                        session.send_response_batch(responses).await;
                    }
                };
                if self.inner.spawn_handlers {
                    tokio::spawn(task);
                } else {
                    task.await;
                }
            }
        }
    }

    fn serialize_reply(&self, value: &Value) -> Option<String> {
        match self.inner.codec.serialize(value) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize reply");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Catalogue mutation
    // ------------------------------------------------------------------

    /// Register or replace a tool. Emits `notifications/tools/list_changed`
    /// when the session is initialized.
    pub async fn add_tool(&self, tool: Tool, handler: Arc<dyn ToolHandler>) {
        self.inner.registry.insert_tool(ToolEntry { tool, handler });
        self.notify_list_changed(methods::NOTIF_TOOLS_LIST_CHANGED).await;
    }

    /// Remove a tool by name. Emits `notifications/tools/list_changed`
    /// when the tool existed and the session is initialized.
    pub async fn remove_tool(&self, name: &str) {
        if self.inner.registry.remove_tool(name) {
            self.notify_list_changed(methods::NOTIF_TOOLS_LIST_CHANGED).await;
        }
    }

    /// Register or replace a prompt. Emits
    /// `notifications/prompts/list_changed` when the session is
    /// initialized.
    pub async fn add_prompt(&self, prompt: Prompt, handler: Arc<dyn PromptHandler>) {
        self.inner
            .registry
            .insert_prompt(PromptEntry { prompt, handler });
        self.notify_list_changed(methods::NOTIF_PROMPTS_LIST_CHANGED).await;
    }

    /// Remove a prompt by name. Emits
    /// `notifications/prompts/list_changed` when the prompt existed and
    /// the session is initialized.
    pub async fn remove_prompt(&self, name: &str) {
        if self.inner.registry.remove_prompt(name) {
            self.notify_list_changed(methods::NOTIF_PROMPTS_LIST_CHANGED).await;
        }
    }

    async fn notify_list_changed(&self, method: &str) {
        if !self.is_initialized() {
            return;
        }
        if let Err(e) = self.send_notification(method, None).await {
            tracing::debug!(method, error = %e, "failed to emit list_changed");
        }
    }

    /// Announce that the provider's resource catalogue changed.
    pub async fn notify_resources_list_changed(&self) {
        let supported = self
            .inner
            .registry
            .resources
            .as_ref()
            .is_some_and(|p| p.supports_list_changed());
        if supported {
            self.notify_list_changed(methods::NOTIF_RESOURCES_LIST_CHANGED).await;
        }
    }

    /// Announce that one resource changed. Emits
    /// `notifications/resources/updated` iff the session is initialized,
    /// the provider supports subscriptions, and the URI is currently
    /// subscribed.
    pub async fn notify_resource_changed(&self, uri: &str) {
        if !self.is_initialized() {
            return;
        }
        let supported = self
            .inner
            .registry
            .resources
            .as_ref()
            .is_some_and(|p| p.supports_subscriptions());
        if !supported || !self.is_subscribed(uri) {
            return;
        }
        if let Err(e) = self
            .send_notification(methods::NOTIF_RESOURCE_UPDATED, Some(json!({"uri": uri})))
            .await
        {
            tracing::debug!(uri, error = %e, "failed to emit resource update");
        }
    }

    /// Whether the client currently subscribes to `uri`.
    pub fn is_subscribed(&self, uri: &str) -> bool {
        self.inner.subscriptions.read().contains(uri)
    }

    pub(crate) fn add_subscription(&self, uri: &str) {
        self.inner.subscriptions.write().insert(uri.to_string());
    }

    pub(crate) fn remove_subscription(&self, uri: &str) {
        self.inner.subscriptions.write().remove(uri);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Session")
            .field("server", &self.inner.server_info.name)
            .field("phase", &state.phase)
            .field("protocol_version", &state.protocol_version)
            .finish()
    }
}
