//! Request exchange: the capability object handed to handlers.
//!
//! Scoped to one inbound request (or notification), it is the only legal
//! path for a handler to talk back to the client: server-originated
//! requests, notifications, progress, logging, and the cancellation
//! signal. It also exposes the negotiated client state and the opaque
//! user context configured at build time.

use serde_json::{json, Map, Value};
use std::sync::Arc;

use coremcp_protocol::types::{
    ClientCapabilities, CreateMessageRequest, CreateMessageResult, Implementation, ListRootsResult,
    LogLevel, LoggingMessageParams, ProgressUpdate, Root,
};
use coremcp_protocol::{methods, McpError, RequestId};

use crate::cancel::CancelToken;
use crate::outbound::PendingRequest;
use crate::progress::ProgressCallback;
use crate::session::Session;

/// Capability object scoped to one inbound request.
#[derive(Clone)]
pub struct RequestExchange {
    session: Session,
    method: Arc<str>,
    request_id: Option<RequestId>,
    meta: Option<Value>,
    cancel: Option<Arc<CancelToken>>,
}

impl RequestExchange {
    pub(crate) fn new(
        session: Session,
        method: &str,
        request_id: Option<RequestId>,
        params: Option<&Value>,
        cancel: Option<Arc<CancelToken>>,
    ) -> Self {
        let meta = params.and_then(|p| p.get("_meta")).cloned();
        Self {
            session,
            method: Arc::from(method),
            request_id,
            meta,
            cancel,
        }
    }

    /// The session this request arrived on.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Method name of the request being handled.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Id of the request being handled; absent for notifications.
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// The request's `_meta` object, passed through verbatim.
    pub fn request_meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    /// Progress token the client attached to this request, if any.
    /// Tokens are opaque; strings and numbers are echoed verbatim.
    pub fn progress_token(&self) -> Option<&Value> {
        self.meta
            .as_ref()
            .and_then(|m| m.get("progressToken"))
            .filter(|v| v.is_string() || v.is_number())
    }

    /// Negotiated client implementation info.
    pub fn client_info(&self) -> Option<Implementation> {
        self.session.client_info()
    }

    /// Negotiated client capabilities.
    pub fn client_capabilities(&self) -> Option<ClientCapabilities> {
        self.session.client_capabilities()
    }

    /// Negotiated protocol revision.
    pub fn protocol_version(&self) -> Option<String> {
        self.session.protocol_version()
    }

    /// The opaque user context configured at build time.
    pub fn context(&self) -> &Map<String, Value> {
        self.session.context()
    }

    /// Cancellation signal for this request. Completes with the client's
    /// reason when a matching `notifications/cancelled` arrives.
    ///
    /// For notifications (which cannot be cancelled) this returns a token
    /// that never fires.
    pub fn req_cancelled(&self) -> Arc<CancelToken> {
        match &self.cancel {
            Some(token) => Arc::clone(token),
            None => Arc::new(CancelToken::new()),
        }
    }

    /// Send a server-originated request to the client.
    ///
    /// When `on_progress` is supplied, a fresh token is registered and
    /// embedded in the outgoing `_meta.progressToken`; every inbound
    /// `notifications/progress` bearing it invokes the callback until the
    /// request reaches a terminal state.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<PendingRequest, McpError> {
        self.session.send_request(method, params, on_progress).await
    }

    /// Send a notification to the client.
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), McpError> {
        self.session.send_notification(method, params).await
    }

    /// Report progress for the current request. Returns `true` iff the
    /// request carried a `_meta.progressToken`; without one nothing is
    /// emitted.
    pub async fn report_progress(&self, update: ProgressUpdate) -> Result<bool, McpError> {
        let Some(token) = self.progress_token().cloned() else {
            return Ok(false);
        };
        let mut params = serde_json::to_value(&update)
            .map_err(|e| McpError::internal(e.to_string()))?;
        params["progressToken"] = token;
        self.session
            .send_notification(methods::NOTIF_PROGRESS, Some(params))
            .await?;
        Ok(true)
    }

    /// Log a message. Always logs locally through `tracing`; additionally
    /// emits `notifications/message` when the client has configured a
    /// logging level via `logging/setLevel`.
    pub async fn log(
        &self,
        level: LogLevel,
        logger: Option<String>,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Result<(), McpError> {
        let message = message.into();
        let logger_name = logger.as_deref().unwrap_or("server");
        match level {
            LogLevel::Debug => tracing::debug!(logger = logger_name, "{message}"),
            LogLevel::Info | LogLevel::Notice => {
                tracing::info!(logger = logger_name, "{message}");
            }
            LogLevel::Warning => tracing::warn!(logger = logger_name, "{message}"),
            _ => tracing::error!(logger = logger_name, "{message}"),
        }

        if self.session.logging_level().is_none() {
            return Ok(());
        }
        let params = LoggingMessageParams {
            level,
            logger,
            data: json!({"error": message, "details": data}),
        };
        self.session
            .send_notification(
                methods::NOTIF_MESSAGE,
                Some(serde_json::to_value(&params).map_err(|e| McpError::internal(e.to_string()))?),
            )
            .await
    }

    /// List the client's roots.
    ///
    /// Returns an empty list without any wire traffic when the client did
    /// not advertise the `roots` capability. When the client advertises
    /// `roots.listChanged`, the first result is memoized and reused until
    /// a `notifications/roots/list_changed` invalidates it; otherwise
    /// every call issues a fresh `roots/list` request.
    pub async fn list_roots(
        &self,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Vec<Root>, McpError> {
        let caps = self.client_capabilities().unwrap_or_default();
        let Some(roots_cap) = caps.roots else {
            return Ok(Vec::new());
        };

        if roots_cap.list_changed == Some(true) {
            // Holding the cache lock across the fetch makes concurrent
            // callers wait for the single in-flight request.
            let mut cache = self.session.roots_cache().lock().await;
            if let Some(cached) = cache.as_ref() {
                return Ok(cached.clone());
            }
            let roots = self.fetch_roots(on_progress).await?;
            *cache = Some(roots.clone());
            Ok(roots)
        } else {
            self.fetch_roots(on_progress).await
        }
    }

    async fn fetch_roots(
        &self,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Vec<Root>, McpError> {
        let pending = self
            .send_request(methods::LIST_ROOTS, None, on_progress)
            .await?;
        let value = pending.await?;
        let result: ListRootsResult = serde_json::from_value(value)
            .map_err(|e| McpError::internal(format!("malformed roots/list result: {e}")))?;
        Ok(result.roots)
    }

    /// Ask the client to run an LLM completion.
    ///
    /// Returns `Ok(None)` without any wire traffic when the client did not
    /// advertise the `sampling` capability.
    pub async fn create_message(
        &self,
        request: CreateMessageRequest,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Option<CreateMessageResult>, McpError> {
        let caps = self.client_capabilities().unwrap_or_default();
        if caps.sampling.is_none() {
            return Ok(None);
        }
        let params =
            serde_json::to_value(&request).map_err(|e| McpError::internal(e.to_string()))?;
        let pending = self
            .send_request(methods::CREATE_MESSAGE, Some(params), on_progress)
            .await?;
        let value = pending.await?;
        let result: CreateMessageResult = serde_json::from_value(value).map_err(|e| {
            McpError::internal(format!("malformed sampling/createMessage result: {e}"))
        })?;
        Ok(Some(result))
    }
}

impl std::fmt::Debug for RequestExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExchange")
            .field("method", &self.method)
            .field("request_id", &self.request_id)
            .finish()
    }
}
