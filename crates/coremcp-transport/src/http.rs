//! HTTP transport with Server-Sent Events.
//!
//! Client → server traffic arrives as HTTP POST bodies; the response to a
//! request goes back in the POST response body. Server-originated traffic
//! (notifications, `roots/list`, sampling) is queued per session and
//! flushed to the client through an SSE stream opened with GET. Sessions
//! are issued on a successful `initialize` and carried in the
//! `Mcp-Session-Id` header, with a `?sessionId=` query fallback on GET.
//! DELETE tears the session down.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use dashmap::DashMap;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

use coremcp_server::Session;

/// Session id request/response header.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// HTTP transport configuration.
#[derive(Clone)]
pub struct HttpServerConfig {
    /// Path serving POST/GET/DELETE, default `/mcp`.
    pub path: String,
    /// Origin allow-list. `None` accepts any origin; requests bearing an
    /// `Origin` header outside the list are rejected with 403.
    pub allowed_origins: Option<Vec<String>>,
    /// When set, the first SSE frame is `event: endpoint` carrying this
    /// URL.
    pub endpoint: Option<String>,
    /// SSE keep-alive interval.
    pub keep_alive: Duration,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            path: "/mcp".to_string(),
            allowed_origins: None,
            endpoint: None,
            keep_alive: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for HttpServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServerConfig")
            .field("path", &self.path)
            .field("allowed_origins", &self.allowed_origins)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Produces a fresh session per connection.
pub type SessionFactory = Arc<dyn Fn() -> Session + Send + Sync>;

struct HttpSession {
    session: Session,
    #[allow(dead_code)]
    created_at: Instant,
    /// Receiver half of the pending-message queue; taken by the first GET.
    outbox: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

#[derive(Clone)]
struct AppState {
    config: Arc<HttpServerConfig>,
    factory: SessionFactory,
    sessions: Arc<DashMap<String, Arc<HttpSession>>>,
}

/// Build the axum router for the MCP endpoint.
pub fn router(config: HttpServerConfig, factory: SessionFactory) -> Router {
    let path = config.path.clone();
    let state = AppState {
        config: Arc::new(config),
        factory,
        sessions: Arc::new(DashMap::new()),
    };
    Router::new()
        .route(
            &path,
            post(handle_post).get(handle_get).delete(handle_delete),
        )
        .with_state(state)
}

/// Bind and serve the MCP endpoint.
pub async fn serve(
    addr: &str,
    config: HttpServerConfig,
    factory: SessionFactory,
) -> io::Result<()> {
    let app = router(config, factory);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr, "serving MCP over HTTP");
    axum::serve(listener, app).await
}

fn origin_allowed(config: &HttpServerConfig, headers: &HeaderMap) -> bool {
    let Some(allowed) = &config.allowed_origins else {
        return true;
    };
    match headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        Some(origin) => allowed.iter().any(|a| a == origin),
        // Non-browser clients send no Origin header.
        None => true,
    }
}

fn session_header(id: &str) -> [(HeaderName, String); 1] {
    [(HeaderName::from_static(SESSION_ID_HEADER), id.to_string())]
}

fn json_content_type() -> [(HeaderName, &'static str); 1] {
    [(header::CONTENT_TYPE, "application/json")]
}

fn extract_method(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("method")?.as_str().map(String::from)
}

async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !origin_allowed(&state.config, &headers) {
        return StatusCode::FORBIDDEN.into_response();
    }

    let session_id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    match session_id {
        None => initialize_session(&state, &body).await,
        Some(id) => {
            let Some(entry) = state.sessions.get(&id).map(|e| Arc::clone(e.value())) else {
                return StatusCode::NOT_FOUND.into_response();
            };
            match entry.session.handle(&body).await {
                Some(reply) => (
                    StatusCode::OK,
                    session_header(&id),
                    json_content_type(),
                    reply,
                )
                    .into_response(),
                None => (StatusCode::ACCEPTED, session_header(&id)).into_response(),
            }
        }
    }
}

/// POST without a session id: only `initialize` is routable. A session id
/// is issued iff the initialize succeeds.
async fn initialize_session(state: &AppState, body: &str) -> Response {
    if extract_method(body).as_deref() != Some("initialize") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let session = (state.factory)();
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    session.set_output(Arc::new(move |text: String| {
        let tx = tx.clone();
        async move {
            tx.send(text)
                .map_err(|_| io::Error::other("session outbox closed"))
        }
        .boxed()
    }));

    let Some(reply) = session.handle(body).await else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let succeeded = serde_json::from_str::<Value>(&reply)
        .map(|v| v.get("error").is_none())
        .unwrap_or(false);
    if !succeeded {
        return (StatusCode::OK, json_content_type(), reply).into_response();
    }

    let id = uuid::Uuid::new_v4().to_string();
    state.sessions.insert(
        id.clone(),
        Arc::new(HttpSession {
            session,
            created_at: Instant::now(),
            outbox: Mutex::new(Some(rx)),
        }),
    );
    (StatusCode::OK, session_header(&id), json_content_type(), reply).into_response()
}

async fn handle_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !origin_allowed(&state.config, &headers) {
        return StatusCode::FORBIDDEN.into_response();
    }

    let session_id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| query.get("sessionId").cloned());
    let Some(id) = session_id else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let Some(entry) = state.sessions.get(&id).map(|e| Arc::clone(e.value())) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // One consumer per session; the queue (with any backlog accumulated
    // while no stream was attached) moves into the stream.
    let Some(mut rx) = entry.outbox.lock().await.take() else {
        return StatusCode::CONFLICT.into_response();
    };

    let endpoint = state.config.endpoint.clone();
    let stream = async_stream::stream! {
        if let Some(url) = endpoint {
            yield Ok::<Event, Infallible>(Event::default().event("endpoint").data(url));
        }
        while let Some(text) = rx.recv().await {
            yield Ok(Event::default().data(text));
        }
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(state.config.keep_alive))
        .into_response()
}

async fn handle_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if !origin_allowed(&state.config, &headers) {
        return StatusCode::FORBIDDEN.into_response();
    }

    let Some(id) = headers.get(SESSION_ID_HEADER).and_then(|v| v.to_str().ok()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state.sessions.remove(id) {
        Some((_, entry)) => {
            entry.session.clear_output();
            StatusCode::OK.into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
