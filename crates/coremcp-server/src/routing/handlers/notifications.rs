//! Inbound notification handlers: initialized, cancelled, progress, and
//! roots list changes.

use serde_json::{json, Value};

use coremcp_protocol::types::CancelledParams;
use coremcp_protocol::McpError;

use crate::exchange::RequestExchange;
use crate::routing::parse_params;
use crate::session::InitPhase;

pub(crate) async fn handle_initialized(
    exchange: RequestExchange,
    _params: Option<Value>,
) -> Result<Value, McpError> {
    // Idempotent; the phase never moves backwards.
    exchange.session().inner().state.write().phase = InitPhase::Initialized;
    Ok(json!({}))
}

pub(crate) async fn handle_cancelled(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let request: CancelledParams = parse_params(params)?;
    if let Some(token) = exchange.session().inner().in_flight.get(&request.request_id) {
        token.cancel(request.reason);
    }
    Ok(json!({}))
}

pub(crate) async fn handle_progress(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let Some(params) = params else {
        return Ok(json!({}));
    };
    // Tokens may arrive as strings or numbers; registrations are keyed by
    // the string form. Unknown tokens are ignored.
    let token = match params.get("progressToken") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Ok(json!({})),
    };
    exchange.session().inner().progress.dispatch(&token, params);
    Ok(json!({}))
}

pub(crate) async fn handle_roots_list_changed(
    exchange: RequestExchange,
    _params: Option<Value>,
) -> Result<Value, McpError> {
    let session = exchange.session();
    session.roots_cache().lock().await.take();
    if let Some(callback) = session.inner().roots_changed.clone() {
        callback(session.clone());
    }
    Ok(json!({}))
}
