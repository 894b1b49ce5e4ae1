//! Logging level handler.

use serde_json::{json, Value};

use coremcp_protocol::types::SetLevelRequest;
use coremcp_protocol::McpError;

use crate::exchange::RequestExchange;
use crate::routing::parse_params;

pub(crate) async fn handle_set_level(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    // Level names outside the eight MCP levels fail deserialization and
    // surface as invalid params.
    let request: SetLevelRequest = parse_params(params)?;
    exchange.session().inner().state.write().logging_level = Some(request.level);
    Ok(json!({}))
}
