//! Ping handler; legal in every session state.

use serde_json::{json, Value};

use coremcp_protocol::McpError;

use crate::exchange::RequestExchange;

pub(crate) async fn handle(
    _exchange: RequestExchange,
    _params: Option<Value>,
) -> Result<Value, McpError> {
    Ok(json!({}))
}
