//! Tool handlers: list and call.

use serde_json::Value;

use coremcp_protocol::types::{CallToolRequest, ListToolsRequest, ListToolsResult};
use coremcp_protocol::McpError;

use crate::exchange::RequestExchange;
use crate::routing::parse_params;

pub(crate) async fn handle_list(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    // Cursor accepted, not interpreted.
    let _request: ListToolsRequest = parse_params(params)?;
    let tools = exchange.session().inner().registry.tools();
    let mut tools: Vec<_> = tools.values().map(|entry| entry.tool.clone()).collect();
    tools.sort_by(|a, b| a.name.cmp(&b.name));
    let result = ListToolsResult {
        tools,
        next_cursor: None,
    };
    serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
}

pub(crate) async fn handle_call(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let request: CallToolRequest = parse_params(params)?;

    let entry = exchange
        .session()
        .inner()
        .registry
        .tools()
        .get(&request.name)
        .cloned()
        .ok_or_else(|| McpError::invalid_params(format!("Tool {} not found", request.name)))?;

    let arguments = request.arguments.unwrap_or_default();
    let reply = entry.handler.call(exchange, arguments).await;
    let result = reply.into_result()?;
    serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
}
