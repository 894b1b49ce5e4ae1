//! Prompt handlers: list and get.

use serde_json::Value;

use coremcp_protocol::types::{GetPromptRequest, ListPromptsRequest, ListPromptsResult};
use coremcp_protocol::McpError;

use crate::exchange::RequestExchange;
use crate::routing::parse_params;

pub(crate) async fn handle_list(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    // Cursor accepted, not interpreted.
    let _request: ListPromptsRequest = parse_params(params)?;
    let prompts = exchange.session().inner().registry.prompts();
    let mut prompts: Vec<_> = prompts.values().map(|entry| entry.prompt.clone()).collect();
    prompts.sort_by(|a, b| a.name.cmp(&b.name));
    let result = ListPromptsResult {
        prompts,
        next_cursor: None,
    };
    serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
}

pub(crate) async fn handle_get(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let request: GetPromptRequest = parse_params(params)?;

    let entry = exchange
        .session()
        .inner()
        .registry
        .prompts()
        .get(&request.name)
        .cloned()
        .ok_or_else(|| McpError::invalid_params(format!("Prompt {} not found", request.name)))?;

    let arguments = request.arguments.unwrap_or_default();
    let reply = entry.handler.render(exchange, arguments).await;
    let result = reply.into_result()?;
    serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
}
