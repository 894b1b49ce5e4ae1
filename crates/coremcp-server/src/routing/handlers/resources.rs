//! Resource handlers: list, read, subscribe/unsubscribe, templates.

use serde_json::{json, Value};
use std::sync::Arc;

use coremcp_protocol::types::{
    ListResourceTemplatesResult, ListResourcesRequest, ListResourcesResult, ReadResourceRequest,
    ReadResourceResult, SubscribeRequest, UnsubscribeRequest,
};
use coremcp_protocol::McpError;

use crate::exchange::RequestExchange;
use crate::resources::ResourceProvider;
use crate::routing::parse_params;

fn provider(exchange: &RequestExchange) -> Result<Arc<dyn ResourceProvider>, McpError> {
    exchange
        .session()
        .inner()
        .registry
        .resources
        .clone()
        .ok_or_else(|| McpError::invalid_params("Resources are not supported"))
}

pub(crate) async fn handle_list(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let request: ListResourcesRequest = parse_params(params)?;
    let provider = provider(&exchange)?;
    let page = provider.list(&exchange, request.cursor).await?;
    let result = ListResourcesResult {
        resources: page.resources,
        next_cursor: page.next_cursor,
    };
    serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
}

pub(crate) async fn handle_read(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let request: ReadResourceRequest = parse_params(params)?;
    let provider = provider(&exchange)?;

    let handle = provider
        .get(&exchange, &request.uri)
        .await?
        .ok_or(McpError::ResourceNotFound { uri: request.uri.clone() })?;

    let reply = handle.reader.read(exchange, &request.uri).await;
    let contents = reply.into_contents(&handle.descriptor)?;
    serde_json::to_value(ReadResourceResult { contents })
        .map_err(|e| McpError::internal(e.to_string()))
}

pub(crate) async fn handle_subscribe(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let request: SubscribeRequest = parse_params(params)?;
    let provider = provider(&exchange)?;
    provider.subscribe(&exchange, &request.uri).await?;
    exchange.session().add_subscription(&request.uri);
    Ok(json!({"uri": request.uri}))
}

pub(crate) async fn handle_unsubscribe(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let request: UnsubscribeRequest = parse_params(params)?;
    let provider = provider(&exchange)?;
    provider.unsubscribe(&exchange, &request.uri).await?;
    exchange.session().remove_subscription(&request.uri);
    Ok(json!({"uri": request.uri}))
}

pub(crate) async fn handle_list_templates(
    exchange: RequestExchange,
    _params: Option<Value>,
) -> Result<Value, McpError> {
    provider(&exchange)?;
    let templates = exchange.session().inner().registry.templates.clone();
    serde_json::to_value(ListResourceTemplatesResult {
        resource_templates: templates,
    })
    .map_err(|e| McpError::internal(e.to_string()))
}
