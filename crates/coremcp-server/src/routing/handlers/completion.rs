//! Completion handler: specific handler lookup, default fallback.

use serde_json::Value;

use coremcp_protocol::types::{CompleteRequest, CompleteResult};
use coremcp_protocol::McpError;

use crate::exchange::RequestExchange;
use crate::reply::CompletionReply;
use crate::routing::parse_params;

fn into_result(reply: CompletionReply) -> Result<CompleteResult, McpError> {
    match reply {
        CompletionReply::Values(values) => Ok(CompleteResult::from_values(values)),
        CompletionReply::Paged { values, total } => {
            Ok(CompleteResult::from_values_with_total(values, total))
        }
        CompletionReply::Rpc(error) => Err(error),
    }
}

pub(crate) async fn handle(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let request: CompleteRequest = parse_params(params)?;
    let registry = &exchange.session().inner().registry;

    let reply = if let Some(handler) = registry.completions.get(&request.reference).cloned() {
        handler
            .complete(
                exchange.clone(),
                &request.argument.name,
                &request.argument.value,
            )
            .await
    } else if let Some(handler) = registry.default_completion.clone() {
        handler
            .complete(
                exchange.clone(),
                &request.reference.ref_type,
                &request.reference.name,
                &request.argument.name,
                &request.argument.value,
            )
            .await
    } else {
        return Err(McpError::invalid_params(format!(
            "Completion {}/{} not found",
            request.reference.ref_type, request.reference.name
        )));
    };

    let result = into_result(reply)?;
    serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
}
