//! Initialize handler: version validation, state transition, capability
//! advertisement.

use serde_json::Value;

use coremcp_protocol::types::{
    CompletionsCapability, Implementation, InitializeRequest, InitializeResult, LoggingCapability,
    PromptsCapability, ResourcesCapability, ServerCapabilities, ToolsCapability,
};
use coremcp_protocol::{McpError, SUPPORTED_VERSIONS};

use crate::exchange::RequestExchange;
use crate::routing::parse_params;
use crate::session::{InitPhase, Session};

pub(crate) async fn handle(
    exchange: RequestExchange,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let request: InitializeRequest = parse_params(params)?;

    if !SUPPORTED_VERSIONS.contains(&request.protocol_version.as_str()) {
        return Err(McpError::UnsupportedProtocolVersion {
            requested: request.protocol_version,
            supported: SUPPORTED_VERSIONS.iter().map(|v| (*v).to_string()).collect(),
        });
    }

    let session = exchange.session();
    {
        let mut state = session.inner().state.write();
        if state.phase != InitPhase::Fresh {
            return Err(McpError::invalid_params("Session is initialized already"));
        }
        state.client_info = Some(request.client_info);
        state.client_capabilities = Some(request.capabilities);
        state.protocol_version = Some(request.protocol_version.clone());
        state.phase = InitPhase::Initializing;
    }

    let info = session.server_info();
    let result = InitializeResult {
        protocol_version: request.protocol_version,
        capabilities: advertised_capabilities(session),
        server_info: Implementation::new(info.name.clone(), info.version.clone()),
        instructions: info.instructions.clone(),
    };
    serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
}

/// Derive the capability advertisement from the configured handlers.
fn advertised_capabilities(session: &Session) -> ServerCapabilities {
    let registry = &session.inner().registry;
    ServerCapabilities {
        logging: session
            .server_info()
            .logging
            .then(LoggingCapability::default),
        completions: registry
            .has_completions()
            .then(CompletionsCapability::default),
        prompts: registry.has_prompts().then(|| PromptsCapability {
            list_changed: Some(false),
        }),
        tools: registry.has_tools().then(|| ToolsCapability {
            list_changed: Some(true),
        }),
        resources: registry.resources.as_ref().map(|provider| ResourcesCapability {
            subscribe: Some(provider.supports_subscriptions()),
            list_changed: Some(provider.supports_list_changed()),
        }),
    }
}
