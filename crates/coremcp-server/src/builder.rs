//! Session construction.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use coremcp_protocol::codec::{Codec, JsonCodec};
use coremcp_protocol::types::{
    CompletionReference, LogLevel, Prompt, ResourceTemplate, Tool,
};
use coremcp_protocol::DEFAULT_CLIENT_REQUEST_TIMEOUT_MS;

use crate::handlers::{CompletionHandler, DefaultCompletionHandler, PromptHandler, ToolHandler};
use crate::middleware::{ErrorBoundary, Middleware};
use crate::outbound::OutboundTable;
use crate::progress::ProgressRegistry;
use crate::registry::{HandlerRegistry, PromptEntry, ToolEntry};
use crate::resources::ResourceProvider;
use crate::routing::{self, TableConfig};
use crate::session::{
    InitPhase, NegotiatedState, RootsChangedCallback, ServerInfo, Session, SessionInner,
};

/// Builder for [`Session`].
pub struct SessionBuilder {
    name: String,
    version: String,
    instructions: Option<String>,
    logging: bool,
    codec: Arc<dyn Codec>,
    tools: Vec<ToolEntry>,
    prompts: Vec<PromptEntry>,
    resources: Option<Arc<dyn ResourceProvider>>,
    templates: Vec<ResourceTemplate>,
    completions: HashMap<CompletionReference, Arc<dyn CompletionHandler>>,
    default_completion: Option<Arc<dyn DefaultCompletionHandler>>,
    roots_changed: Option<RootsChangedCallback>,
    context: Map<String, Value>,
    middleware: Vec<Arc<dyn Middleware>>,
    error_log_level: LogLevel,
    request_timeout: Duration,
    spawn_handlers: bool,
}

impl SessionBuilder {
    pub(crate) fn new() -> Self {
        Self {
            name: "coremcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: None,
            logging: false,
            codec: Arc::new(JsonCodec),
            tools: Vec::new(),
            prompts: Vec::new(),
            resources: None,
            templates: Vec::new(),
            completions: HashMap::new(),
            default_completion: None,
            roots_changed: None,
            context: Map::new(),
            middleware: Vec::new(),
            error_log_level: LogLevel::Info,
            request_timeout: Duration::from_millis(DEFAULT_CLIENT_REQUEST_TIMEOUT_MS),
            spawn_handlers: true,
        }
    }

    /// Server name advertised during the handshake.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Server version advertised during the handshake.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Usage instructions included in the `initialize` result.
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Advertise the `logging` capability.
    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Replace the JSON codec.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Register a tool.
    pub fn tool(mut self, tool: Tool, handler: Arc<dyn ToolHandler>) -> Self {
        self.tools.push(ToolEntry { tool, handler });
        self
    }

    /// Register a prompt. Its argument list should carry required entries
    /// first; [`Prompt::required_arg`] and [`Prompt::optional_arg`]
    /// maintain that order.
    pub fn prompt(mut self, prompt: Prompt, handler: Arc<dyn PromptHandler>) -> Self {
        self.prompts.push(PromptEntry { prompt, handler });
        self
    }

    /// Configure the resource provider.
    pub fn resources(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.resources = Some(provider);
        self
    }

    /// Append a resource template; the list is returned in registration
    /// order.
    pub fn resource_template(mut self, template: ResourceTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Register a completion handler for one `(ref type, name)` pair.
    pub fn completion(
        mut self,
        ref_type: impl Into<String>,
        name: impl Into<String>,
        handler: Arc<dyn CompletionHandler>,
    ) -> Self {
        self.completions.insert(
            CompletionReference {
                ref_type: ref_type.into(),
                name: name.into(),
            },
            handler,
        );
        self
    }

    /// Register the fallback completion handler.
    pub fn default_completion(mut self, handler: Arc<dyn DefaultCompletionHandler>) -> Self {
        self.default_completion = Some(handler);
        self
    }

    /// Callback invoked when the client announces a roots change.
    pub fn roots_changed(mut self, callback: RootsChangedCallback) -> Self {
        self.roots_changed = Some(callback);
        self
    }

    /// Attach an opaque context value, available to handlers verbatim.
    pub fn context_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Append a middleware. The first appended middleware is outermost
    /// within the configured stack; the error boundary always wraps the
    /// whole composition.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Level at which the error boundary logs handler failures.
    pub fn error_log_level(mut self, level: LogLevel) -> Self {
        self.error_log_level = level;
        self
    }

    /// Timeout for server-originated client requests.
    pub fn client_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Run handlers inline on the ingest call instead of spawning them
    /// onto the runtime. Inline handlers cannot observe cancellations or
    /// client responses that arrive in later frames.
    pub fn inline_handlers(mut self) -> Self {
        self.spawn_handlers = false;
        self
    }

    /// Build the session.
    pub fn build(self) -> Session {
        let table = routing::build_table(&TableConfig {
            middleware: self.middleware,
            error_boundary: ErrorBoundary::new(self.error_log_level),
        });

        let registry = HandlerRegistry::new(
            self.tools
                .into_iter()
                .map(|entry| (entry.tool.name.clone(), entry))
                .collect(),
            self.prompts
                .into_iter()
                .map(|entry| (entry.prompt.name.clone(), entry))
                .collect(),
            self.resources,
            self.templates,
            self.completions,
            self.default_completion,
        );

        let inner = SessionInner::new(
            ServerInfo {
                name: self.name,
                version: self.version,
                instructions: self.instructions,
                logging: self.logging,
            },
            self.codec,
            registry,
            table,
            NegotiatedState {
                client_info: None,
                client_capabilities: None,
                protocol_version: None,
                phase: InitPhase::Fresh,
                logging_level: None,
            },
            self.context,
            OutboundTable::new(self.request_timeout),
            ProgressRegistry::default(),
            self.roots_changed,
            self.spawn_handlers,
        );
        Session::from_inner(Arc::new(inner))
    }
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("tools", &self.tools.len())
            .field("prompts", &self.prompts.len())
            .finish()
    }
}
