//! Handler registry.
//!
//! Tool and prompt sub-maps are replaced wholesale on mutation and shared
//! as `Arc` snapshots, so the change-notification logic can compare and
//! emit on identity change while readers keep a consistent view.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use coremcp_protocol::types::{CompletionReference, Prompt, ResourceTemplate, Tool};

use crate::handlers::{CompletionHandler, DefaultCompletionHandler, PromptHandler, ToolHandler};
use crate::resources::ResourceProvider;

/// A registered tool: public definition plus handler.
#[derive(Clone)]
pub struct ToolEntry {
    /// Definition returned by `tools/list`.
    pub tool: Tool,
    /// Invocation handler.
    pub handler: Arc<dyn ToolHandler>,
}

/// A registered prompt: public definition plus handler.
#[derive(Clone)]
pub struct PromptEntry {
    /// Definition returned by `prompts/list`; required arguments first.
    pub prompt: Prompt,
    /// Render handler.
    pub handler: Arc<dyn PromptHandler>,
}

pub(crate) struct HandlerRegistry {
    tools: RwLock<Arc<HashMap<String, ToolEntry>>>,
    prompts: RwLock<Arc<HashMap<String, PromptEntry>>>,
    pub(crate) resources: Option<Arc<dyn ResourceProvider>>,
    pub(crate) templates: Vec<ResourceTemplate>,
    pub(crate) completions: HashMap<CompletionReference, Arc<dyn CompletionHandler>>,
    pub(crate) default_completion: Option<Arc<dyn DefaultCompletionHandler>>,
}

impl HandlerRegistry {
    pub(crate) fn new(
        tools: HashMap<String, ToolEntry>,
        prompts: HashMap<String, PromptEntry>,
        resources: Option<Arc<dyn ResourceProvider>>,
        templates: Vec<ResourceTemplate>,
        completions: HashMap<CompletionReference, Arc<dyn CompletionHandler>>,
        default_completion: Option<Arc<dyn DefaultCompletionHandler>>,
    ) -> Self {
        Self {
            tools: RwLock::new(Arc::new(tools)),
            prompts: RwLock::new(Arc::new(prompts)),
            resources,
            templates,
            completions,
            default_completion,
        }
    }

    pub(crate) fn tools(&self) -> Arc<HashMap<String, ToolEntry>> {
        Arc::clone(&self.tools.read())
    }

    pub(crate) fn prompts(&self) -> Arc<HashMap<String, PromptEntry>> {
        Arc::clone(&self.prompts.read())
    }

    pub(crate) fn has_tools(&self) -> bool {
        !self.tools.read().is_empty()
    }

    pub(crate) fn has_prompts(&self) -> bool {
        !self.prompts.read().is_empty()
    }

    pub(crate) fn has_completions(&self) -> bool {
        !self.completions.is_empty() || self.default_completion.is_some()
    }

    /// Replace the tool map with one that includes `entry`. Returns true
    /// when the map actually changed.
    pub(crate) fn insert_tool(&self, entry: ToolEntry) -> bool {
        let mut guard = self.tools.write();
        let mut next: HashMap<String, ToolEntry> = (**guard).clone();
        next.insert(entry.tool.name.clone(), entry);
        *guard = Arc::new(next);
        true
    }

    /// Replace the tool map with one that excludes `name`. Returns true
    /// when the tool existed.
    pub(crate) fn remove_tool(&self, name: &str) -> bool {
        let mut guard = self.tools.write();
        if !guard.contains_key(name) {
            return false;
        }
        let mut next: HashMap<String, ToolEntry> = (**guard).clone();
        next.remove(name);
        *guard = Arc::new(next);
        true
    }

    pub(crate) fn insert_prompt(&self, entry: PromptEntry) -> bool {
        let mut guard = self.prompts.write();
        let mut next: HashMap<String, PromptEntry> = (**guard).clone();
        next.insert(entry.prompt.name.clone(), entry);
        *guard = Arc::new(next);
        true
    }

    pub(crate) fn remove_prompt(&self, name: &str) -> bool {
        let mut guard = self.prompts.write();
        if !guard.contains_key(name) {
            return false;
        }
        let mut next: HashMap<String, PromptEntry> = (**guard).clone();
        next.remove(name);
        *guard = Arc::new(next);
        true
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tools", &self.tools.read().len())
            .field("prompts", &self.prompts.read().len())
            .field("has_resources", &self.resources.is_some())
            .field("templates", &self.templates.len())
            .field("completions", &self.completions.len())
            .finish()
    }
}
