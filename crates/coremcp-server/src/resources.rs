//! Resource provider contract and the default in-memory lookup provider.
//!
//! A provider resolves URIs to readable resources and reports which
//! optional capabilities (`subscribe`, `listChanged`) it supports; the
//! advertisement in the `initialize` result is derived from these flags.
//! The session keeps the set of subscribed URIs; the `resources/subscribe`
//! handler delegates to the provider first and then records the URI.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use coremcp_protocol::types::Resource;
use coremcp_protocol::McpError;

use crate::exchange::RequestExchange;
use crate::reply::ResourceReply;

/// One page of `resources/list` output.
#[derive(Debug, Clone, Default)]
pub struct ResourcePage {
    /// Resource descriptors.
    pub resources: Vec<Resource>,
    /// Continuation token, echoed to the client.
    pub next_cursor: Option<String>,
}

/// Reads the body of one resource.
#[async_trait]
pub trait ResourceReader: Send + Sync {
    /// Produce the resource body for `uri`.
    async fn read(&self, exchange: RequestExchange, uri: &str) -> ResourceReply;
}

struct FnResourceReader<F>(F);

#[async_trait]
impl<F, Fut, R> ResourceReader for FnResourceReader<F>
where
    F: Fn(RequestExchange, String) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = R> + Send,
    R: Into<ResourceReply>,
{
    async fn read(&self, exchange: RequestExchange, uri: &str) -> ResourceReply {
        (self.0)(exchange, uri.to_string()).await.into()
    }
}

/// Wrap an async closure as a [`ResourceReader`].
pub fn resource_fn<F, Fut, R>(f: F) -> Arc<dyn ResourceReader>
where
    F: Fn(RequestExchange, String) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = R> + Send + 'static,
    R: Into<ResourceReply>,
{
    Arc::new(FnResourceReader(f))
}

/// A resolvable resource: descriptor plus body reader.
#[derive(Clone)]
pub struct ResourceHandle {
    /// Public descriptor.
    pub descriptor: Resource,
    /// Body reader.
    pub reader: Arc<dyn ResourceReader>,
}

/// Pluggable resource backend.
///
/// When no provider is configured, every `resources/*` method answers
/// Invalid Params "Resources are not supported".
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Whether the provider emits `notifications/resources/list_changed`.
    fn supports_list_changed(&self) -> bool {
        false
    }

    /// Whether `resources/subscribe` is meaningful for this provider.
    fn supports_subscriptions(&self) -> bool {
        false
    }

    /// List resources, optionally continuing from `cursor`.
    async fn list(
        &self,
        exchange: &RequestExchange,
        cursor: Option<String>,
    ) -> Result<ResourcePage, McpError>;

    /// Resolve a URI. `None` means the resource does not exist.
    async fn get(
        &self,
        exchange: &RequestExchange,
        uri: &str,
    ) -> Result<Option<ResourceHandle>, McpError>;

    /// Provider hook run before the session records a subscription.
    async fn subscribe(&self, _exchange: &RequestExchange, _uri: &str) -> Result<(), McpError> {
        Ok(())
    }

    /// Provider hook run before the session drops a subscription.
    async fn unsubscribe(&self, _exchange: &RequestExchange, _uri: &str) -> Result<(), McpError> {
        Ok(())
    }
}

/// Default provider: an in-memory `uri -> resource` lookup map.
#[derive(Default)]
pub struct InMemoryResources {
    entries: RwLock<HashMap<String, ResourceHandle>>,
}

impl InMemoryResources {
    /// Empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a resource.
    pub fn insert(&self, handle: ResourceHandle) {
        self.entries
            .write()
            .insert(handle.descriptor.uri.clone(), handle);
    }

    /// Remove a resource by URI.
    pub fn remove(&self, uri: &str) -> bool {
        self.entries.write().remove(uri).is_some()
    }
}

#[async_trait]
impl ResourceProvider for InMemoryResources {
    fn supports_list_changed(&self) -> bool {
        true
    }

    fn supports_subscriptions(&self) -> bool {
        true
    }

    async fn list(
        &self,
        _exchange: &RequestExchange,
        _cursor: Option<String>,
    ) -> Result<ResourcePage, McpError> {
        let mut resources: Vec<Resource> = self
            .entries
            .read()
            .values()
            .map(|handle| handle.descriptor.clone())
            .collect();
        resources.sort_by(|a, b| a.uri.cmp(&b.uri));
        Ok(ResourcePage {
            resources,
            next_cursor: None,
        })
    }

    async fn get(
        &self,
        _exchange: &RequestExchange,
        uri: &str,
    ) -> Result<Option<ResourceHandle>, McpError> {
        Ok(self.entries.read().get(uri).cloned())
    }
}

impl std::fmt::Debug for InMemoryResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryResources")
            .field("entries", &self.entries.read().len())
            .finish()
    }
}
