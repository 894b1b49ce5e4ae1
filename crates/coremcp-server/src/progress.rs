//! Progress token registry for server-originated requests.
//!
//! When an outbound request is sent with a progress callback, a fresh
//! UUID token is registered here and embedded in the request's
//! `_meta.progressToken`. Inbound `notifications/progress` frames route
//! through [`ProgressRegistry::dispatch`]; unknown tokens are ignored.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// Callback invoked with the full `notifications/progress` params map.
pub type ProgressCallback = Arc<dyn Fn(Value) + Send + Sync>;

#[derive(Default)]
pub(crate) struct ProgressRegistry {
    callbacks: DashMap<String, ProgressCallback>,
}

impl ProgressRegistry {
    pub(crate) fn register(&self, token: String, callback: ProgressCallback) {
        self.callbacks.insert(token, callback);
    }

    pub(crate) fn deregister(&self, token: &str) {
        self.callbacks.remove(token);
    }

    /// Invoke the callback registered for `token`, if any. The map guard
    /// is released before the callback runs so it may touch the registry.
    pub(crate) fn dispatch(&self, token: &str, params: Value) {
        let callback = self
            .callbacks
            .get(token)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(callback) = callback {
            callback(params);
        }
    }
}

impl std::fmt::Debug for ProgressRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressRegistry")
            .field("registered", &self.callbacks.len())
            .finish()
    }
}
