//! Shared protocol primitives.

use serde::{Deserialize, Serialize};

/// Opaque pagination cursor. Accepted and echoed, never interpreted.
pub type Cursor = String;

/// Opaque token routing progress notifications back to a request.
pub type ProgressToken = String;

/// Implementation information exchanged during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    /// Implementation name.
    pub name: String,
    /// Implementation version.
    pub version: String,
}

impl Implementation {
    /// Create implementation info.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human user.
    User,
    /// The model.
    Assistant,
}

/// Display hints attachable to content blocks and resources.
///
/// `priority` is serialized verbatim; `audience` is a subset of the two
/// conversation roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    /// Which roles the content is intended for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<Role>>,
    /// Subjective importance hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
}

impl Annotations {
    /// Whether no hint is set.
    pub fn is_empty(&self) -> bool {
        self.audience.is_none() && self.priority.is_none()
    }
}

/// Result carrying no data, e.g. the `ping` reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyResult {}
