//! Filesystem root types.

use serde::{Deserialize, Serialize};

/// A client-advertised root the server may operate within.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    /// Root URI, typically `file://`.
    pub uri: String,
    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `roots/list` result, received from the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRootsResult {
    /// Roots the client advertises.
    pub roots: Vec<Root>,
}
