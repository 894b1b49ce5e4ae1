//! Argument autocompletion types.

use serde::{Deserialize, Serialize};

/// Reference identifying what is being completed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionReference {
    /// Reference type, e.g. `ref/prompt` or `ref/resource`.
    #[serde(rename = "type")]
    pub ref_type: String,
    /// Name of the referenced item.
    pub name: String,
}

/// The argument being completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionArgument {
    /// Argument name.
    pub name: String,
    /// Current, possibly partial, value.
    pub value: String,
}

/// `completion/complete` request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    /// What is being completed.
    #[serde(rename = "ref")]
    pub reference: CompletionReference,
    /// The argument under completion.
    pub argument: CompletionArgument,
}

/// Completion values with pagination hints. `values` never exceeds 100
/// entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionData {
    /// Up to 100 completion values.
    pub values: Vec<String>,
    /// Total number of matches, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Whether matches beyond `values` exist.
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

/// `completion/complete` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteResult {
    /// Completion payload.
    pub completion: CompletionData,
}

impl CompleteResult {
    /// Build a result from a full candidate list: the first 100 values are
    /// kept, `total` is the candidate count, and `hasMore` flags
    /// truncation.
    pub fn from_values(values: Vec<String>) -> Self {
        let total = values.len() as u64;
        let has_more = values.len() > 100;
        let values = values.into_iter().take(100).collect();
        Self {
            completion: CompletionData {
                values,
                total: Some(total),
                has_more,
            },
        }
    }

    /// Build a result from a partial candidate list and a known total.
    /// `hasMore` is set when the kept values fall short of the total.
    pub fn from_values_with_total(values: Vec<String>, total: u64) -> Self {
        let values: Vec<String> = values.into_iter().take(100).collect();
        let has_more = (values.len() as u64) < total;
        Self {
            completion: CompletionData {
                values,
                total: Some(total),
                has_more,
            },
        }
    }
}
