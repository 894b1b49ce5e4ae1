//! Cancellation and progress notification types.

use serde::{Deserialize, Serialize};

use crate::jsonrpc::RequestId;

use super::core::ProgressToken;

/// `notifications/cancelled` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledParams {
    /// Id of the request being abandoned.
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    /// Why it was abandoned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `notifications/progress` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressParams {
    /// Token correlating the notification to a request.
    #[serde(rename = "progressToken")]
    pub progress_token: ProgressToken,
    /// Work done so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Total work, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Human-readable status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Handler-facing progress report; merged with the request's token when
/// emitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Work done so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Total work, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Human-readable status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `notifications/resources/updated` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUpdatedParams {
    /// URI of the resource that changed.
    pub uri: String,
}
