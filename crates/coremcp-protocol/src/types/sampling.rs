//! Sampling types: server-initiated LLM completions executed by the
//! client.

use serde::{Deserialize, Serialize};

use super::content::ContentBlock;
use super::core::Role;

/// Context-inclusion options for sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IncludeContext {
    /// No server context.
    None,
    /// Context from this server only.
    ThisServer,
    /// Context from all connected servers.
    AllServers,
}

/// One conversation message in a sampling request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingMessage {
    /// Message role.
    pub role: Role,
    /// Message content.
    pub content: ContentBlock,
}

impl SamplingMessage {
    /// Text message with a role.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: ContentBlock::text(text),
        }
    }
}

/// Model-selection hint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelHint {
    /// Model name fragment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Model preferences for a sampling request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelPreferences {
    /// Selection hints, evaluated in order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<ModelHint>>,
    /// Intelligence priority, 0.0 to 1.0.
    #[serde(
        rename = "intelligencePriority",
        skip_serializing_if = "Option::is_none"
    )]
    pub intelligence_priority: Option<f64>,
    /// Speed priority, 0.0 to 1.0.
    #[serde(rename = "speedPriority", skip_serializing_if = "Option::is_none")]
    pub speed_priority: Option<f64>,
}

/// `sampling/createMessage` request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    /// Conversation messages.
    pub messages: Vec<SamplingMessage>,
    /// Model preferences.
    #[serde(
        rename = "modelPreferences",
        skip_serializing_if = "Option::is_none"
    )]
    pub model_preferences: Option<ModelPreferences>,
    /// System prompt.
    #[serde(rename = "systemPrompt", skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Context-inclusion request.
    #[serde(rename = "includeContext", skip_serializing_if = "Option::is_none")]
    pub include_context: Option<IncludeContext>,
    /// Generation budget.
    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

/// `sampling/createMessage` result, received from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageResult {
    /// Role of the generated message.
    pub role: Role,
    /// Generated content.
    pub content: ContentBlock,
    /// Model the client used.
    pub model: String,
    /// Why generation stopped.
    #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

/// Stop reason of a sampling completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// Generation completed naturally.
    EndTurn,
    /// Token budget exhausted.
    MaxTokens,
    /// A stop sequence matched.
    StopSequence,
}
