//! Prompt types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::content::ContentBlock;
use super::core::{Cursor, Role};

/// Public prompt definition, as returned by `prompts/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Prompt name (programmatic identifier).
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared arguments, required entries first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<PromptArgument>>,
}

impl Prompt {
    /// Prompt definition with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a required argument. Required arguments always precede
    /// optional ones in the public listing, regardless of call order.
    pub fn required_arg(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        let arguments = self.arguments.get_or_insert_with(Vec::new);
        let position = arguments.iter().take_while(|a| a.required).count();
        arguments.insert(
            position,
            PromptArgument {
                name: name.into(),
                description: Some(description.into()),
                required: true,
            },
        );
        self
    }

    /// Declare an optional argument, appended after all required ones.
    pub fn optional_arg(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.arguments
            .get_or_insert_with(Vec::new)
            .push(PromptArgument {
                name: name.into(),
                description: Some(description.into()),
                required: false,
            });
        self
    }
}

/// One declared prompt argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument must be supplied.
    pub required: bool,
}

/// `prompts/list` request parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPromptsRequest {
    /// Pagination cursor; accepted but not interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

/// `prompts/list` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPromptsResult {
    /// Configured prompts.
    pub prompts: Vec<Prompt>,
    /// Continuation token.
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

/// `prompts/get` request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptRequest {
    /// Prompt name.
    pub name: String,
    /// Argument values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
}

/// `prompts/get` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    /// Prompt description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rendered messages.
    pub messages: Vec<PromptMessage>,
}

/// One rendered prompt message. The role is null when the handler returned
/// a bare content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Message role, if the handler assigned one.
    pub role: Option<Role>,
    /// Message content.
    pub content: ContentBlock,
}

impl PromptMessage {
    /// Message with an explicit role.
    pub fn new(role: Role, content: ContentBlock) -> Self {
        Self {
            role: Some(role),
            content,
        }
    }
}
