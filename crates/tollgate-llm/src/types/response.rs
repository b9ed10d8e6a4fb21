use serde::{Deserialize, Serialize};

use super::message::Role;

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation
    Stop,
    /// Hit the output token limit
    Length,
    /// Content was filtered by safety systems
    ContentFilter,
    /// Vendor reported an error for this choice
    Error,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion)
    pub total_tokens: u32,
}

impl Usage {
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A single completion choice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    /// Index of this choice
    pub index: u32,
    /// Generated message
    pub message: ChoiceMessage,
    /// Why generation stopped
    pub finish_reason: Option<FinishReason>,
}

/// Message content within a response choice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceMessage {
    /// Author role
    pub role: Role,
    /// Text content
    pub content: String,
}

/// Provider-agnostic completion response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    /// Unique response identifier
    pub id: String,
    /// Object type (e.g. "chat.completion")
    pub object: String,
    /// Unix timestamp of creation
    pub created: u64,
    /// Model used for generation
    pub model: String,
    /// Generated choices
    pub choices: Vec<Choice>,
    /// Token usage statistics
    pub usage: Usage,
    /// Cost in USD, 0 when the model has no known price; returned in headers
    #[serde(skip)]
    pub cost: f64,
}

impl ChatResponse {
    /// Text of the first choice, empty when there are no choices
    pub fn first_text(&self) -> &str {
        self.choices.first().map_or("", |choice| choice.message.content.as_str())
    }
}
