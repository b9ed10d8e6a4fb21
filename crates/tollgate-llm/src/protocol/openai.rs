//! `OpenAI` chat completion API wire format types
//!
//! The gateway's own inbound API uses the same request shape.

use serde::{Deserialize, Serialize};

// -- Request types --

/// `OpenAI` chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages
    pub messages: Vec<OpenAiMessage>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Stream options (e.g. `include_usage`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<OpenAiStreamOptions>,
}

/// `OpenAI` stream options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiStreamOptions {
    /// Include usage statistics in the final chunk
    #[serde(default)]
    pub include_usage: bool,
}

/// `OpenAI` message within a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiMessage {
    /// Message role
    pub role: String,
    /// Content (string or array of content parts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<OpenAiContent>,
}

/// `OpenAI` content can be a string or array of content parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenAiContent {
    /// Plain text content
    Text(String),
    /// Array of content parts
    Parts(Vec<OpenAiContentPart>),
}

/// Individual content part in an `OpenAI` message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAiContentPart {
    /// Text content
    Text {
        /// The text string
        text: String,
    },
    /// Image content via URL
    ImageUrl {
        /// Image URL payload
        image_url: OpenAiImageUrl,
    },
}

/// Image URL payload for `OpenAI`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiImageUrl {
    /// Base64 data URI
    pub url: String,
    /// Detail level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// -- Response types --

/// `OpenAI` chat completion response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiResponse {
    /// Response identifier
    pub id: String,
    /// Object type
    #[serde(default)]
    pub object: String,
    /// Creation timestamp
    #[serde(default)]
    pub created: u64,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Generated choices
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

/// Choice within an `OpenAI` response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    /// Choice index
    pub index: u32,
    /// Generated message
    pub message: OpenAiChoiceMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message within an `OpenAI` response choice
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoiceMessage {
    /// Role (normally "assistant")
    pub role: String,
    /// Text content
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage in an `OpenAI` response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiUsage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
}

// -- Streaming types --

/// `OpenAI` streaming chunk
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiStreamChunk {
    /// Delta choices
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
    /// Usage (final chunk when `stream_options.include_usage` is set)
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

/// Choice within a streaming chunk
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiStreamChoice {
    /// Choice index
    pub index: u32,
    /// Incremental delta
    pub delta: OpenAiStreamDelta,
    /// Finish reason (present on final chunk)
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Delta content within a streaming choice
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiStreamDelta {
    /// Incremental text content
    #[serde(default)]
    pub content: Option<String>,
}
