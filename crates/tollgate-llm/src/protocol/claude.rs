//! Anthropic Messages API wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// Messages API request
#[derive(Debug, Clone, Serialize)]
pub struct ClaudeRequest {
    /// Model identifier
    pub model: String,
    /// Maximum tokens to generate (required by the API)
    pub max_tokens: u32,
    /// System prompt (top-level, not in messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Alternating conversation turns
    pub messages: Vec<ClaudeMessage>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// One conversation turn
#[derive(Debug, Clone, Serialize)]
pub struct ClaudeMessage {
    /// Role ("user" or "assistant")
    pub role: &'static str,
    /// Content blocks
    pub content: Vec<ClaudeContentBlock>,
}

/// Content block in a request turn
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeContentBlock {
    /// Text content
    Text {
        /// The text string
        text: String,
    },
    /// Image content
    Image {
        /// Image source
        source: ClaudeImageSource,
    },
}

/// Base64 image source
#[derive(Debug, Clone, Serialize)]
pub struct ClaudeImageSource {
    /// Always "base64"
    #[serde(rename = "type")]
    pub source_type: &'static str,
    /// Media type (e.g. "image/png")
    pub media_type: String,
    /// Base64-encoded image data
    pub data: String,
}

// -- Response types --

/// Messages API response
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeResponse {
    /// Response identifier
    pub id: String,
    /// Role (always "assistant")
    pub role: String,
    /// Response content blocks
    #[serde(default)]
    pub content: Vec<ClaudeResponseBlock>,
    /// Model used
    pub model: String,
    /// Stop reason
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token usage
    #[serde(default)]
    pub usage: ClaudeUsage,
}

/// Content block in a response
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeResponseBlock {
    /// Text response
    Text {
        /// The text string
        text: String,
    },
    /// Any block type the gateway does not surface
    #[serde(other)]
    Other,
}

/// Token usage; stream deltas carry only some of the fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaudeUsage {
    /// Input tokens
    #[serde(default)]
    pub input_tokens: Option<u32>,
    /// Output tokens
    #[serde(default)]
    pub output_tokens: Option<u32>,
}

// -- Streaming types --

/// SSE event payloads
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeStreamEvent {
    /// Stream started
    MessageStart {
        /// Partial message with initial usage
        message: ClaudeStreamMessage,
    },
    /// Incremental content within a block
    ContentBlockDelta {
        /// Block index
        index: u32,
        /// Delta content
        delta: ClaudeStreamDelta,
    },
    /// Message metadata delta (stop reason, usage)
    MessageDelta {
        /// Delta with stop reason
        delta: ClaudeMessageDelta,
        /// Updated usage
        #[serde(default)]
        usage: Option<ClaudeUsage>,
    },
    /// Stream completed
    MessageStop,
    /// Vendor-side failure mid-stream
    Error {
        /// Error details
        error: ClaudeErrorDetail,
    },
    /// Block start/stop, ping and future event types
    #[serde(other)]
    Other,
}

/// Partial message in a `message_start` event
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeStreamMessage {
    /// Initial usage
    #[serde(default)]
    pub usage: Option<ClaudeUsage>,
}

/// Delta content in a `content_block_delta` event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeStreamDelta {
    /// Incremental text
    TextDelta {
        /// Text fragment
        text: String,
    },
    /// Deltas the gateway does not surface
    #[serde(other)]
    Other,
}

/// Delta in a `message_delta` event
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeMessageDelta {
    /// Stop reason
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Error detail
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeErrorDetail {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message
    pub message: String,
}
