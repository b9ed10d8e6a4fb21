//! Google Generative Language API wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// `generateContent` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Conversation contents
    pub contents: Vec<GeminiContent>,
    /// System instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    /// Generation configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

/// Content object containing role and parts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Role ("user" or "model")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// Individual part within a content object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeminiPart {
    /// Text content
    Text(String),
    /// Inline data (e.g. images)
    InlineData(GeminiInlineData),
}

/// Inline binary data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    /// MIME type (e.g. "image/png")
    pub mime_type: String,
    /// Base64-encoded data
    pub data: String,
}

/// Generation configuration parameters
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum output tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

// -- Response types --

/// `generateContent` response; streaming sends one per SSE event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    /// Token usage metadata
    #[serde(default)]
    pub usage_metadata: Option<GeminiUsageMetadata>,
}

/// Generated candidate
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// Generated content (absent when blocked)
    #[serde(default)]
    pub content: GeminiContent,
    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Candidate index
    #[serde(default)]
    pub index: Option<u32>,
}

impl GeminiCandidate {
    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.content
            .parts
            .iter()
            .filter_map(|part| match part {
                GeminiPart::Text(text) => Some(text.as_str()),
                GeminiPart::InlineData(_) => None,
            })
            .collect()
    }
}

/// Token usage metadata
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    /// Prompt token count
    #[serde(default)]
    pub prompt_token_count: Option<u32>,
    /// Candidates token count
    #[serde(default)]
    pub candidates_token_count: Option<u32>,
}
