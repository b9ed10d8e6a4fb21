use std::time::Duration;

use serde::Serialize;
use serde_with::{DurationNanoSeconds, serde_as};

use super::message::Role;
use super::response::FinishReason;

/// One normalized fragment of a streamed completion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamChunk {
    /// Completion identifier, shared by every chunk of a stream
    pub id: String,
    /// Always `chat.completion.chunk`
    pub object: &'static str,
    /// Unix timestamp of the stream start
    pub created: u64,
    /// Model being streamed
    pub model: String,
    /// Exactly one choice delta
    pub choices: Vec<ChunkChoice>,
}

/// Delta for one choice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkChoice {
    /// Choice index
    pub index: u32,
    /// Incremental content
    pub delta: ChunkDelta,
    /// Set on the terminal chunk of a choice
    pub finish_reason: Option<FinishReason>,
}

/// Incremental content
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkDelta {
    /// Present only on the first chunk of a choice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Text fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl StreamChunk {
    /// Text fragment carried by this chunk
    pub fn text(&self) -> Option<&str> {
        self.choices.first().and_then(|choice| choice.delta.content.as_deref())
    }
}

/// Terminal record of a stream, sent once after the last chunk
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetrics {
    /// Wall-clock time from request to stream end, in nanoseconds on the wire
    #[serde_as(as = "DurationNanoSeconds<u64>")]
    pub latency: Duration,
    /// Prompt tokens (vendor-reported when available, else approximated)
    pub total_input_tokens: u32,
    /// Completion tokens (vendor-reported when available, else approximated)
    pub total_output_tokens: u32,
    /// Cost in USD
    pub cost: f64,
    /// Why the stream ended early, if it did
    pub error: Option<String>,
}
