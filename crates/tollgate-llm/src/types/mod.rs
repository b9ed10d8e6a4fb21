//! Provider-agnostic request, response and stream types
//!
//! Every vendor adapter converts to and from these shapes. Responses and
//! stream chunks serialize to the `OpenAI` chat-completion JSON that the
//! gateway returns to callers.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;

use std::time::{SystemTime, UNIX_EPOCH};

pub use message::{ContentPart, ImageData, Message, Role};
pub use request::ChatRequest;
pub use response::{ChatResponse, Choice, ChoiceMessage, FinishReason, Usage};
pub use stream::{ChunkChoice, ChunkDelta, StreamChunk, StreamMetrics};

/// Seconds since the Unix epoch
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Fresh completion identifier
pub(crate) fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// Whitespace-delimited word count, used as a token estimate when a vendor
/// reports no usage
pub fn approximate_tokens(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}
