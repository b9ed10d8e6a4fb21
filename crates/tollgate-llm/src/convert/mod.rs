//! Conversion between canonical types and vendor wire formats
//!
//! Each submodule owns one vendor: request building, response
//! normalization, finish-reason mapping, and stream event extraction.

pub mod claude;
pub mod gemini;
pub mod openai;

use crate::types::{ChatResponse, Choice, Usage, completion_id, unix_now};

/// Assemble a canonical response; cost is filled in by the provider
fn chat_response(id: Option<String>, model: String, choices: Vec<Choice>, usage: Usage) -> ChatResponse {
    ChatResponse {
        id: id.filter(|id| !id.is_empty()).unwrap_or_else(completion_id),
        object: "chat.completion".to_owned(),
        created: unix_now(),
        model,
        choices,
        usage,
        cost: 0.0,
    }
}
