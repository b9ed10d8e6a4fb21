//! Conversion between canonical types and Google Generative Language format

use crate::image;
use crate::protocol::gemini::{
    GeminiCandidate, GeminiContent, GeminiGenerationConfig, GeminiInlineData, GeminiPart, GeminiRequest,
    GeminiResponse, GeminiUsageMetadata,
};
use crate::roles;
use crate::stream::{VendorEvent, fragment_words};
use crate::types::{ChatRequest, ChatResponse, Choice, ChoiceMessage, ContentPart, FinishReason, Role, Usage};

/// Build the vendor request
///
/// The first system message becomes `systemInstruction`; later ones are
/// sent as user turns. Every other message keeps its own turn.
pub fn to_gemini_request(req: &ChatRequest) -> GeminiRequest {
    let mut system_instruction = None;
    let mut contents = Vec::with_capacity(req.messages.len());

    for msg in &req.messages {
        if msg.role == Role::System && system_instruction.is_none() {
            system_instruction = Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text(msg.text_content())],
            });
            continue;
        }

        contents.push(GeminiContent {
            role: Some(roles::GEMINI.to_vendor(msg.role).to_owned()),
            parts: msg.content.iter().map(part).collect(),
        });
    }

    let generation_config = GeminiGenerationConfig {
        temperature: req.temperature(),
        top_p: req.top_p(),
        max_output_tokens: req.max_tokens(),
    };
    let has_config = generation_config.temperature.is_some()
        || generation_config.top_p.is_some()
        || generation_config.max_output_tokens.is_some();

    GeminiRequest {
        contents,
        system_instruction,
        generation_config: has_config.then_some(generation_config),
    }
}

fn part(part: &ContentPart) -> GeminiPart {
    match part {
        ContentPart::Text(text) => GeminiPart::Text(text.clone()),
        ContentPart::Image(img) => GeminiPart::InlineData(GeminiInlineData {
            mime_type: img.mime_type.clone(),
            data: image::to_base64(img),
        }),
    }
}

pub fn gemini_finish_reason(reason: &str) -> Option<FinishReason> {
    match reason {
        "STOP" => Some(FinishReason::Stop),
        "MAX_TOKENS" => Some(FinishReason::Length),
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => Some(FinishReason::ContentFilter),
        "OTHER" => Some(FinishReason::Error),
        _ => None,
    }
}

fn candidate_index(candidate: &GeminiCandidate, position: usize) -> u32 {
    candidate
        .index
        .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX))
}

fn usage(metadata: Option<&GeminiUsageMetadata>) -> Usage {
    metadata.map_or_else(Usage::default, |m| {
        Usage::new(
            m.prompt_token_count.unwrap_or(0),
            m.candidates_token_count.unwrap_or(0),
        )
    })
}

/// Normalize a response; the API does not echo the model, so the caller's
/// model is used
pub fn from_gemini_response(resp: GeminiResponse, model: &str) -> ChatResponse {
    let choices = resp
        .candidates
        .iter()
        .enumerate()
        .map(|(position, candidate)| Choice {
            index: candidate_index(candidate, position),
            message: ChoiceMessage {
                role: candidate
                    .content
                    .role
                    .as_deref()
                    .map_or(Role::Assistant, |role| roles::GEMINI.from_vendor(role)),
                content: candidate.text(),
            },
            finish_reason: candidate.finish_reason.as_deref().and_then(gemini_finish_reason),
        })
        .collect();

    super::chat_response(None, model.to_owned(), choices, usage(resp.usage_metadata.as_ref()))
}

/// Events carried by one streamed response
///
/// Each candidate's text is split into word fragments so callers receive
/// one fragment per chunk regardless of how much text the vendor batched.
pub fn gemini_stream_events(resp: &GeminiResponse) -> Vec<VendorEvent> {
    let mut events = Vec::new();

    for (position, candidate) in resp.candidates.iter().enumerate() {
        let index = candidate_index(candidate, position);
        let text = candidate.text();

        events.extend(fragment_words(&text).into_iter().map(|fragment| VendorEvent::Text {
            index,
            text: fragment.to_owned(),
        }));

        if let Some(reason) = candidate.finish_reason.as_deref().and_then(gemini_finish_reason) {
            events.push(VendorEvent::Finish { index, reason });
        }
    }

    if let Some(metadata) = &resp.usage_metadata {
        events.push(VendorEvent::Usage {
            prompt_tokens: metadata.prompt_token_count,
            completion_tokens: metadata.candidates_token_count,
        });
    }

    events
}
