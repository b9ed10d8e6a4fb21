//! Conversion between canonical types and the Anthropic Messages format

use crate::error::LlmError;
use crate::image;
use crate::protocol::claude::{
    ClaudeContentBlock, ClaudeImageSource, ClaudeMessage, ClaudeRequest, ClaudeResponse, ClaudeResponseBlock,
    ClaudeStreamDelta, ClaudeStreamEvent, ClaudeUsage,
};
use crate::roles;
use crate::stream::VendorEvent;
use crate::types::{ChatRequest, ChatResponse, Choice, ChoiceMessage, ContentPart, FinishReason, Role, Usage};

/// The API rejects requests without `max_tokens`
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Build the vendor request
///
/// The first system message moves to the top-level `system` field. Later
/// system messages become user turns, and consecutive turns with the same
/// vendor role are merged because the API requires alternation.
pub fn to_claude_request(req: &ChatRequest, stream: bool) -> ClaudeRequest {
    let mut system = None;
    let mut messages: Vec<ClaudeMessage> = Vec::new();

    for msg in &req.messages {
        if msg.role == Role::System && system.is_none() {
            system = Some(msg.text_content());
            continue;
        }

        let role = roles::CLAUDE.to_vendor(msg.role);
        let blocks = msg.content.iter().map(content_block);

        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(ClaudeMessage {
                role,
                content: blocks.collect(),
            }),
        }
    }

    ClaudeRequest {
        model: req.model.clone(),
        max_tokens: req.max_tokens().unwrap_or(DEFAULT_MAX_TOKENS),
        system,
        messages,
        temperature: req.temperature(),
        top_p: req.top_p(),
        stream: stream.then_some(true),
    }
}

fn content_block(part: &ContentPart) -> ClaudeContentBlock {
    match part {
        ContentPart::Text(text) => ClaudeContentBlock::Text { text: text.clone() },
        ContentPart::Image(img) => ClaudeContentBlock::Image {
            source: ClaudeImageSource {
                source_type: "base64",
                media_type: img.mime_type.clone(),
                data: image::to_base64(img),
            },
        },
    }
}

pub fn claude_finish_reason(reason: &str) -> Option<FinishReason> {
    match reason {
        "end_turn" | "stop_sequence" => Some(FinishReason::Stop),
        "max_tokens" => Some(FinishReason::Length),
        "refusal" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

impl From<ClaudeResponse> for ChatResponse {
    fn from(resp: ClaudeResponse) -> Self {
        let text = resp
            .content
            .iter()
            .filter_map(|block| match block {
                ClaudeResponseBlock::Text { text } => Some(text.as_str()),
                ClaudeResponseBlock::Other => None,
            })
            .collect::<String>();

        let choice = Choice {
            index: 0,
            message: ChoiceMessage {
                role: roles::CLAUDE.from_vendor(&resp.role),
                content: text,
            },
            finish_reason: resp.stop_reason.as_deref().and_then(claude_finish_reason),
        };

        let usage = Usage::new(
            resp.usage.input_tokens.unwrap_or(0),
            resp.usage.output_tokens.unwrap_or(0),
        );

        super::chat_response(Some(resp.id), resp.model, vec![choice], usage)
    }
}

/// Events carried by one Messages stream event
///
/// The API streams a single choice; content block indices are not choice
/// indices, so every fragment belongs to choice 0.
pub fn claude_stream_events(event: ClaudeStreamEvent) -> Result<Vec<VendorEvent>, LlmError> {
    let events = match event {
        ClaudeStreamEvent::MessageStart { message } => message.usage.map(usage_event).into_iter().collect(),
        ClaudeStreamEvent::ContentBlockDelta {
            delta: ClaudeStreamDelta::TextDelta { text },
            ..
        } => vec![VendorEvent::Text { index: 0, text }],
        ClaudeStreamEvent::MessageDelta { delta, usage } => delta
            .stop_reason
            .as_deref()
            .and_then(claude_finish_reason)
            .map(|reason| VendorEvent::Finish { index: 0, reason })
            .into_iter()
            .chain(usage.map(usage_event))
            .collect(),
        ClaudeStreamEvent::Error { error } => {
            return Err(LlmError::Upstream(format!("{}: {}", error.error_type, error.message)));
        }
        ClaudeStreamEvent::ContentBlockDelta { .. } | ClaudeStreamEvent::MessageStop | ClaudeStreamEvent::Other => {
            Vec::new()
        }
    };

    Ok(events)
}

const fn usage_event(usage: ClaudeUsage) -> VendorEvent {
    VendorEvent::Usage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;
    use serde_json::json;

    use super::*;
    use crate::types::{ImageData, Message};

    #[test]
    fn hoists_first_system_message_and_merges_turns() {
        let request = ChatRequest {
            model: "claude-3-5-sonnet-latest".to_owned(),
            messages: vec![
                Message::text(Role::User, "first"),
                Message::text(Role::System, "You are terse."),
                Message::text(Role::System, "Answer in French."),
                Message::text(Role::Assistant, "D'accord."),
                Message {
                    role: Role::User,
                    content: vec![ContentPart::Image(ImageData {
                        mime_type: "image/png".to_owned(),
                        data: b"hello".to_vec(),
                    })],
                },
            ],
            top_p: Some(0.9),
            ..ChatRequest::default()
        };

        assert_json_snapshot!(to_claude_request(&request, false), @r###"
        {
          "model": "claude-3-5-sonnet-latest",
          "max_tokens": 4096,
          "system": "You are terse.",
          "messages": [
            {
              "role": "user",
              "content": [
                {
                  "type": "text",
                  "text": "first"
                },
                {
                  "type": "text",
                  "text": "Answer in French."
                }
              ]
            },
            {
              "role": "assistant",
              "content": [
                {
                  "type": "text",
                  "text": "D'accord."
                }
              ]
            },
            {
              "role": "user",
              "content": [
                {
                  "type": "image",
                  "source": {
                    "type": "base64",
                    "media_type": "image/png",
                    "data": "aGVsbG8="
                  }
                }
              ]
            }
          ],
          "top_p": 0.9
        }
        "###);
    }

    #[test]
    fn response_joins_text_blocks() {
        let wire: ClaudeResponse = serde_json::from_value(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-opus-20240229",
            "content": [
                {"type": "text", "text": "Hello"},
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": " there"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 20}
        }))
        .unwrap();

        let response = ChatResponse::from(wire);
        assert_eq!(response.first_text(), "Hello there");
        assert_eq!(response.choices[0].message.role, Role::Assistant);
        assert_eq!(response.choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage, Usage::new(10, 20));
    }

    #[test]
    fn finish_reasons_are_total() {
        assert_eq!(claude_finish_reason("stop_sequence"), Some(FinishReason::Stop));
        assert_eq!(claude_finish_reason("max_tokens"), Some(FinishReason::Length));
        assert_eq!(claude_finish_reason("refusal"), Some(FinishReason::ContentFilter));
        assert_eq!(claude_finish_reason("tool_use"), None);
        assert_eq!(claude_finish_reason(""), None);
    }

    #[test]
    fn stream_events_map_to_choice_zero() {
        let parse = |value| claude_stream_events(serde_json::from_value(value).unwrap()).unwrap();

        assert_eq!(
            parse(json!({"type": "message_start", "message": {"usage": {"input_tokens": 12, "output_tokens": 1}}})),
            vec![VendorEvent::Usage {
                prompt_tokens: Some(12),
                completion_tokens: Some(1)
            }]
        );
        assert_eq!(
            parse(json!({"type": "content_block_delta", "index": 2, "delta": {"type": "text_delta", "text": "Hi"}})),
            vec![VendorEvent::Text {
                index: 0,
                text: "Hi".to_owned()
            }]
        );
        assert_eq!(
            parse(json!({"type": "message_delta", "delta": {"stop_reason": "max_tokens"}, "usage": {"output_tokens": 7}})),
            vec![
                VendorEvent::Finish {
                    index: 0,
                    reason: FinishReason::Length
                },
                VendorEvent::Usage {
                    prompt_tokens: None,
                    completion_tokens: Some(7)
                },
            ]
        );
        assert!(parse(json!({"type": "ping"})).is_empty());
    }

    #[test]
    fn stream_error_event_is_upstream_error() {
        let event = serde_json::from_value(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        }))
        .unwrap();

        let err = claude_stream_events(event).unwrap_err();
        assert!(matches!(err, LlmError::Upstream(msg) if msg == "overloaded_error: Overloaded"));
    }
}
