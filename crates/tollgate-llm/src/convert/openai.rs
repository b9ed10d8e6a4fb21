//! Conversion between canonical types and `OpenAI` wire format
//!
//! The gateway's inbound API shares the `OpenAI` request shape, so this
//! module also parses caller requests into [`ChatRequest`].

use crate::error::LlmError;
use crate::image;
use crate::protocol::openai::{
    OpenAiContent, OpenAiContentPart, OpenAiImageUrl, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk,
    OpenAiStreamOptions,
};
use crate::roles;
use crate::stream::VendorEvent;
use crate::types::{ChatRequest, ChatResponse, Choice, ChoiceMessage, ContentPart, FinishReason, Message, Role, Usage};

// -- Inbound: caller request -> canonical --

impl TryFrom<OpenAiRequest> for ChatRequest {
    type Error = LlmError;

    /// Image data URIs are decoded here, so a malformed image fails the
    /// request before any vendor is contacted.
    fn try_from(req: OpenAiRequest) -> Result<Self, Self::Error> {
        let messages = req
            .messages
            .into_iter()
            .map(inbound_message)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            model: req.model,
            messages,
            temperature: req.temperature,
            top_p: req.top_p,
            max_tokens: req.max_tokens,
            stream: req.stream.unwrap_or(false),
        })
    }
}

fn inbound_message(msg: OpenAiMessage) -> Result<Message, LlmError> {
    let content = match msg.content {
        None => Vec::new(),
        Some(OpenAiContent::Text(text)) => vec![ContentPart::Text(text)],
        Some(OpenAiContent::Parts(parts)) => parts
            .into_iter()
            .map(|part| match part {
                OpenAiContentPart::Text { text } => Ok(ContentPart::Text(text)),
                OpenAiContentPart::ImageUrl { image_url } => image::parse_data_uri(&image_url.url).map(ContentPart::Image),
            })
            .collect::<Result<_, _>>()?,
    };

    Ok(Message {
        role: Role::from_inbound(&msg.role),
        content,
    })
}

// -- Outbound: canonical -> OpenAI --

/// Build the vendor request; system messages stay inline
pub fn to_openai_request(req: &ChatRequest, stream: bool) -> OpenAiRequest {
    OpenAiRequest {
        model: req.model.clone(),
        messages: req.messages.iter().map(outbound_message).collect(),
        temperature: req.temperature(),
        top_p: req.top_p(),
        max_tokens: req.max_tokens(),
        stream: stream.then_some(true),
        stream_options: stream.then_some(OpenAiStreamOptions { include_usage: true }),
    }
}

fn outbound_message(msg: &Message) -> OpenAiMessage {
    let content = match msg.content.as_slice() {
        [ContentPart::Text(text)] => OpenAiContent::Text(text.clone()),
        parts => OpenAiContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text(text) => OpenAiContentPart::Text { text: text.clone() },
                    ContentPart::Image(img) => OpenAiContentPart::ImageUrl {
                        image_url: OpenAiImageUrl {
                            url: image::to_data_uri(img),
                            detail: None,
                        },
                    },
                })
                .collect(),
        ),
    };

    OpenAiMessage {
        role: roles::OPENAI.to_vendor(msg.role).to_owned(),
        content: Some(content),
    }
}

// -- Response --

pub fn openai_finish_reason(reason: &str) -> Option<FinishReason> {
    match reason {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

impl From<OpenAiResponse> for ChatResponse {
    fn from(resp: OpenAiResponse) -> Self {
        let choices = resp
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                message: ChoiceMessage {
                    role: roles::OPENAI.from_vendor(&choice.message.role),
                    content: choice.message.content.unwrap_or_default(),
                },
                finish_reason: choice.finish_reason.as_deref().and_then(openai_finish_reason),
            })
            .collect();

        let usage = resp
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        super::chat_response(Some(resp.id), resp.model, choices, usage)
    }
}

// -- Streaming --

/// Events carried by one `OpenAI` stream chunk
pub fn openai_stream_events(chunk: OpenAiStreamChunk) -> Vec<VendorEvent> {
    let mut events = Vec::new();

    for choice in chunk.choices {
        if let Some(text) = choice.delta.content {
            events.push(VendorEvent::Text {
                index: choice.index,
                text,
            });
        }
        if let Some(reason) = choice.finish_reason.as_deref().and_then(openai_finish_reason) {
            events.push(VendorEvent::Finish {
                index: choice.index,
                reason,
            });
        }
    }

    if let Some(usage) = chunk.usage {
        events.push(VendorEvent::Usage {
            prompt_tokens: Some(usage.prompt_tokens),
            completion_tokens: Some(usage.completion_tokens),
        });
    }

    events
}
