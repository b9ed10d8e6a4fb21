//! In-process mock vendor
//!
//! Returns canned content with injected faults at configured rates. Never
//! touches the network and needs no credential.

use async_trait::async_trait;
use futures_util::{FutureExt, StreamExt, stream};
use rand::Rng;
use secrecy::SecretString;
use tollgate_config::MockConfig;

use super::{Provider, ProviderKind};
use crate::error::LlmError;
use crate::pricing::{self, PricingTable};
use crate::roles;
use crate::stream::{PendingStream, VendorEvent, VendorEventStream, fragment_words};
use crate::types::{
    ChatRequest, ChatResponse, Choice, ChoiceMessage, FinishReason, Usage, approximate_tokens, completion_id, unix_now,
};

const RESPONSES: [&str; 5] = [
    "This is a mock completion response.",
    "Here is another example of a response.",
    "Mock response with different content.",
    "Simulated output for testing purposes.",
    "Generated response for mock client.",
];

const FAILURE_MESSAGE: &str = "mock failure: service unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Fail,
    Empty,
    Complete(&'static str, FinishReason),
}

pub struct MockProvider {
    config: MockConfig,
}

impl MockProvider {
    pub const fn new(config: MockConfig) -> Self {
        Self { config }
    }

    fn roll(&self) -> Outcome {
        let mut rng = rand::rng();

        if rng.random::<f64>() < self.config.failure_rate {
            return Outcome::Fail;
        }
        if rng.random::<f64>() < self.config.empty_choices_rate {
            return Outcome::Empty;
        }

        let content = RESPONSES[rng.random_range(0..RESPONSES.len())];
        let finish = if rng.random::<f64>() < self.config.error_finish_rate {
            FinishReason::Error
        } else {
            FinishReason::Stop
        };
        Outcome::Complete(content, finish)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    fn pricing(&self) -> &'static PricingTable {
        &pricing::MOCK
    }

    async fn complete(&self, request: &ChatRequest, _credential: &SecretString) -> Result<ChatResponse, LlmError> {
        let choices = match self.roll() {
            Outcome::Fail => {
                tracing::warn!(provider = %self.kind(), "injected upstream failure");
                return Err(LlmError::Upstream(FAILURE_MESSAGE.to_owned()));
            }
            Outcome::Empty => Vec::new(),
            Outcome::Complete(content, finish) => vec![Choice {
                index: 0,
                message: ChoiceMessage {
                    role: roles::MOCK.from_vendor("assistant"),
                    content: content.to_owned(),
                },
                finish_reason: Some(finish),
            }],
        };

        let completion_tokens = choices
            .iter()
            .map(|choice| approximate_tokens(&choice.message.content))
            .sum();

        Ok(ChatResponse {
            id: completion_id(),
            object: "chat.completion".to_owned(),
            created: unix_now(),
            model: request.model.clone(),
            choices,
            usage: Usage::new(request.approximate_prompt_tokens(), completion_tokens),
            cost: 0.0,
        })
    }

    fn open_stream(&self, request: &ChatRequest, _credential: &SecretString) -> PendingStream {
        let outcome = self.roll();
        let prompt_tokens = request.approximate_prompt_tokens();

        async move {
            let events: Vec<VendorEvent> = match outcome {
                Outcome::Fail => return Err(LlmError::StreamSetup(FAILURE_MESSAGE.to_owned())),
                Outcome::Empty => Vec::new(),
                Outcome::Complete(content, finish) => fragment_words(content)
                    .into_iter()
                    .map(|word| VendorEvent::Text {
                        index: 0,
                        text: word.to_owned(),
                    })
                    .chain([
                        VendorEvent::Finish {
                            index: 0,
                            reason: finish,
                        },
                        VendorEvent::Usage {
                            prompt_tokens: Some(prompt_tokens),
                            completion_tokens: Some(approximate_tokens(content)),
                        },
                    ])
                    .collect(),
            };

            let stream: VendorEventStream = stream::iter(events.into_iter().map(Ok)).boxed();
            Ok(stream)
        }
        .boxed()
    }
}
