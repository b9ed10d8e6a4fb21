//! `OpenAI` chat completions adapter

use async_trait::async_trait;
use futures_util::FutureExt;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use tollgate_config::VendorConfig;
use url::Url;

use super::{Provider, ProviderKind};
use crate::convert::openai::{openai_stream_events, to_openai_request};
use crate::error::LlmError;
use crate::pricing::{self, PricingTable};
use crate::protocol::openai::{OpenAiResponse, OpenAiStreamChunk};
use crate::stream::PendingStream;
use crate::types::{ChatRequest, ChatResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: Client,
    base_url: Url,
}

impl OpenAiProvider {
    pub fn new(config: &VendorConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: super::http_client(config)?,
            base_url: super::base_url(config, DEFAULT_BASE_URL)?,
        })
    }

    fn request(&self, request: &ChatRequest, credential: &SecretString, stream: bool) -> RequestBuilder {
        self.client
            .post(super::endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(credential.expose_secret())
            .json(&to_openai_request(request, stream))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    fn pricing(&self) -> &'static PricingTable {
        &pricing::OPENAI
    }

    async fn complete(&self, request: &ChatRequest, credential: &SecretString) -> Result<ChatResponse, LlmError> {
        let response = super::send(self.request(request, credential, false), self.kind())
            .await
            .map_err(LlmError::Upstream)?;
        let wire: OpenAiResponse = super::parse_body(response).await?;

        Ok(super::priced(wire.into(), self.pricing()))
    }

    fn open_stream(&self, request: &ChatRequest, credential: &SecretString) -> PendingStream {
        let builder = self.request(request, credential, true);

        async move {
            let response = super::send(builder, ProviderKind::OpenAI)
                .await
                .map_err(LlmError::StreamSetup)?;
            Ok(super::sse_events(response, |chunk: OpenAiStreamChunk| {
                Ok(openai_stream_events(chunk))
            }))
        }
        .boxed()
    }
}
