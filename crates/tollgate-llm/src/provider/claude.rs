//! Anthropic Messages API adapter

use async_trait::async_trait;
use futures_util::FutureExt;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use tollgate_config::VendorConfig;
use url::Url;

use super::{Provider, ProviderKind};
use crate::convert::claude::{claude_stream_events, to_claude_request};
use crate::error::LlmError;
use crate::pricing::{self, PricingTable};
use crate::protocol::claude::ClaudeResponse;
use crate::stream::PendingStream;
use crate::types::{ChatRequest, ChatResponse};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value
const API_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    client: Client,
    base_url: Url,
}

impl ClaudeProvider {
    pub fn new(config: &VendorConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: super::http_client(config)?,
            base_url: super::base_url(config, DEFAULT_BASE_URL)?,
        })
    }

    fn request(&self, request: &ChatRequest, credential: &SecretString, stream: bool) -> RequestBuilder {
        self.client
            .post(super::endpoint(&self.base_url, "messages"))
            .header("x-api-key", credential.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&to_claude_request(request, stream))
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn pricing(&self) -> &'static PricingTable {
        &pricing::CLAUDE
    }

    async fn complete(&self, request: &ChatRequest, credential: &SecretString) -> Result<ChatResponse, LlmError> {
        let response = super::send(self.request(request, credential, false), self.kind())
            .await
            .map_err(LlmError::Upstream)?;
        let wire: ClaudeResponse = super::parse_body(response).await?;

        Ok(super::priced(wire.into(), self.pricing()))
    }

    fn open_stream(&self, request: &ChatRequest, credential: &SecretString) -> PendingStream {
        let builder = self.request(request, credential, true);

        async move {
            let response = super::send(builder, ProviderKind::Claude)
                .await
                .map_err(LlmError::StreamSetup)?;
            Ok(super::sse_events(response, claude_stream_events))
        }
        .boxed()
    }
}
