//! Google Generative Language adapter
//!
//! The API key travels as the `key` query parameter. Streaming uses
//! `streamGenerateContent` with `alt=sse`; each event carries a whole
//! response object whose text is split into word fragments.

use async_trait::async_trait;
use futures_util::FutureExt;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use tollgate_config::VendorConfig;
use url::Url;

use super::{Provider, ProviderKind};
use crate::convert::gemini::{from_gemini_response, gemini_stream_events, to_gemini_request};
use crate::error::LlmError;
use crate::pricing::{self, PricingTable};
use crate::protocol::gemini::GeminiResponse;
use crate::stream::PendingStream;
use crate::types::{ChatRequest, ChatResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: Client,
    base_url: Url,
}

impl GeminiProvider {
    pub fn new(config: &VendorConfig) -> Result<Self, LlmError> {
        let base_url = super::base_url(config, DEFAULT_BASE_URL)?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow::anyhow!("gemini base url cannot carry a path: {base_url}").into());
        }

        Ok(Self {
            client: super::http_client(config)?,
            base_url,
        })
    }

    /// `models/{model}:{method}` below the base URL, with the model escaped
    /// as a single path segment
    fn model_url(&self, model: &str, method: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("models").push(&format!("{model}:{method}"));
        }
        url
    }

    fn request(&self, request: &ChatRequest, credential: &SecretString, stream: bool) -> RequestBuilder {
        let method = if stream { "streamGenerateContent" } else { "generateContent" };
        let url = self.model_url(&request.model, method);

        let mut builder = self
            .client
            .post(url)
            .query(&[("key", credential.expose_secret())]);
        if stream {
            builder = builder.query(&[("alt", "sse")]);
        }
        builder.json(&to_gemini_request(request))
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn pricing(&self) -> &'static PricingTable {
        &pricing::GEMINI
    }

    async fn complete(&self, request: &ChatRequest, credential: &SecretString) -> Result<ChatResponse, LlmError> {
        let response = super::send(self.request(request, credential, false), self.kind())
            .await
            .map_err(LlmError::Upstream)?;
        let wire: GeminiResponse = super::parse_body(response).await?;

        Ok(super::priced(from_gemini_response(wire, &request.model), self.pricing()))
    }

    fn open_stream(&self, request: &ChatRequest, credential: &SecretString) -> PendingStream {
        let builder = self.request(request, credential, true);

        async move {
            let response = super::send(builder, ProviderKind::Gemini)
                .await
                .map_err(LlmError::StreamSetup)?;
            Ok(super::sse_events(response, |resp: GeminiResponse| {
                Ok(gemini_stream_events(&resp))
            }))
        }
        .boxed()
    }
}
