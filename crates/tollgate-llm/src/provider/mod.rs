//! Provider trait and vendor adapters

pub mod claude;
pub mod gemini;
pub mod mock;
pub mod openai;

use std::str::FromStr;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{Display, EnumString};
use tollgate_config::VendorConfig;
use url::Url;

use crate::error::LlmError;
use crate::pricing::PricingTable;
use crate::stream::{PendingStream, VendorEvent, VendorEventStream};
use crate::types::{ChatRequest, ChatResponse};

/// Supported vendors
///
/// Names parse case-insensitively and display in their canonical casing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, SerializeDisplay, DeserializeFromStr,
)]
#[strum(ascii_case_insensitive)]
pub enum ProviderKind {
    OpenAI,
    Gemini,
    Claude,
    Mock,
}

impl ProviderKind {
    /// Parse a caller-supplied provider name
    pub fn parse(name: &str) -> Result<Self, LlmError> {
        Self::from_str(name.trim()).map_err(|_| LlmError::UnsupportedProvider(name.to_owned()))
    }
}

/// A vendor adapter
///
/// Adapters are stateless per call. The credential is resolved by the
/// gateway; adapters only attach it the way their vendor expects.
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Price table used for this vendor's models
    fn pricing(&self) -> &'static PricingTable;

    /// Single request, single normalized response with cost
    async fn complete(&self, request: &ChatRequest, credential: &SecretString) -> Result<ChatResponse, LlmError>;

    /// Prepare a streaming call; nothing is sent until the future is polled
    ///
    /// Failures to establish the stream resolve to [`LlmError::StreamSetup`].
    fn open_stream(&self, request: &ChatRequest, credential: &SecretString) -> PendingStream;
}

/// HTTP client honoring the vendor's configured timeout
fn http_client(config: &VendorConfig) -> Result<Client, LlmError> {
    let mut builder = Client::builder();
    if let Some(timeout) = &config.timeout {
        builder = builder.timeout(tollgate_config::parse_duration("timeout", timeout)?);
    }
    builder
        .build()
        .map_err(|e| LlmError::Internal(anyhow::anyhow!("failed to build HTTP client: {e}")))
}

fn base_url(config: &VendorConfig, default: &str) -> Result<Url, LlmError> {
    match &config.base_url {
        Some(url) => Ok(url.clone()),
        None => Url::parse(default).map_err(|e| LlmError::Internal(e.into())),
    }
}

fn endpoint(base: &Url, path: &str) -> String {
    format!("{}/{path}", base.as_str().trim_end_matches('/'))
}

/// Send a vendor request, turning transport failures and non-2xx replies
/// into a message
async fn send(builder: RequestBuilder, provider: ProviderKind) -> Result<Response, String> {
    let response = builder.send().await.map_err(|e| {
        tracing::error!(%provider, error = %e, "upstream request failed");
        e.to_string()
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%provider, %status, "upstream returned error");
        return Err(format!("provider returned {status}: {body}"));
    }

    Ok(response)
}

async fn parse_body<T: DeserializeOwned>(response: Response) -> Result<T, LlmError> {
    response
        .json()
        .await
        .map_err(|e| LlmError::Upstream(format!("failed to parse response: {e}")))
}

/// Attach cost from the vendor-reported usage
fn priced(mut response: ChatResponse, pricing: &PricingTable) -> ChatResponse {
    response.cost = pricing.cost(
        &response.model,
        response.usage.prompt_tokens,
        response.usage.completion_tokens,
    );
    response
}

/// Decode an SSE body into vendor events, one JSON payload per SSE event
fn sse_events<T, F>(response: Response, map: F) -> VendorEventStream
where
    T: DeserializeOwned,
    F: Fn(T) -> Result<Vec<VendorEvent>, LlmError> + Send + 'static,
{
    response
        .bytes_stream()
        .eventsource()
        .map(move |event| {
            let event = match event {
                Ok(event) => event,
                Err(e) => return vec![Err(LlmError::Upstream(format!("stream error: {e}")))],
            };

            let data = event.data.trim();
            if data.is_empty() || data == "[DONE]" {
                return Vec::new();
            }

            match serde_json::from_str::<T>(data)
                .map_err(|e| LlmError::Upstream(format!("failed to parse stream event: {e}")))
                .and_then(&map)
            {
                Ok(events) => events.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            }
        })
        .flat_map(futures_util::stream::iter)
        .boxed()
}
