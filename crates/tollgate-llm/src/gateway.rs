//! Gateway orchestrator
//!
//! Selects the adapter for a request, resolves the vendor credential,
//! dispatches to the sync or streaming path, and records usage for calls
//! made with an internal key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tollgate_config::Config;
use tollgate_core::{CounterSink, Labels, RequestContext, usage};

use crate::error::LlmError;
use crate::provider::claude::ClaudeProvider;
use crate::provider::gemini::GeminiProvider;
use crate::provider::mock::MockProvider;
use crate::provider::openai::OpenAiProvider;
use crate::provider::{Provider, ProviderKind};
use crate::stream::{StreamContext, StreamHandle, spawn_stream};
use crate::types::{ChatRequest, ChatResponse, StreamChunk, StreamMetrics, completion_id, unix_now};

/// A finished sync call
#[derive(Debug)]
pub struct Completion {
    pub response: ChatResponse,
    pub latency: Duration,
}

/// A running stream plus the usage record to write when it ends
#[derive(Debug)]
pub struct CompletionStream {
    handle: StreamHandle,
    usage: Option<UsageRecord>,
}

impl CompletionStream {
    pub async fn next_chunk(&mut self) -> Option<StreamChunk> {
        self.handle.next_chunk().await
    }

    /// Wait for the terminal metrics and record usage
    pub async fn finish(self) -> StreamMetrics {
        let metrics = self.handle.metrics().await;
        if let Some(usage) = &self.usage {
            usage.record(metrics.cost);
        }
        metrics
    }
}

struct UsageRecord {
    sink: Arc<dyn CounterSink>,
    labels: Labels,
}

impl std::fmt::Debug for UsageRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageRecord").field("labels", &self.labels).finish_non_exhaustive()
    }
}

impl UsageRecord {
    fn record(&self, cost: f64) {
        self.sink.increment(usage::LLM_CALLS, &self.labels, 1.0);
        self.sink.increment(usage::LLM_COST, &self.labels, cost);
    }
}

pub struct Gateway {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
    configured_keys: HashMap<ProviderKind, SecretString>,
    internal_key_prefix: String,
    default_provider: ProviderKind,
    usage: Option<Arc<dyn CounterSink>>,
}

impl Gateway {
    /// Gateway without providers; see [`Gateway::from_config`]
    pub fn new(default_provider: ProviderKind, internal_key_prefix: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            configured_keys: HashMap::new(),
            internal_key_prefix: internal_key_prefix.into(),
            default_provider,
            usage: None,
        }
    }

    /// Gateway with every vendor adapter built from configuration
    pub fn from_config(config: &Config, usage: Option<Arc<dyn CounterSink>>) -> anyhow::Result<Self> {
        let default_provider = ProviderKind::parse(&config.gateway.default_provider)?;
        let providers = &config.providers;

        let mut gateway = Self::new(default_provider, config.gateway.internal_key_prefix.clone())
            .with_provider(Arc::new(OpenAiProvider::new(&providers.openai)?))
            .with_provider(Arc::new(ClaudeProvider::new(&providers.claude)?))
            .with_provider(Arc::new(GeminiProvider::new(&providers.gemini)?))
            .with_provider(Arc::new(MockProvider::new(providers.mock.clone())));

        for (kind, vendor) in [
            (ProviderKind::OpenAI, &providers.openai),
            (ProviderKind::Claude, &providers.claude),
            (ProviderKind::Gemini, &providers.gemini),
        ] {
            if let Some(key) = &vendor.api_key {
                gateway = gateway.with_configured_key(kind, key.clone());
            }
        }

        if let Some(sink) = usage {
            gateway = gateway.with_usage_sink(sink);
        }

        Ok(gateway)
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    /// Server-side vendor key used for internal keys without their own
    #[must_use]
    pub fn with_configured_key(mut self, kind: ProviderKind, key: SecretString) -> Self {
        self.configured_keys.insert(kind, key);
        self
    }

    #[must_use]
    pub fn with_usage_sink(mut self, sink: Arc<dyn CounterSink>) -> Self {
        self.usage = Some(sink);
        self
    }

    pub fn internal_key_prefix(&self) -> &str {
        &self.internal_key_prefix
    }

    /// Provider named by the caller, or the default when none is given
    pub fn resolve_provider(&self, name: Option<&str>) -> Result<ProviderKind, LlmError> {
        let kind = name.map_or(Ok(self.default_provider), ProviderKind::parse)?;
        self.provider(kind)?;
        Ok(kind)
    }

    pub(crate) fn provider(&self, kind: ProviderKind) -> Result<&Arc<dyn Provider>, LlmError> {
        self.providers
            .get(&kind)
            .ok_or_else(|| LlmError::UnsupportedProvider(kind.to_string()))
    }

    /// Vendor credential for a call to `kind`
    ///
    /// Raw keys pass through unchanged. Internal keys use the key's own
    /// vendor key, then the server's configured one.
    pub fn credential(&self, kind: ProviderKind, ctx: &RequestContext) -> Result<SecretString, LlmError> {
        let Some(key) = &ctx.api_key else {
            return Err(LlmError::Unauthorized);
        };

        if kind == ProviderKind::Mock {
            return Ok(SecretString::from(String::new()));
        }

        if !ctx.has_internal_key(&self.internal_key_prefix) {
            return Ok(key.clone());
        }

        let details = ctx.key_details.as_ref().ok_or(LlmError::Unauthorized)?;
        details
            .provider_key(&kind.to_string())
            .or_else(|| self.configured_keys.get(&kind))
            .cloned()
            .ok_or(LlmError::MissingCredential { provider: kind })
    }

    pub async fn complete(
        &self,
        kind: ProviderKind,
        request: &ChatRequest,
        ctx: &RequestContext,
    ) -> Result<Completion, LlmError> {
        let provider = self.provider(kind)?;
        let credential = self.credential(kind, ctx)?;
        self.complete_with(provider.as_ref(), &credential, request, ctx).await
    }

    /// Sync call with an already resolved provider and credential
    pub(crate) async fn complete_with(
        &self,
        provider: &dyn Provider,
        credential: &SecretString,
        request: &ChatRequest,
        ctx: &RequestContext,
    ) -> Result<Completion, LlmError> {
        let started = Instant::now();
        let response = provider.complete(request, credential).await?;
        let latency = started.elapsed();

        tracing::debug!(
            provider = %provider.kind(),
            model = %request.model,
            latency_ms = latency.as_millis(),
            cost = response.cost,
            "completion finished"
        );

        if let Some(usage) = self.usage_record(provider.kind(), &request.model, ctx) {
            usage.record(response.cost);
        }

        Ok(Completion { response, latency })
    }

    /// Start a streaming call; `cancel` stops the forwarding task
    pub fn stream(
        &self,
        kind: ProviderKind,
        request: &ChatRequest,
        ctx: &RequestContext,
        cancel: CancellationToken,
    ) -> Result<CompletionStream, LlmError> {
        let provider = self.provider(kind)?;
        let credential = self.credential(kind, ctx)?;

        let stream_ctx = StreamContext {
            id: completion_id(),
            model: request.model.clone(),
            created: unix_now(),
            started: Instant::now(),
            pricing: provider.pricing(),
            prompt_tokens: request.approximate_prompt_tokens(),
        };
        let handle = spawn_stream(provider.open_stream(request, &credential), stream_ctx, cancel);

        Ok(CompletionStream {
            handle,
            usage: self.usage_record(kind, &request.model, ctx),
        })
    }

    fn usage_record(&self, kind: ProviderKind, model: &str, ctx: &RequestContext) -> Option<UsageRecord> {
        let sink = self.usage.as_ref()?;
        let details = ctx.key_details.as_ref()?;

        let mut labels = Labels::new();
        labels.insert("userId", details.user_id.clone());
        labels.insert("projectId", details.project_id.clone());
        labels.insert("llmProvider", kind.to_string());
        labels.insert("llmModel", model.to_owned());
        if let Some(customer) = &ctx.trace_customer_id {
            labels.insert("traceCustomerId", customer.clone());
        }
        if let Some(session) = &ctx.trace_session_id {
            labels.insert("traceSessionId", session.clone());
        }

        Some(UsageRecord {
            sink: Arc::clone(sink),
            labels,
        })
    }
}
