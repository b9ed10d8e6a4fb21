//! Streaming normalizer
//!
//! Adapters turn a vendor stream into [`VendorEvent`]s. [`spawn_stream`]
//! runs a forwarding task that converts those events into canonical
//! [`StreamChunk`]s on one channel and finishes with exactly one
//! [`StreamMetrics`] on another. Both channels are closed by the task.

use std::collections::{BTreeMap, HashSet};

use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::pricing::PricingTable;
use crate::types::{ChunkChoice, ChunkDelta, FinishReason, Role, StreamChunk, StreamMetrics, approximate_tokens};

/// Chunks buffered between the forwarding task and the consumer
const CHUNK_BUFFER: usize = 32;

/// One vendor-agnostic stream event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorEvent {
    /// Text fragment for a choice
    Text { index: u32, text: String },
    /// Terminal reason for a choice
    Finish { index: u32, reason: FinishReason },
    /// Vendor-reported usage; absent fields leave earlier values untouched
    Usage {
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
}

pub type VendorEventStream = BoxStream<'static, Result<VendorEvent, LlmError>>;

/// A vendor stream that has not been opened yet
pub type PendingStream = BoxFuture<'static, Result<VendorEventStream, LlmError>>;

/// Fixed attributes of one stream
#[derive(Debug, Clone)]
pub struct StreamContext {
    pub id: String,
    pub model: String,
    pub created: u64,
    pub started: Instant,
    pub pricing: &'static PricingTable,
    /// Prompt size estimate, used when the vendor reports no usage
    pub prompt_tokens: u32,
}

/// Consumer side of a normalized stream
#[derive(Debug)]
pub struct StreamHandle {
    chunks: mpsc::Receiver<StreamChunk>,
    metrics: oneshot::Receiver<StreamMetrics>,
}

impl StreamHandle {
    /// Next chunk, or `None` once the stream has ended
    pub async fn next_chunk(&mut self) -> Option<StreamChunk> {
        self.chunks.recv().await
    }

    /// Terminal metrics; waits for the forwarding task to finish
    pub async fn metrics(self) -> StreamMetrics {
        drop(self.chunks);
        self.metrics.await.unwrap_or_else(|_| StreamMetrics {
            error: Some("stream ended without metrics".to_owned()),
            ..StreamMetrics::default()
        })
    }
}

/// Open `pending` on a background task and forward its events
///
/// If opening fails, no chunk is sent and the metrics carry the error.
/// Mid-stream failures truncate the chunks and are reported the same way.
/// Cancelling `cancel` or dropping the handle stops the task at its next
/// suspension point.
pub fn spawn_stream(pending: PendingStream, ctx: StreamContext, cancel: CancellationToken) -> StreamHandle {
    let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_BUFFER);
    let (metrics_tx, metrics_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut forwarder = Forwarder::new(ctx, chunk_tx);
        let result = forwarder.run(pending, &cancel).await;

        if let Err(e) = &result {
            tracing::warn!(model = %forwarder.ctx.model, error = %e, "stream ended with error");
        }

        let metrics = forwarder.metrics(result.err());
        // the consumer may already be gone
        let _ = metrics_tx.send(metrics);
    });

    StreamHandle {
        chunks: chunk_rx,
        metrics: metrics_rx,
    }
}

struct Forwarder {
    ctx: StreamContext,
    tx: mpsc::Sender<StreamChunk>,
    started_choices: HashSet<u32>,
    text: BTreeMap<u32, String>,
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

impl Forwarder {
    fn new(ctx: StreamContext, tx: mpsc::Sender<StreamChunk>) -> Self {
        Self {
            ctx,
            tx,
            started_choices: HashSet::new(),
            text: BTreeMap::new(),
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    async fn run(&mut self, pending: PendingStream, cancel: &CancellationToken) -> Result<(), LlmError> {
        let mut events = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LlmError::Cancelled),
            opened = pending => opened?,
        };

        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(LlmError::Cancelled),
                event = events.next() => event,
            };

            match event {
                None => return Ok(()),
                Some(Ok(event)) => self.forward(event, cancel).await?,
                Some(Err(e)) => return Err(e),
            }
        }
    }

    async fn forward(&mut self, event: VendorEvent, cancel: &CancellationToken) -> Result<(), LlmError> {
        match event {
            VendorEvent::Text { index, text } => {
                if text.is_empty() {
                    return Ok(());
                }
                self.text.entry(index).or_default().push_str(&text);
                let delta = ChunkDelta {
                    role: self.first_for(index).then_some(Role::Assistant),
                    content: Some(text),
                };
                self.send(self.chunk(index, delta, None), cancel).await
            }
            VendorEvent::Finish { index, reason } => {
                let delta = ChunkDelta {
                    role: self.first_for(index).then_some(Role::Assistant),
                    content: None,
                };
                self.send(self.chunk(index, delta, Some(reason)), cancel).await
            }
            VendorEvent::Usage {
                prompt_tokens,
                completion_tokens,
            } => {
                self.prompt_tokens = prompt_tokens.or(self.prompt_tokens);
                self.completion_tokens = completion_tokens.or(self.completion_tokens);
                Ok(())
            }
        }
    }

    /// Whether this is the first chunk of choice `index`
    fn first_for(&mut self, index: u32) -> bool {
        self.started_choices.insert(index)
    }

    fn chunk(&self, index: u32, delta: ChunkDelta, finish_reason: Option<FinishReason>) -> StreamChunk {
        StreamChunk {
            id: self.ctx.id.clone(),
            object: "chat.completion.chunk",
            created: self.ctx.created,
            model: self.ctx.model.clone(),
            choices: vec![ChunkChoice {
                index,
                delta,
                finish_reason,
            }],
        }
    }

    async fn send(&self, chunk: StreamChunk, cancel: &CancellationToken) -> Result<(), LlmError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(LlmError::Cancelled),
            sent = self.tx.send(chunk) => sent.map_err(|_| LlmError::Cancelled),
        }
    }

    fn metrics(&self, error: Option<LlmError>) -> StreamMetrics {
        let input = self.prompt_tokens.unwrap_or(self.ctx.prompt_tokens);
        let output = self.completion_tokens.unwrap_or_else(|| {
            self.text
                .values()
                .map(|text| approximate_tokens(text))
                .fold(0, u32::saturating_add)
        });

        StreamMetrics {
            latency: self.ctx.started.elapsed(),
            total_input_tokens: input,
            total_output_tokens: output,
            cost: self.ctx.pricing.cost(&self.ctx.model, input, output),
            error: error.map(|e| e.to_string()),
        }
    }
}

/// Split `text` into word fragments, each keeping its leading whitespace
///
/// Concatenating the fragments yields `text` unchanged.
pub fn fragment_words(text: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut in_word = false;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if in_word {
                fragments.push(&text[start..i]);
                start = i;
                in_word = false;
            }
        } else {
            in_word = true;
        }
    }

    if start < text.len() {
        fragments.push(&text[start..]);
    }

    fragments
}
