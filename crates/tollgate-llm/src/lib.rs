//! Provider normalization and streaming for the Tollgate gateway
//!
//! Canonical request/response types, vendor adapters for `OpenAI`, Claude,
//! Gemini and an in-process mock, the per-model cost tables, the streaming
//! normalizer, and the orchestrator that ties them together. The `http`
//! feature adds the axum routes.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod error;
pub mod evaluation;
pub mod gateway;
#[cfg(feature = "http")]
pub mod handler;
pub mod image;
pub mod pricing;
pub mod protocol;
pub mod provider;
pub mod roles;
pub mod stream;
pub mod types;

pub use error::LlmError;
pub use evaluation::{EvaluationRequest, EvaluationResponse, Evaluator};
pub use gateway::{Completion, CompletionStream, Gateway};
#[cfg(feature = "http")]
pub use handler::{LlmState, llm_router};
pub use provider::{Provider, ProviderKind};
pub use types::{ChatRequest, ChatResponse, StreamChunk, StreamMetrics};
