//! Mock vendor backend for integration tests
//!
//! Serves minimal OpenAI, Claude and Gemini endpoints under `/v1` with
//! canned content and fixed token usage, recording the credential of each
//! call.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Text every vendor answers with
pub const CONTENT: &str = "Hello from mock vendor";

/// Usage every vendor reports
pub const PROMPT_TOKENS: u32 = 10;
pub const COMPLETION_TOKENS: u32 = 20;

/// Mock vendor that returns predictable responses
pub struct MockVendor {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockVendorState>,
}

#[derive(Default)]
struct MockVendorState {
    calls: AtomicU32,
    failing: AtomicBool,
    last_credential: Mutex<Option<String>>,
}

impl MockVendorState {
    fn record(&self, credential: Option<&str>) -> Option<Response> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        *self.last_credential.lock().unwrap() = credential.map(str::to_owned);

        self.failing.load(Ordering::Relaxed).then(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": {"message": "mock vendor failure", "type": "server_error"}})),
            )
                .into_response()
        })
    }
}

impl MockVendor {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockVendorState::default());

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(openai_chat))
            .route("/v1/messages", routing::post(claude_messages))
            .route("/v1/models/{target}", routing::post(gemini_generate))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL shared by all three vendor adapters
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Answer every following call with a 500
    pub fn fail(&self) {
        self.state.failing.store(true, Ordering::Relaxed);
    }

    pub fn calls(&self) -> u32 {
        self.state.calls.load(Ordering::Relaxed)
    }

    /// Credential presented on the most recent call
    pub fn last_credential(&self) -> Option<String> {
        self.state.last_credential.lock().unwrap().clone()
    }
}

impl Drop for MockVendor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn sse(events: &[String]) -> Response {
    let body: String = events.iter().map(|event| format!("{event}\n\n")).collect();
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from(body))
        .unwrap()
}

fn words() -> impl Iterator<Item = String> {
    let parts: Vec<&str> = CONTENT.split(' ').collect();
    let last = parts.len() - 1;
    parts
        .into_iter()
        .enumerate()
        .map(move |(i, word)| if i == last { word.to_owned() } else { format!("{word} ") })
}

// -- OpenAI --

async fn openai_chat(State(state): State<Arc<MockVendorState>>, headers: HeaderMap, Json(req): Json<Value>) -> Response {
    let credential = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if let Some(failure) = state.record(credential) {
        return failure;
    }

    let model = req["model"].as_str().unwrap_or_default().to_owned();

    if req["stream"].as_bool().unwrap_or(false) {
        let mut events: Vec<String> = words()
            .map(|word| {
                let chunk = json!({
                    "id": "chatcmpl-mock",
                    "object": "chat.completion.chunk",
                    "created": 1_700_000_000,
                    "model": model,
                    "choices": [{"index": 0, "delta": {"content": word}, "finish_reason": null}]
                });
                format!("data: {chunk}")
            })
            .collect();
        let finish = json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": model,
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
        });
        let usage = json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": model,
            "choices": [],
            "usage": {
                "prompt_tokens": PROMPT_TOKENS,
                "completion_tokens": COMPLETION_TOKENS,
                "total_tokens": PROMPT_TOKENS + COMPLETION_TOKENS
            }
        });
        events.push(format!("data: {finish}"));
        events.push(format!("data: {usage}"));
        events.push("data: [DONE]".to_owned());
        return sse(&events);
    }

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": CONTENT},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": PROMPT_TOKENS,
            "completion_tokens": COMPLETION_TOKENS,
            "total_tokens": PROMPT_TOKENS + COMPLETION_TOKENS
        }
    }))
    .into_response()
}

// -- Claude --

async fn claude_messages(
    State(state): State<Arc<MockVendorState>>,
    headers: HeaderMap,
    Json(req): Json<Value>,
) -> Response {
    let credential = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if let Some(failure) = state.record(credential) {
        return failure;
    }

    let model = req["model"].as_str().unwrap_or_default().to_owned();

    if req["stream"].as_bool().unwrap_or(false) {
        let start = json!({
            "type": "message_start",
            "message": {"id": "msg_mock", "model": model, "usage": {"input_tokens": PROMPT_TOKENS, "output_tokens": 1}}
        });
        let mut events = vec![format!("event: message_start\ndata: {start}")];
        events.extend(words().map(|word| {
            let delta = json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": word}});
            format!("event: content_block_delta\ndata: {delta}")
        }));
        let end = json!({
            "type": "message_delta",
            "delta": {"stop_reason": "end_turn"},
            "usage": {"output_tokens": COMPLETION_TOKENS}
        });
        events.push(format!("event: message_delta\ndata: {end}"));
        events.push(format!("event: message_stop\ndata: {}", json!({"type": "message_stop"})));
        return sse(&events);
    }

    Json(json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": model,
        "content": [{"type": "text", "text": CONTENT}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": PROMPT_TOKENS, "output_tokens": COMPLETION_TOKENS}
    }))
    .into_response()
}

// -- Gemini --

async fn gemini_generate(
    State(state): State<Arc<MockVendorState>>,
    Path(target): Path<String>,
    Query(query): Query<std::collections::HashMap<String, String>>,
) -> Response {
    if let Some(failure) = state.record(query.get("key").map(String::as_str)) {
        return failure;
    }

    let usage = json!({
        "promptTokenCount": PROMPT_TOKENS,
        "candidatesTokenCount": COMPLETION_TOKENS,
        "totalTokenCount": PROMPT_TOKENS + COMPLETION_TOKENS
    });

    if target.ends_with(":streamGenerateContent") {
        let chunk = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": CONTENT}]}, "finishReason": "STOP", "index": 0}],
            "usageMetadata": usage
        });
        return sse(&[format!("data: {chunk}")]);
    }

    Json(json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": CONTENT}]}, "finishReason": "STOP", "index": 0}],
        "usageMetadata": usage
    }))
    .into_response()
}
