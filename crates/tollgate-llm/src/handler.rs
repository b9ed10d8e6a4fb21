//! Axum route handlers for the completion endpoints

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router, routing};
use futures_util::{Stream, stream};
use serde::Deserialize;
use tokio_util::sync::{CancellationToken, DropGuard};
use tollgate_config::EvaluationConfig;
use tollgate_core::{HttpError, RequestContext, error_body, headers};

use crate::error::LlmError;
use crate::evaluation::{EvaluationRequest, Evaluator};
use crate::gateway::{Completion, CompletionStream, Gateway};
use crate::protocol::openai::OpenAiRequest;
use crate::types::{ChatRequest, StreamMetrics};

/// Shared state for the completion routes
#[derive(Clone)]
pub struct LlmState {
    gateway: Arc<Gateway>,
    evaluator: Arc<Evaluator>,
}

impl LlmState {
    pub fn new(gateway: Arc<Gateway>, evaluation: EvaluationConfig) -> Self {
        let evaluator = Arc::new(Evaluator::new(Arc::clone(&gateway), evaluation));
        Self { gateway, evaluator }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionQuery {
    provider: Option<String>,
}

/// Build the completion router
///
/// Expects a [`RequestContext`] extension, inserted by the server's key
/// middleware.
pub fn llm_router(state: LlmState) -> Router {
    Router::new()
        .route("/completions", routing::post(completions))
        .route("/completions/test", routing::post(test_completions))
        .with_state(state)
}

fn error_response(error: &LlmError) -> Response {
    (error.status_code(), Json(error_body(error))).into_response()
}

/// Handle `POST /completions`
async fn completions(
    State(state): State<LlmState>,
    Query(query): Query<CompletionQuery>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<OpenAiRequest>, JsonRejection>,
) -> Response {
    let kind = match state.gateway.resolve_provider(query.provider.as_deref()) {
        Ok(kind) => kind,
        Err(e) => return error_response(&e),
    };

    let request = match body
        .map_err(|rejection| LlmError::InvalidRequest(rejection.body_text()))
        .and_then(|Json(wire)| ChatRequest::try_from(wire))
    {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    if request.stream {
        let cancel = CancellationToken::new();
        match state.gateway.stream(kind, &request, &ctx, cancel.clone()) {
            Ok(stream) => sse_response(stream, cancel.drop_guard()).into_response(),
            Err(e) => error_response(&e),
        }
    } else {
        match state.gateway.complete(kind, &request, &ctx).await {
            Ok(completion) => sync_response(completion),
            Err(e) => {
                tracing::warn!(provider = %kind, model = %request.model, error = %e, "completion failed");
                error_response(&e)
            }
        }
    }
}

fn sync_response(completion: Completion) -> Response {
    let mut response_headers = HeaderMap::new();

    if completion.response.cost > 0.0
        && let Ok(value) = HeaderValue::from_str(&format!("${:.6}", completion.response.cost))
    {
        response_headers.insert(headers::LLM_COST, value);
    }
    let latency_ns = u64::try_from(completion.latency.as_nanos()).unwrap_or(u64::MAX);
    response_headers.insert(headers::LLM_LATENCY_NS, HeaderValue::from(latency_ns));

    (response_headers, Json(completion.response)).into_response()
}

enum SseState {
    Chunks(CompletionStream, DropGuard),
    Finishing(CompletionStream, DropGuard),
    Metrics(StreamMetrics),
    Close,
    Ended,
}

/// Chunk events, then `[DONE]`, `[METRICS]`, the metrics JSON, `[CLOSE]`
///
/// Dropping the response (client disconnect) drops the guard, which
/// cancels the forwarding task.
fn sse_response(completion: CompletionStream, guard: DropGuard) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = stream::unfold(SseState::Chunks(completion, guard), |state| async move {
        let step = match state {
            SseState::Chunks(mut stream, guard) => match stream.next_chunk().await {
                Some(chunk) => Some((json_event(&chunk), SseState::Chunks(stream, guard))),
                None => Some((Event::default().data("[DONE]"), SseState::Finishing(stream, guard))),
            },
            SseState::Finishing(stream, guard) => {
                let metrics = stream.finish().await;
                drop(guard);
                Some((Event::default().data("[METRICS]"), SseState::Metrics(metrics)))
            }
            SseState::Metrics(metrics) => Some((json_event(&metrics), SseState::Close)),
            SseState::Close => Some((Event::default().data("[CLOSE]"), SseState::Ended)),
            SseState::Ended => None,
        };
        step.map(|(event, next)| (Ok::<_, Infallible>(event), next))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn json_event(value: &impl serde::Serialize) -> Event {
    let data = serde_json::to_string(value).unwrap_or_default();
    Event::default().data(data)
}

/// Handle `POST /completions/test`
async fn test_completions(
    State(state): State<LlmState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<EvaluationRequest>, JsonRejection>,
) -> Response {
    if !ctx.has_internal_key(state.gateway.internal_key_prefix()) || ctx.key_details.is_none() {
        return error_response(&LlmError::Unauthorized);
    }

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(&LlmError::InvalidRequest(rejection.body_text())),
    };

    match state.evaluator.evaluate(request, &ctx).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "evaluation failed");
            error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tollgate_config::MockConfig;
    use tower::ServiceExt;

    use super::*;
    use crate::gateway::tests::internal_ctx;
    use crate::provider::ProviderKind;
    use crate::provider::mock::MockProvider;

    fn router(ctx: RequestContext) -> Router {
        let gateway = Gateway::new(ProviderKind::Mock, "tollgate")
            .with_provider(Arc::new(MockProvider::new(MockConfig::reliable())));
        llm_router(LlmState::new(Arc::new(gateway), EvaluationConfig::default())).layer(Extension(ctx))
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn sync_completion_sets_latency_header() {
        let response = router(internal_ctx(&[]))
            .oneshot(post(
                "/completions?provider=mock",
                &json!({"model": "mock-1", "messages": [{"role": "user", "content": "hi"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(headers::LLM_LATENCY_NS));
        // the mock vendor is free
        assert!(!response.headers().contains_key(headers::LLM_COST));

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["object"], "chat.completion");
        assert_eq!(body["model"], "mock-1");
        assert_eq!(body["choices"][0]["message"]["role"], "assistant");
        assert!(body.get("cost").is_none());
    }

    #[tokio::test]
    async fn unknown_provider_is_bad_request() {
        let response = router(internal_ctx(&[]))
            .oneshot(post(
                "/completions?provider=Unknown",
                &json!({"model": "m", "messages": []}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["type"], "unsupported_provider_error");
    }

    #[tokio::test]
    async fn malformed_image_is_bad_request() {
        let response = router(internal_ctx(&[]))
            .oneshot(post(
                "/completions?provider=Mock",
                &json!({"model": "m", "messages": [{"role": "user", "content": [
                    {"type": "image_url", "image_url": {"url": "not-a-data-uri"}}
                ]}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn stream_ends_with_sentinels_and_metrics() {
        let response = router(internal_ctx(&[]))
            .oneshot(post(
                "/completions?provider=Mock",
                &json!({"model": "mock-1", "stream": true, "messages": [{"role": "user", "content": "hi"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        let data: Vec<&str> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .collect();

        let tail = &data[data.len() - 4..];
        assert_eq!(tail[0], "[DONE]");
        assert_eq!(tail[1], "[METRICS]");
        assert_eq!(tail[3], "[CLOSE]");

        let metrics: Value = serde_json::from_str(tail[2]).unwrap();
        assert!(metrics["latency"].as_u64().is_some());
        assert!(metrics["totalOutputTokens"].as_u64().unwrap() > 0);
        assert!(metrics["error"].is_null());

        let first: Value = serde_json::from_str(data[0]).unwrap();
        assert_eq!(first["object"], "chat.completion.chunk");
        assert_eq!(first["choices"][0]["delta"]["role"], "assistant");
    }

    #[tokio::test]
    async fn evaluation_requires_internal_key() {
        let ctx = RequestContext {
            api_key: Some(secrecy::SecretString::from("sk-raw".to_owned())),
            ..RequestContext::default()
        };
        let response = router(ctx)
            .oneshot(post(
                "/completions/test",
                &json!({"prompt": "p", "testCases": [], "testProviders": []}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn evaluation_runs_cases() {
        let response = router(internal_ctx(&[]))
            .oneshot(post(
                "/completions/test",
                &json!({
                    "prompt": "You are a tester.",
                    "testCases": [{"question": "Say something", "assert": {"type": "Keywords", "value": "response,mock,output"}}],
                    "testProviders": [{"provider": "Mock", "model": "mock-1", "temperature": 0.2}]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        let result = &body["questionResponses"][0]["llmResponses"][0];
        assert_eq!(body["questionResponses"][0]["question"], "Say something");
        assert_eq!(result["provider"], "Mock");
        assert_eq!(result["status"], true);
        assert!(!result["answer"].as_str().unwrap().is_empty());
    }
}
