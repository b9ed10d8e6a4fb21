use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use http::StatusCode;
use tollgate_core::RequestContext;

/// Liveness probe
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Handle `POST /validate`
///
/// Succeeds only when the `key` header names an internal key known to the
/// key store.
pub async fn validate_handler(Extension(ctx): Extension<RequestContext>) -> Response {
    let message = match (&ctx.api_key, &ctx.key_details) {
        (_, Some(_)) => return StatusCode::OK.into_response(),
        (None, _) => "please provide an API key in the key header",
        (Some(_), None) => "please provide a valid gateway API key in the key header",
    };

    let body = serde_json::json!({
        "error": {
            "type": "authentication_error",
            "message": message,
        }
    });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
