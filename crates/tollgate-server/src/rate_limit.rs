use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use secrecy::ExposeSecret;
use tollgate_core::{HttpError, RequestContext, error_body};
use tollgate_ratelimit::{AdmissionControl, RateLimitError};

/// Admission control for callers with resolved key details
///
/// Runs after the key context middleware; requests without details pass
/// through untouched.
pub async fn rate_limit_middleware(admission: AdmissionControl, request: Request, next: Next) -> Response {
    if let Some(ctx) = request.extensions().get::<RequestContext>()
        && let (Some(key), Some(details)) = (&ctx.api_key, &ctx.key_details)
        && let Err(e) = admission.admit(key.expose_secret(), details, ctx.trace_customer_id.as_deref())
    {
        tracing::debug!(error = %e, "request rejected by admission control");
        return rate_limit_response(&e);
    }

    next.run(request).await
}

fn rate_limit_response(error: &RateLimitError) -> Response {
    let mut response = (error.status_code(), axum::Json(error_body(error))).into_response();

    if let RateLimitError::Exceeded { retry_after, .. } = error
        && let Ok(val) = retry_after.to_string().parse()
    {
        response.headers_mut().insert(http::header::RETRY_AFTER, val);
    }

    response
}
