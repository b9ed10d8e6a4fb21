use http::StatusCode;
use thiserror::Error;
use tollgate_core::HttpError;

use crate::Scope;

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Invalid limiter configuration
    #[error("rate limit configuration error: {0}")]
    Config(String),

    /// A bucket denied the draw
    #[error("rate limit exceeded ({scope} bucket)")]
    Exceeded {
        /// Bucket that rejected the request
        scope: Scope,
        /// Seconds until a token is available, at least 1
        retry_after: u64,
    },
}

impl HttpError for RateLimitError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Exceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Config(_) => "internal_error",
            Self::Exceeded { .. } => "rate_limit_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Config(_) => "rate limiter unavailable".to_owned(),
            Self::Exceeded { retry_after, .. } => format!("rate limit exceeded, retry after {retry_after}s"),
        }
    }
}
