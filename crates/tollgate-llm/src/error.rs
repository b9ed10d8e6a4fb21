use http::StatusCode;
use thiserror::Error;
use tollgate_core::HttpError;

use crate::provider::ProviderKind;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Image part is not a `data:<mime>;base64,<payload>` URI
    #[error("invalid image format: {0}")]
    InvalidImageFormat(String),

    /// Image payload is not valid base64
    #[error("invalid image encoding: {0}")]
    InvalidImageEncoding(String),

    /// Vendor call failed or returned malformed data
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Provider name is not one of the supported vendors
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Vendor stream could not be established
    #[error("stream setup failed: {0}")]
    StreamSetup(String),

    /// Client sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No vendor credential is available for the provider
    #[error("{provider} API key not configured for this key")]
    MissingCredential {
        /// Provider that needed a credential
        provider: ProviderKind,
    },

    /// Request lacks a usable key
    #[error("a valid API key is required")]
    Unauthorized,

    /// The consumer went away before the call finished
    #[error("request cancelled")]
    Cancelled,

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidImageFormat(_)
            | Self::InvalidImageEncoding(_)
            | Self::UnsupportedProvider(_)
            | Self::InvalidRequest(_)
            | Self::MissingCredential { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::StreamSetup(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Cancelled | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidImageFormat(_) | Self::InvalidImageEncoding(_) | Self::InvalidRequest(_) => {
                "invalid_request_error"
            }
            Self::UnsupportedProvider(_) => "unsupported_provider_error",
            Self::MissingCredential { .. } => "missing_credential_error",
            Self::Upstream(_) | Self::StreamSetup(_) => "upstream_error",
            Self::Unauthorized => "authentication_error",
            Self::Cancelled | Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}
