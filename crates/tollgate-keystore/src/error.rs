use http::StatusCode;
use tollgate_core::HttpError;

/// Key store errors
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    /// The key is not known to the store
    #[error("invalid API key")]
    InvalidKey,

    /// The store could not be reached
    #[error("key lookup failed: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// The store answered with an error
    #[error("key store error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Body or parse failure reported by the store
        message: String,
    },
}

impl HttpError for KeyStoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidKey => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) | Self::Api { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidKey => "authentication_error",
            Self::Unavailable(_) | Self::Api { .. } => "api_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::InvalidKey => "Invalid API key".to_owned(),
            Self::Unavailable(_) | Self::Api { .. } => "Key store unavailable".to_owned(),
        }
    }
}
