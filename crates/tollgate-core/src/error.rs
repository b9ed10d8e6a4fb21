use http::StatusCode;

/// Contract for domain errors that surface as HTTP responses
///
/// Feature crates implement this on their own error enums so the server
/// can render them without knowing their variants.
pub trait HttpError: std::error::Error {
    /// Status code returned to the caller
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `upstream_error`)
    fn error_type(&self) -> &str;

    /// Message that is safe to show to API consumers
    fn client_message(&self) -> String;
}

/// Render an error as the gateway's JSON error body
pub fn error_body(error: &dyn HttpError) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "type": error.error_type(),
            "message": error.client_message(),
        }
    })
}
