use http::header::HeaderName;
use http::{HeaderValue, Method};
use tollgate_config::{CorsConfig, CorsList};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build the CORS layer for browser callers
///
/// Credentials are never allowed. Entries that fail to parse are logged and
/// skipped.
///
/// # Errors
///
/// Returns an error if `max_age` is not a valid duration
pub fn cors_layer(config: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let origins = match &config.origins {
        CorsList::Any => AllowOrigin::any(),
        CorsList::Only(origins) => AllowOrigin::list(parse_all::<HeaderValue>("origin", origins)),
    };

    let methods = match &config.methods {
        CorsList::Any => AllowMethods::any(),
        CorsList::Only(methods) => AllowMethods::list(parse_all::<Method>("method", methods)),
    };

    let headers = match &config.headers {
        CorsList::Any => AllowHeaders::any(),
        CorsList::Only(headers) => AllowHeaders::list(parse_all::<HeaderName>("header", headers)),
    };

    let mut layer = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(false);

    if let Some(max_age) = config.max_age()? {
        layer = layer.max_age(max_age);
    }

    Ok(layer)
}

fn parse_all<T: std::str::FromStr>(kind: &str, values: &[String]) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| {
            let parsed = value.parse().ok();
            if parsed.is_none() {
                tracing::warn!(%kind, %value, "ignoring unparseable CORS entry");
            }
            parsed
        })
        .collect()
}
