#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod cors;
mod key_context;
mod rate_limit;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tollgate_config::Config;
use tollgate_core::CounterSink;
use tollgate_llm::{Gateway, LlmState};
use tollgate_ratelimit::AdmissionControl;
use tollgate_telemetry::OtelCounterSink;
use tower_http::trace::TraceLayer;

use crate::key_context::KeyResolver;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    admission: Option<AdmissionControl>,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway, key store or rate limiter cannot be
    /// constructed
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let usage: Arc<dyn CounterSink> = Arc::new(OtelCounterSink::new());
        let gateway = Arc::new(Gateway::from_config(config, Some(usage))?);

        let key_store = config
            .key_store
            .as_ref()
            .map(tollgate_keystore::from_config)
            .transpose()?;
        if key_store.is_none() {
            tracing::warn!("no key store configured; internal keys will be rejected");
        }

        let mut app = Router::new();

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(routes::health_handler));
        }

        app = app.route("/validate", axum::routing::post(routes::validate_handler));

        app = app.merge(tollgate_llm::llm_router(LlmState::new(
            gateway,
            config.evaluation.clone(),
        )));

        // Apply middleware layers (innermost first)

        // Admission control, after keys are resolved
        let admission = if config.rate_limit.enabled {
            let admission = AdmissionControl::from_config(&config.rate_limit)?;
            let layer_admission = admission.clone();
            app = app.layer(axum::middleware::from_fn(move |req, next| {
                let admission = layer_admission.clone();
                async move { rate_limit::rate_limit_middleware(admission, req, next).await }
            }));
            Some(admission)
        } else {
            None
        };

        // Key context
        let resolver = KeyResolver::new(key_store, &config.gateway.internal_key_prefix);
        app = app.layer(axum::middleware::from_fn(move |req, next| {
            let resolver = resolver.clone();
            async move { key_context::key_context_middleware(resolver, req, next).await }
        }));

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        // CORS, outermost so preflights skip key resolution
        if let Some(ref cors) = config.server.cors {
            if cors.is_active() {
                app = app.layer(cors::cors_layer(cors)?);
            } else {
                tracing::debug!("cors section has no origins; layer not installed");
            }
        }

        Ok(Self {
            router: app,
            listen_address,
            admission,
        })
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener. Idle rate
    /// limit buckets are not swept in this mode.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        let sweeper = self
            .admission
            .as_ref()
            .map(|admission| admission.spawn_sweeper(shutdown.child_token()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        if let Some(sweeper) = sweeper
            && let Err(e) = sweeper.await
        {
            tracing::warn!(error = %e, "rate limit sweeper did not stop cleanly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::body::{Body, to_bytes};
    use http::{Request, StatusCode};
    use tollgate_config::{CorsConfig, CorsList, KeyStoreConfig, StaticKeyConfig, StaticKeyStoreConfig};
    use tollgate_core::headers;
    use tower::ServiceExt;

    use super::*;

    fn config(key_rate_limit: Option<u32>) -> Config {
        let mut config = Config::default();
        config.rate_limit.enabled = true;
        config.key_store = Some(KeyStoreConfig::Static(StaticKeyStoreConfig {
            keys: vec![StaticKeyConfig {
                key: "tollgate-known".into(),
                key_id: "k1".to_owned(),
                user_id: "u1".to_owned(),
                project_id: "p1".to_owned(),
                key_rate_limit_per_second: key_rate_limit,
                user_rate_limit_per_second: None,
                provider_keys: HashMap::new(),
            }],
        }));
        config
    }

    fn router(config: &Config) -> Router {
        Server::new(config).unwrap().into_router()
    }

    fn validate(key: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/validate");
        if let Some(key) = key {
            builder = builder.header(headers::KEY, key);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = router(&Config::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn disabled_health_is_not_routed() {
        let mut config = Config::default();
        config.server.health.enabled = false;

        let response = router(&config)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn validate_accepts_known_internal_key() {
        let response = router(&config(None))
            .oneshot(validate(Some("tollgate-known")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn validate_rejects_unknown_and_missing_keys() {
        let app = router(&config(None));

        for key in [None, Some("tollgate-unknown"), Some("sk-vendor")] {
            let response = app.clone().oneshot(validate(key)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "key {key:?}");

            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(body["error"]["type"], "authentication_error");
        }
    }

    #[tokio::test]
    async fn key_limit_rejects_with_retry_after() {
        let app = router(&config(Some(1)));

        // burst is twice the per-second rate
        for _ in 0..2 {
            let response = app.clone().oneshot(validate(Some("tollgate-known"))).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let denied = app.oneshot(validate(Some("tollgate-known"))).await.unwrap();
        assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(denied.headers().contains_key(http::header::RETRY_AFTER));

        let body = to_bytes(denied.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["type"], "rate_limit_error");
    }

    #[tokio::test]
    async fn disabled_rate_limit_admits_everything() {
        let mut config = config(Some(1));
        config.rate_limit.enabled = false;
        let app = router(&config);

        for _ in 0..5 {
            let response = app.clone().oneshot(validate(Some("tollgate-known"))).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::options("/completions")
            .header(http::header::ORIGIN, origin)
            .header(http::header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(http::header::ACCESS_CONTROL_REQUEST_HEADERS, "key")
            .body(Body::empty())
            .unwrap()
    }

    fn with_cors(origins: CorsList) -> Config {
        let mut config = config(None);
        config.server.cors = Some(CorsConfig {
            origins,
            methods: CorsList::Only(vec!["POST".to_owned()]),
            headers: CorsList::Only(vec!["key".to_owned()]),
            max_age: None,
        });
        config
    }

    #[tokio::test]
    async fn cors_preflight_allows_listed_origin() {
        let app = router(&with_cors(CorsList::Only(vec!["https://app.example.com".to_owned()])));

        let response = app.clone().oneshot(preflight("https://app.example.com")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[http::header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.com");
        assert!(!headers.contains_key(http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS));

        let response = app.oneshot(preflight("https://evil.example.com")).await.unwrap();
        assert!(!response.headers().contains_key(http::header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn cors_without_origins_is_not_installed() {
        let response = router(&with_cors(CorsList::Only(Vec::new())))
            .oneshot(preflight("https://app.example.com"))
            .await
            .unwrap();
        assert!(!response.headers().contains_key(http::header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
