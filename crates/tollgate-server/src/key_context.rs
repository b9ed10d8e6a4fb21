//! Caller identification middleware
//!
//! Reads the gateway headers into a [`RequestContext`] and, for keys carrying
//! the internal prefix, attaches the details resolved by the key store.

use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use secrecy::ExposeSecret;
use tollgate_core::RequestContext;
use tollgate_keystore::{KeyStore, KeyStoreError};

/// Resolves internal keys for every request
#[derive(Clone)]
pub struct KeyResolver {
    store: Option<Arc<dyn KeyStore>>,
    internal_key_prefix: Arc<str>,
}

impl KeyResolver {
    pub fn new(store: Option<Arc<dyn KeyStore>>, internal_key_prefix: &str) -> Self {
        Self {
            store,
            internal_key_prefix: Arc::from(internal_key_prefix),
        }
    }

    /// Build the context for a request
    ///
    /// Lookup failures leave `key_details` empty; handlers reject such
    /// callers when they need the details.
    pub async fn context(&self, headers: &http::HeaderMap) -> RequestContext {
        let mut ctx = RequestContext::from_headers(headers);

        if !ctx.has_internal_key(&self.internal_key_prefix) {
            return ctx;
        }

        let (Some(store), Some(key)) = (&self.store, &ctx.api_key) else {
            tracing::warn!("internal key presented but no key store is configured");
            return ctx;
        };

        match store.key_details(key.expose_secret()).await {
            Ok(details) => ctx.key_details = Some(details),
            Err(KeyStoreError::InvalidKey) => tracing::debug!("unknown internal key"),
            Err(e) => tracing::warn!(error = %e, "key lookup failed"),
        }

        ctx
    }
}

/// Insert the resolved [`RequestContext`] as a request extension
pub async fn key_context_middleware(resolver: KeyResolver, mut request: Request, next: Next) -> Response {
    let ctx = resolver.context(request.headers()).await;
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use http::HeaderMap;
    use tollgate_config::{StaticKeyConfig, StaticKeyStoreConfig};
    use tollgate_core::headers;
    use tollgate_keystore::StaticKeyStore;

    use super::*;

    fn resolver() -> KeyResolver {
        let store = StaticKeyStore::from_config(&StaticKeyStoreConfig {
            keys: vec![StaticKeyConfig {
                key: "tollgate-known".into(),
                key_id: "k1".to_owned(),
                user_id: "u1".to_owned(),
                project_id: "p1".to_owned(),
                key_rate_limit_per_second: Some(5),
                user_rate_limit_per_second: None,
                provider_keys: HashMap::new(),
            }],
        });
        KeyResolver::new(Some(Arc::new(store)), "tollgate")
    }

    fn headers_with_key(key: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(headers::KEY, key.parse().unwrap());
        map
    }

    #[tokio::test]
    async fn known_internal_key_is_resolved() {
        let ctx = resolver().context(&headers_with_key("tollgate-known")).await;
        let details = ctx.key_details.unwrap();
        assert_eq!(details.user_id, "u1");
        assert_eq!(details.key_rate_limit, Some(5));
    }

    #[tokio::test]
    async fn unknown_internal_key_has_no_details() {
        let ctx = resolver().context(&headers_with_key("tollgate-other")).await;
        assert!(ctx.api_key.is_some());
        assert!(ctx.key_details.is_none());
    }

    #[tokio::test]
    async fn raw_vendor_key_skips_lookup() {
        let ctx = resolver().context(&headers_with_key("sk-vendor")).await;
        assert!(ctx.key_details.is_none());
        assert!(!ctx.has_internal_key("tollgate"));
    }

    #[tokio::test]
    async fn missing_store_leaves_details_empty() {
        let ctx = KeyResolver::new(None, "tollgate")
            .context(&headers_with_key("tollgate-known"))
            .await;
        assert!(ctx.key_details.is_none());
    }
}
