use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mini_moka::sync::Cache;
use secrecy::{ExposeSecret, SecretString};
use tollgate_config::HttpKeyStoreConfig;
use tollgate_core::KeyDetails;

use crate::{KeyStore, KeyStoreError, key_hash};

const KEYS_PATH: [&str; 3] = ["rest", "v1", "keys"];

/// Key store backed by a REST key table, with a TTL cache in front
///
/// Keys are addressed by their SHA-256 hash. Only successful lookups are
/// cached, so a key created after a miss is picked up on the next request.
#[derive(Clone)]
pub struct HttpKeyStore {
    http: reqwest::Client,
    endpoint: url::Url,
    service_key: SecretString,
    cache: Cache<String, Arc<KeyDetails>>,
}

impl HttpKeyStore {
    /// Create a new store
    ///
    /// The key table lives under `rest/v1/keys` below `url`, keeping any
    /// base path it carries.
    pub fn new(
        url: url::Url,
        service_key: SecretString,
        cache_ttl: Duration,
        cache_capacity: u64,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        let mut endpoint = url;
        endpoint
            .path_segments_mut()
            .map_err(|()| anyhow::anyhow!("key store url cannot be a base"))?
            .pop_if_empty()
            .extend(KEYS_PATH);

        let cache = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(cache_capacity)
            .build();

        Ok(Self {
            http,
            endpoint,
            service_key,
            cache,
        })
    }

    pub fn from_config(config: &HttpKeyStoreConfig) -> anyhow::Result<Self> {
        Self::new(
            config.url.clone(),
            config.service_key.clone(),
            tollgate_config::parse_duration("key_store.cache_ttl", &config.cache_ttl)?,
            config.cache_capacity,
            tollgate_config::parse_duration("key_store.timeout", &config.timeout)?,
        )
    }

    async fn fetch(&self, hash: &str) -> Result<KeyDetails, KeyStoreError> {
        let service_key = self.service_key.expose_secret();
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("key", format!("eq.{hash}"))])
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "key store lookup failed");
            return Err(KeyStoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let rows: Vec<KeyDetails> = response.json().await.map_err(|e| KeyStoreError::Api {
            status: 0,
            message: format!("failed to parse response: {e}"),
        })?;

        rows.into_iter().next().ok_or(KeyStoreError::InvalidKey)
    }
}

#[async_trait]
impl KeyStore for HttpKeyStore {
    async fn key_details(&self, key: &str) -> Result<Arc<KeyDetails>, KeyStoreError> {
        let hash = key_hash(key);

        if let Some(cached) = self.cache.get(&hash) {
            return Ok(cached);
        }

        let details = Arc::new(self.fetch(&hash).await?);
        self.cache.insert(hash, Arc::clone(&details));

        Ok(details)
    }
}
