use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tollgate_config::StaticKeyStoreConfig;
use tollgate_core::KeyDetails;

use crate::{KeyStore, KeyStoreError, key_hash};

/// Keys declared in the configuration file
pub struct StaticKeyStore {
    keys: HashMap<String, Arc<KeyDetails>>,
}

impl StaticKeyStore {
    pub fn from_config(config: &StaticKeyStoreConfig) -> Self {
        let keys = config
            .keys
            .iter()
            .map(|entry| {
                let details = KeyDetails {
                    key_id: entry.key_id.clone(),
                    user_id: entry.user_id.clone(),
                    project_id: entry.project_id.clone(),
                    key_rate_limit: entry.key_rate_limit_per_second,
                    user_rate_limit: entry.user_rate_limit_per_second,
                    provider_keys: entry.provider_keys.clone(),
                };

                (key_hash(entry.key.expose_secret()), Arc::new(details))
            })
            .collect();

        Self { keys }
    }
}

#[async_trait]
impl KeyStore for StaticKeyStore {
    async fn key_details(&self, key: &str) -> Result<Arc<KeyDetails>, KeyStoreError> {
        self.keys
            .get(&key_hash(key))
            .cloned()
            .ok_or(KeyStoreError::InvalidKey)
    }
}
