use std::collections::HashMap;

use secrecy::SecretString;
use serde::Deserialize;

/// Details the key store returns for an internal gateway key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyDetails {
    /// Key record identifier
    pub key_id: String,
    /// Owner of the key
    pub user_id: String,
    /// Project the key belongs to
    #[serde(default)]
    pub project_id: String,
    /// Requests per second allowed for this key (absent or 0 means unlimited)
    #[serde(default, rename = "key_rate_limit_per_second")]
    pub key_rate_limit: Option<u32>,
    /// Requests per second allowed per traced end customer (absent or 0 means unlimited)
    #[serde(default, rename = "user_rate_limit_per_second")]
    pub user_rate_limit: Option<u32>,
    /// Vendor credentials bound to this key, keyed by provider name
    #[serde(default)]
    pub provider_keys: HashMap<String, SecretString>,
}

impl KeyDetails {
    /// Vendor credential bound to this key for a provider (case-insensitive)
    pub fn provider_key(&self, provider: &str) -> Option<&SecretString> {
        self.provider_keys
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(provider))
            .map(|(_, key)| key)
    }
}
