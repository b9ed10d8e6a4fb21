use std::collections::HashMap;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Backend that resolves internal gateway keys
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyStoreConfig {
    /// REST key table (PostgREST-style `keys` table addressed by key hash)
    Http(HttpKeyStoreConfig),
    /// Keys listed directly in the configuration file
    Static(StaticKeyStoreConfig),
}

/// REST key store
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpKeyStoreConfig {
    /// Base URL of the key service
    pub url: Url,
    /// Service credential sent with every lookup
    pub service_key: SecretString,
    /// How long resolved keys stay cached
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: String,
    /// Maximum cached keys
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Lookup timeout
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

/// Keys declared inline
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticKeyStoreConfig {
    /// Known keys
    #[serde(default)]
    pub keys: Vec<StaticKeyConfig>,
}

/// A single inline key
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticKeyConfig {
    /// The internal key value presented by callers
    pub key: SecretString,
    /// Key record identifier
    pub key_id: String,
    /// Owner of the key
    pub user_id: String,
    /// Owning project
    #[serde(default)]
    pub project_id: String,
    /// Requests per second for the key
    #[serde(default)]
    pub key_rate_limit_per_second: Option<u32>,
    /// Requests per second per traced customer
    #[serde(default)]
    pub user_rate_limit_per_second: Option<u32>,
    /// Vendor credentials bound to the key
    #[serde(default)]
    pub provider_keys: HashMap<String, SecretString>,
}

fn default_cache_ttl() -> String {
    "30m".to_owned()
}

const fn default_cache_capacity() -> u64 {
    10_000
}

fn default_timeout() -> String {
    "5s".to_owned()
}
