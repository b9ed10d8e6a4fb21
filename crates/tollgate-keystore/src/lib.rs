//! Resolution of internal gateway keys to their owner, limits and vendor credentials

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod http_store;
mod static_store;

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tollgate_config::KeyStoreConfig;
use tollgate_core::KeyDetails;

pub use error::KeyStoreError;
pub use http_store::HttpKeyStore;
pub use static_store::StaticKeyStore;

/// Looks up the details bound to an internal key
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Resolve a raw key, failing with [`KeyStoreError::InvalidKey`] when it is unknown
    async fn key_details(&self, key: &str) -> Result<Arc<KeyDetails>, KeyStoreError>;
}

/// Build the configured key store
pub fn from_config(config: &KeyStoreConfig) -> anyhow::Result<Arc<dyn KeyStore>> {
    let store: Arc<dyn KeyStore> = match config {
        KeyStoreConfig::Http(http) => Arc::new(HttpKeyStore::from_config(http)?),
        KeyStoreConfig::Static(inline) => Arc::new(StaticKeyStore::from_config(inline)),
    };

    Ok(store)
}

/// Lowercase hex SHA-256 of a key; raw keys are never stored or sent
pub(crate) fn key_hash(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
