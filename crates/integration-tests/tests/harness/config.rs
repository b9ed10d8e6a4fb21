//! Programmatic configuration builder for integration tests

use std::collections::HashMap;
use std::net::SocketAddr;

use secrecy::SecretString;
use tollgate_config::{
    Config, EvaluationConfig, KeyStoreConfig, MockConfig, ServerConfig, StaticKeyConfig, StaticKeyStoreConfig,
};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
    keys: Vec<StaticKeyConfig>,
}

impl ConfigBuilder {
    /// Minimal defaults: fault-free mock vendor, no keys
    pub fn new() -> Self {
        let mut config = Config {
            server: ServerConfig {
                listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                ..ServerConfig::default()
            },
            ..Config::default()
        };
        config.providers.mock = MockConfig::reliable();

        Self {
            config,
            keys: Vec::new(),
        }
    }

    /// Point every networked vendor at a mock backend
    pub fn with_vendor_base_url(mut self, base_url: &str) -> Self {
        let url: url::Url = base_url.parse().expect("valid URL");
        for vendor in [
            &mut self.config.providers.openai,
            &mut self.config.providers.claude,
            &mut self.config.providers.gemini,
        ] {
            vendor.base_url = Some(url.clone());
        }
        self
    }

    /// Server-side OpenAI key used when an internal key carries none
    pub fn with_openai_key(mut self, key: &str) -> Self {
        self.config.providers.openai.api_key = Some(SecretString::from(key.to_owned()));
        self
    }

    /// Register an internal key
    pub fn with_key(mut self, key: TestKey) -> Self {
        self.keys.push(key.into_config());
        self
    }

    pub fn with_default_provider(mut self, provider: &str) -> Self {
        self.config.gateway.default_provider = provider.to_owned();
        self
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.config.evaluation = evaluation;
        self
    }

    pub fn without_rate_limit(mut self) -> Self {
        self.config.rate_limit.enabled = false;
        self
    }

    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    pub fn build(mut self) -> Config {
        self.config.key_store = Some(KeyStoreConfig::Static(StaticKeyStoreConfig { keys: self.keys }));
        self.config
    }
}

/// An internal key for the static key store
pub struct TestKey {
    key: String,
    user_id: String,
    key_rate_limit: Option<u32>,
    user_rate_limit: Option<u32>,
    provider_keys: HashMap<String, SecretString>,
}

impl TestKey {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_owned(),
            user_id: "user-1".to_owned(),
            key_rate_limit: None,
            user_rate_limit: None,
            provider_keys: HashMap::new(),
        }
    }

    pub fn key_rate_limit(mut self, per_second: u32) -> Self {
        self.key_rate_limit = Some(per_second);
        self
    }

    pub fn user_rate_limit(mut self, per_second: u32) -> Self {
        self.user_rate_limit = Some(per_second);
        self
    }

    pub fn provider_key(mut self, provider: &str, key: &str) -> Self {
        self.provider_keys
            .insert(provider.to_owned(), SecretString::from(key.to_owned()));
        self
    }

    fn into_config(self) -> StaticKeyConfig {
        StaticKeyConfig {
            key: SecretString::from(self.key),
            key_id: "key-1".to_owned(),
            user_id: self.user_id,
            project_id: "project-1".to_owned(),
            key_rate_limit_per_second: self.key_rate_limit,
            user_rate_limit_per_second: self.user_rate_limit,
            provider_keys: self.provider_keys,
        }
    }
}
