use std::path::Path;

use anyhow::{Context, bail};
use secrecy::ExposeSecret;

use crate::{Config, KeyStoreConfig, parse_duration};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Environment placeholders are expanded before parsing and the
    /// result is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// resolved, the TOML is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        raw.parse()
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_gateway()?;
        self.validate_mock()?;
        self.validate_durations()?;
        self.validate_key_store()?;

        if self.evaluation.max_concurrency_per_provider == 0 {
            bail!("evaluation.max_concurrency_per_provider must be greater than 0");
        }

        Ok(())
    }

    fn validate_gateway(&self) -> anyhow::Result<()> {
        if self.gateway.internal_key_prefix.trim().is_empty() {
            bail!("gateway.internal_key_prefix must not be empty");
        }
        Ok(())
    }

    fn validate_mock(&self) -> anyhow::Result<()> {
        let mock = &self.providers.mock;
        for (name, rate) in [
            ("failure_rate", mock.failure_rate),
            ("empty_choices_rate", mock.empty_choices_rate),
            ("error_finish_rate", mock.error_finish_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                bail!("providers.mock.{name} must be between 0 and 1, got {rate}");
            }
        }
        Ok(())
    }

    fn validate_durations(&self) -> anyhow::Result<()> {
        if self.rate_limit.sweep_interval()?.is_zero() {
            bail!("rate_limit.sweep_interval must be greater than 0");
        }
        self.rate_limit.idle_timeout()?;

        for (name, vendor) in [
            ("openai", &self.providers.openai),
            ("claude", &self.providers.claude),
            ("gemini", &self.providers.gemini),
        ] {
            if let Some(ref timeout) = vendor.timeout {
                parse_duration(&format!("providers.{name}.timeout"), timeout)?;
            }
        }

        if let Some(ref cors) = self.server.cors {
            cors.max_age()?;
        }

        if let Some(ref telemetry) = self.telemetry {
            parse_duration("telemetry.metrics.interval", &telemetry.metrics.interval)?;
        }

        Ok(())
    }

    fn validate_key_store(&self) -> anyhow::Result<()> {
        match self.key_store {
            Some(KeyStoreConfig::Http(ref http)) => {
                if http.service_key.expose_secret().is_empty() {
                    bail!("key_store.service_key must not be empty");
                }
                parse_duration("key_store.cache_ttl", &http.cache_ttl)?;
                parse_duration("key_store.timeout", &http.timeout)?;
            }
            Some(KeyStoreConfig::Static(ref store)) => {
                let prefix = &self.gateway.internal_key_prefix;
                if let Some(entry) = store.keys.iter().find(|k| !k.key.expose_secret().starts_with(prefix.as_str())) {
                    bail!("static key '{}' does not start with the internal prefix '{prefix}'", entry.key_id);
                }
            }
            None => {}
        }
        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let expanded = crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;
        let config: Self = toml::from_str(&expanded).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }
}
