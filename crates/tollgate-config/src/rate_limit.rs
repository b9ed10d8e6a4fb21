use std::time::Duration;

use serde::Deserialize;

/// Per-key and per-customer admission control
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Disable to let every request through
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// How often idle buckets are swept
    #[serde(default = "default_window")]
    pub sweep_interval: String,
    /// Buckets unused for longer than this are evicted
    #[serde(default = "default_window")]
    pub idle_timeout: String,
}

impl RateLimitConfig {
    /// Parsed sweep interval
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string is invalid
    pub fn sweep_interval(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("rate_limit.sweep_interval", &self.sweep_interval)
    }

    /// Parsed idle timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string is invalid
    pub fn idle_timeout(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("rate_limit.idle_timeout", &self.idle_timeout)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sweep_interval: default_window(),
            idle_timeout: default_window(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

fn default_window() -> String {
    "60s".to_owned()
}
