#![allow(clippy::must_use_candidate)]

pub mod cors;
mod env;
pub mod evaluation;
pub mod gateway;
pub mod key_store;
mod loader;
pub mod providers;
pub mod rate_limit;
pub mod server;
pub mod telemetry;

use std::time::Duration;

use serde::Deserialize;

pub use cors::*;
pub use evaluation::*;
pub use gateway::*;
pub use key_store::*;
pub use providers::*;
pub use rate_limit::*;
pub use server::*;
pub use telemetry::*;

/// Top-level Tollgate configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP listener and built-in endpoints
    #[serde(default)]
    pub server: ServerConfig,
    /// Gateway routing defaults
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Vendor adapter settings
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// In-process admission control
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Where internal keys are resolved
    #[serde(default)]
    pub key_store: Option<KeyStoreConfig>,
    /// Test-suite fan-out settings
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Logging, tracing and metrics export
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

/// Parse a human duration string such as `"60s"` or `"30m"`
///
/// # Errors
///
/// Returns an error naming the field when the value cannot be parsed
pub fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} ('{value}'): {e}"))
}
