use std::net::SocketAddr;

use serde::Deserialize;

use crate::cors::CorsConfig;

/// HTTP server configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind, `0.0.0.0:8080` when absent
    pub listen_address: Option<SocketAddr>,
    /// Health endpoint
    #[serde(default)]
    pub health: HealthConfig,
    /// Cross-origin access, disabled when absent
    #[serde(default)]
    pub cors: Option<CorsConfig>,
}

/// Health endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Whether `/health` is served
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Route path
    #[serde(default = "default_health_path")]
    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_health_path(),
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_health_path() -> String {
    "/health".to_owned()
}
