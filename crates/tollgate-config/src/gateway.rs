use serde::Deserialize;

/// Gateway-wide routing defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Keys starting with this prefix are internal gateway keys
    #[serde(default = "default_prefix")]
    pub internal_key_prefix: String,
    /// Provider used when the request carries no `provider` query parameter
    #[serde(default = "default_provider")]
    pub default_provider: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            internal_key_prefix: default_prefix(),
            default_provider: default_provider(),
        }
    }
}

fn default_prefix() -> String {
    "tollgate".to_owned()
}

fn default_provider() -> String {
    "OpenAI".to_owned()
}
