use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Settings for every vendor adapter
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    /// `OpenAI` chat completions
    #[serde(default)]
    pub openai: VendorConfig,
    /// Anthropic Messages API
    #[serde(default)]
    pub claude: VendorConfig,
    /// Google Generative Language API
    #[serde(default)]
    pub gemini: VendorConfig,
    /// In-process mock vendor
    #[serde(default)]
    pub mock: MockConfig,
}

/// Connection settings for a networked vendor
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VendorConfig {
    /// Key used when an internal gateway key carries no vendor credential
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override (useful for proxies and tests)
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Per-request timeout, e.g. `"120s"`
    #[serde(default)]
    pub timeout: Option<String>,
}

/// Fault injection for the mock vendor
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    /// Probability that a call fails upstream
    #[serde(default = "default_rate")]
    pub failure_rate: f64,
    /// Probability that a response has no choices
    #[serde(default = "default_rate")]
    pub empty_choices_rate: f64,
    /// Probability that a choice finishes with `error`
    #[serde(default = "default_rate")]
    pub error_finish_rate: f64,
}

impl MockConfig {
    /// Mock that never injects faults
    pub const fn reliable() -> Self {
        Self {
            failure_rate: 0.0,
            empty_choices_rate: 0.0,
            error_finish_rate: 0.0,
        }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            failure_rate: default_rate(),
            empty_choices_rate: default_rate(),
            error_finish_rate: default_rate(),
        }
    }
}

const fn default_rate() -> f64 {
    0.01
}
