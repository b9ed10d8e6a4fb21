use serde::Deserialize;

/// Settings for the completion test-suite endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Provider that generates test cases from role details
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model that generates test cases
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature for test-case generation
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// In-flight upstream calls allowed per provider
    #[serde(default = "default_concurrency")]
    pub max_concurrency_per_provider: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_concurrency_per_provider: default_concurrency(),
        }
    }
}

fn default_provider() -> String {
    "OpenAI".to_owned()
}

fn default_model() -> String {
    "gpt-4o-mini".to_owned()
}

const fn default_temperature() -> f64 {
    0.2
}

const fn default_concurrency() -> usize {
    4
}
