use std::collections::HashMap;

use serde::Deserialize;
use url::Url;

/// Telemetry configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Service name reported with traces and metrics
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Additional resource attributes
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
    /// Console log format
    #[serde(default)]
    pub log_format: LogFormat,
    /// OTLP exporter shared by traces and metrics
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
    /// Trace sampling
    #[serde(default)]
    pub tracing: TracingConfig,
    /// Metric export cadence
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Console log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// OTLP exporter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    /// Collector endpoint
    pub endpoint: Url,
    /// Export protocol
    #[serde(default)]
    pub protocol: ExportProtocol,
}

/// OTLP export protocol
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProtocol {
    /// gRPC
    #[default]
    Grpc,
    /// HTTP/protobuf
    HttpProto,
}

/// Trace sampling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracingConfig {
    /// Sampling ratio between 0.0 and 1.0
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    /// Respect the parent span's sampling decision
    #[serde(default = "default_true")]
    pub parent_based: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            sampling_rate: default_sampling_rate(),
            parent_based: true,
        }
    }
}

/// Metric export configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Export interval, e.g. `"30s"`
    #[serde(default = "default_interval")]
    pub interval: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

fn default_service_name() -> String {
    "tollgate".to_owned()
}

const fn default_sampling_rate() -> f64 {
    1.0
}

const fn default_true() -> bool {
    true
}

fn default_interval() -> String {
    "30s".to_owned()
}
