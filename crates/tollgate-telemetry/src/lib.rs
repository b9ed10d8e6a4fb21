//! Telemetry for Tollgate
//!
//! Console logging through `tracing-subscriber`, with optional OTLP export
//! of traces and metrics, plus the OpenTelemetry-backed usage counter sink.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod counters;
mod metadata;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tollgate_config::{ExportProtocol, ExporterConfig, LogFormat, TelemetryConfig};

pub use counters::OtelCounterSink;

/// Guard that flushes and shuts down exporters on drop
pub struct TelemetryGuard {
    meter_provider: Option<SdkMeterProvider>,
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.meter_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shutdown meter provider: {e}");
        }
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shutdown tracer provider: {e}");
        }
    }
}

/// Initialize logging and, when an exporter is configured, OTLP traces and metrics
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init(config: Option<&TelemetryConfig>, log_filter: &str) -> anyhow::Result<TelemetryGuard> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut guard = TelemetryGuard {
        meter_provider: None,
        tracer_provider: None,
    };

    let log_format = config.map_or(LogFormat::Text, |c| c.log_format);
    let (text_layer, json_layer) = match log_format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer().with_target(true)), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json().with_target(true))),
    };

    let mut otel_layer = None;

    if let Some(telemetry_config) = config
        && let Some(exporter) = telemetry_config.exporter.as_ref()
    {
        let resource = metadata::build_resource(telemetry_config);

        let meter_provider = init_metrics(telemetry_config, exporter, resource.clone())?;
        global::set_meter_provider(meter_provider.clone());
        guard.meter_provider = Some(meter_provider);

        let tracer_provider = init_tracer(telemetry_config, exporter, resource)?;
        let tracer = tracer_provider.tracer("tollgate");
        otel_layer = Some(tracing_opentelemetry::layer().with_tracer(tracer));
        global::set_tracer_provider(tracer_provider.clone());
        guard.tracer_provider = Some(tracer_provider);
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .init();

    Ok(guard)
}

/// Initialize OTLP metrics export
fn init_metrics(
    config: &TelemetryConfig,
    exporter_config: &ExporterConfig,
    resource: opentelemetry_sdk::Resource,
) -> anyhow::Result<SdkMeterProvider> {
    use opentelemetry_otlp::MetricExporter;
    use opentelemetry_sdk::metrics::PeriodicReader;

    let interval = tollgate_config::parse_duration("telemetry.metrics.interval", &config.metrics.interval)?;

    let exporter = match exporter_config.protocol {
        ExportProtocol::Grpc => MetricExporter::builder()
            .with_tonic()
            .with_endpoint(exporter_config.endpoint.as_str())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build gRPC metrics exporter: {e}"))?,
        ExportProtocol::HttpProto => MetricExporter::builder()
            .with_http()
            .with_endpoint(exporter_config.endpoint.as_str())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP metrics exporter: {e}"))?,
    };

    let reader = PeriodicReader::builder(exporter).with_interval(interval).build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

/// Initialize OTLP trace export
fn init_tracer(
    config: &TelemetryConfig,
    exporter_config: &ExporterConfig,
    resource: opentelemetry_sdk::Resource,
) -> anyhow::Result<SdkTracerProvider> {
    use opentelemetry_otlp::SpanExporter;
    use opentelemetry_sdk::trace::Sampler;

    let exporter = match exporter_config.protocol {
        ExportProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(exporter_config.endpoint.as_str())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build gRPC span exporter: {e}"))?,
        ExportProtocol::HttpProto => SpanExporter::builder()
            .with_http()
            .with_endpoint(exporter_config.endpoint.as_str())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP span exporter: {e}"))?,
    };

    let sampling_rate = config.tracing.sampling_rate;
    let sampler = if sampling_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if sampling_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(sampling_rate)
    };

    let sampler = if config.tracing.parent_based {
        Sampler::ParentBased(Box::new(sampler))
    } else {
        sampler
    };

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(sampler)
        .with_batch_exporter(exporter)
        .build())
}
