use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource as semconv;
use tollgate_config::TelemetryConfig;

/// Resource describing this gateway instance
///
/// Configured attributes are applied after the built-in ones, so they can
/// override the service version or name reported by the binary.
pub fn build_resource(config: &TelemetryConfig) -> Resource {
    let builtin = [
        KeyValue::new(semconv::SERVICE_NAME, config.service_name.clone()),
        KeyValue::new(semconv::SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
    ];

    let configured = config
        .resource_attributes
        .iter()
        .map(|(key, value)| KeyValue::new(key.clone(), value.clone()));

    Resource::builder_empty()
        .with_attributes(builtin.into_iter().chain(configured))
        .build()
}
