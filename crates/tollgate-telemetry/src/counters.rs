use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Meter};
use tollgate_core::{CounterSink, Labels};

/// Usage counters exported through the global OpenTelemetry meter
///
/// Instruments are created on first use and reused afterwards. Without an
/// exporter configured the global meter is a no-op.
pub struct OtelCounterSink {
    meter: Meter,
    counters: Mutex<HashMap<&'static str, Counter<f64>>>,
}

impl OtelCounterSink {
    pub fn new() -> Self {
        Self::with_meter(opentelemetry::global::meter("tollgate"))
    }

    pub fn with_meter(meter: Meter) -> Self {
        Self {
            meter,
            counters: Mutex::new(HashMap::new()),
        }
    }

    fn counter(&self, name: &'static str) -> Counter<f64> {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters
            .entry(name)
            .or_insert_with(|| self.meter.f64_counter(name).build())
            .clone()
    }
}

impl Default for OtelCounterSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSink for OtelCounterSink {
    fn increment(&self, name: &'static str, labels: &Labels, value: f64) {
        self.counter(name).add(value, &attributes(labels));
    }
}

fn attributes(labels: &Labels) -> Vec<KeyValue> {
    labels
        .iter()
        .map(|(key, value)| KeyValue::new(*key, value.clone()))
        .collect()
}
