use indexmap::IndexMap;

/// Label set attached to a counter increment, in insertion order
pub type Labels = IndexMap<&'static str, String>;

/// Sink for usage counters (call counts, accumulated cost)
pub trait CounterSink: Send + Sync {
    /// Add `value` to the counter `name` under the given labels
    fn increment(&self, name: &'static str, labels: &Labels, value: f64);
}

/// Counter incremented once per served completion
pub const LLM_CALLS: &str = "llm.calls";

/// Counter accumulating completion cost in USD
pub const LLM_COST: &str = "llm.cost";
