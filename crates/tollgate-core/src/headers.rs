//! Header names understood by the gateway

use http::HeaderMap;

/// Caller credential: an internal gateway key or a raw vendor key
pub const KEY: &str = "key";

/// Optional end-customer id used for per-user rate limits and usage labels
pub const TRACE_CUSTOMER_ID: &str = "tollgate-trace-customer-id";

/// Optional session id attached to usage labels
pub const TRACE_SESSION_ID: &str = "tollgate-session-id";

/// Response header carrying the computed cost of the call
pub const LLM_COST: &str = "llm-cost";

/// Response header carrying upstream latency in nanoseconds
pub const LLM_LATENCY_NS: &str = "llm-latency-ns";

/// Read a header as trimmed, non-empty text
pub fn text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}
