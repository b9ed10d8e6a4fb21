#![allow(dead_code)]

pub mod config;
pub mod mock_vendor;
pub mod server;

/// Data payloads of an SSE body, in order
pub fn sse_data(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_owned)
        .collect()
}
