//! In-process admission control
//!
//! Token buckets keyed by API key and by traced end customer, held in a
//! single registry with periodic eviction of idle entries.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod admission;
mod error;
mod registry;

pub use admission::{AdmissionControl, Scope};
pub use error::RateLimitError;
pub use registry::{Denied, LimiterRegistry};
