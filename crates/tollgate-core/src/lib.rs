//! Shared types for the Tollgate gateway crates
//!
//! Holds the pieces every layer agrees on: the HTTP error contract, the
//! per-request caller context, resolved key details, and the counter sink
//! used for usage accounting.

#![allow(clippy::must_use_candidate)]

mod context;
mod error;
pub mod headers;
mod key;
pub mod usage;

pub use context::RequestContext;
pub use error::{HttpError, error_body};
pub use key::KeyDetails;
pub use usage::{CounterSink, Labels};
