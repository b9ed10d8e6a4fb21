//! Wire format types for each vendor's API
//!
//! Pure serde structs matching the vendors' JSON. They exist only at the
//! adapter boundary; the rest of the crate works with the canonical types.

pub mod claude;
pub mod gemini;
pub mod openai;
