//! Shared helpers.
//!
//! - [`trigram`] - 3-byte sequence extraction for indexing
//! - [`progress`] - terminal progress bars, no-op without the `progress` feature

pub mod progress;
pub mod trigram;

pub use trigram::*;
