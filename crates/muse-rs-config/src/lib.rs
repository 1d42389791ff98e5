//! Configuration models and file loading for Muse.
//!
//! This crate owns the config schema, defaults, and json5 file parsing
//! used by the binary and SDK consumers.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Configuration schema models.
pub use model::*;
