//! Error types for the core crate.

use crate::gateway::GatewayError;
use thiserror::Error;

/// Errors returned by agent operations.
#[derive(Debug, Error)]
pub enum MuseCoreError {
    /// Completion endpoint failure.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    /// Iteration store failure.
    #[error("memory error: {0}")]
    Memory(String),
    /// Response could not be interpreted at all.
    #[error("parse error: {0}")]
    Parse(String),
}
