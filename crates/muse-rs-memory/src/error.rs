//! Error and warning types for the iteration store.

use thiserror::Error;

/// Errors returned by the iteration store and its sinks.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Caller passed a malformed iteration; nothing was mutated.
    #[error("validation error: {0}")]
    Validation(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors returned by embedding and reranking collaborators.
#[derive(Debug, Error)]
pub enum RankingError {
    /// Request never produced a usable response.
    #[error("transport error: {0}")]
    Transport(String),
    /// Response arrived but did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Persistence sink identifier used in warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// Per-session JSON log file.
    SessionFile,
    /// Cross-session SQLite archive.
    Archive,
}

impl Sink {
    /// Return the sink as a short lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sink::SessionFile => "session_file",
            Sink::Archive => "archive",
        }
    }
}

/// Non-fatal persistence failure surfaced alongside a successful operation.
///
/// The in-memory view stays authoritative; durability is best-effort per
/// call, so sink failures are reported instead of rolled back.
#[derive(Debug, Clone)]
pub struct PersistenceWarning {
    /// Which sink failed.
    pub sink: Sink,
    /// Human-readable failure description.
    pub message: String,
}

impl std::fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} sink: {}", self.sink.as_str(), self.message)
    }
}
