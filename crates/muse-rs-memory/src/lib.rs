//! Iteration memory for the Muse content loop.
//!
//! Records every generate/evaluate/rate cycle, keeps a bounded in-memory
//! recency window per session, persists the full log to a session file and
//! a cross-session SQLite archive, and retrieves past iterations by
//! relevance to a query via an injected reranking collaborator.

pub mod archive;
pub mod error;
pub mod model;
pub mod rank;
pub mod session_file;
pub mod store;

/// Memory error and warning types.
pub use error::{MemoryError, PersistenceWarning, RankingError, Sink};
/// Iteration record model.
pub use model::{
    CriterionAssessment, Evaluation, FeedbackReport, FeedbackSynthesis, Iteration, UserEvaluation,
};
/// Ranking collaborator interfaces.
pub use rank::{EmbeddingProvider, RankedIndex, RankedIteration, Reranker};
/// Cross-session SQLite archive.
pub use archive::{ArchivedIteration, SqliteArchive};
/// Session file sink.
pub use session_file::SessionFileSink;
/// The iteration store and its projections.
pub use store::{AppendRequest, Appended, CreatorContext, EvaluatorContext, IterationStore, StoreOptions};
