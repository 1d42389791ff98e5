//! Agents, criteria, and hosted-service clients for the Muse loop.
//!
//! The iteration store lives in `muse-rs-memory`; this crate builds the
//! prompts around it, talks to the completion endpoint, and parses model
//! responses back into structured records.

pub mod agents;
pub mod criteria;
pub mod error;
pub mod gateway;
pub mod ranking;
pub mod types;

/// Agent prompt builders.
pub use agents::{ContentCreator, Evaluator, FeedbackSynthesizer};
/// Evaluation criteria schema.
pub use criteria::{Criterion, CriteriaTable};
/// Core error type.
pub use error::MuseCoreError;
/// Completion endpoint interface and HTTP implementation.
pub use gateway::{CompletionGateway, GatewayError, HttpCompletionGateway};
/// Embedding/reranking HTTP client.
pub use ranking::HttpRankingClient;
/// Chat message types.
pub use types::{ChatMessage, Role};
