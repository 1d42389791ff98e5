//! Deterministic stubs for Muse tests: a canned completion gateway and
//! counting embedding/reranking collaborators.

mod gateway;
mod ranking;

pub use gateway::{FixedGateway, RecordingGateway};
pub use ranking::{FailingReranker, KeywordReranker, StaticEmbedder};
