//! Ranking collaborator interfaces used by relevance retrieval.

use crate::archive::ArchivedIteration;
use crate::error::RankingError;
use async_trait::async_trait;

/// Produces a fixed-length vector for a piece of text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text into a vector of floats.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RankingError>;
}

/// Ranks documents against a query.
///
/// Ranking quality is entirely the collaborator's responsibility; the
/// store only guarantees that returned indexes map back to the submitted
/// document list.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rank `documents` against `query`, most relevant first.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
    ) -> Result<Vec<RankedIndex>, RankingError>;
}

/// One entry of a reranker result permutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedIndex {
    /// Index into the submitted document list.
    pub index: usize,
    /// Relevance of that document to the query.
    pub relevance_score: f32,
}

/// An archived iteration paired with its relevance to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedIteration {
    /// The re-hydrated archive record.
    pub record: ArchivedIteration,
    /// Relevance reported by the reranker.
    pub relevance_score: f32,
}
