//! Stub embedding and reranking collaborators.

use async_trait::async_trait;
use muse_rs_memory::{EmbeddingProvider, RankedIndex, RankingError, Reranker};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Embedder returning a fixed vector and counting invocations.
pub struct StaticEmbedder {
    embedding: Vec<f32>,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    /// Create an embedder that always returns `embedding`.
    pub fn new(embedding: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            embedding,
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of embed calls observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RankingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.embedding.clone())
    }
}

/// Reranker scoring documents by query-keyword occurrences, counting
/// invocations. Deterministic: equal scores keep submission order.
pub struct KeywordReranker {
    calls: AtomicUsize,
}

impl KeywordReranker {
    /// Create a keyword reranker.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of rerank calls observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reranker for KeywordReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
    ) -> Result<Vec<RankedIndex>, RankingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut ranked: Vec<RankedIndex> = documents
            .iter()
            .enumerate()
            .map(|(index, document)| RankedIndex {
                index,
                relevance_score: query
                    .split_whitespace()
                    .filter(|word| document.contains(word))
                    .count() as f32,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        Ok(ranked)
    }
}

/// Reranker that always fails, for degraded-retrieval tests.
pub struct FailingReranker;

impl FailingReranker {
    /// Create a failing reranker.
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl Reranker for FailingReranker {
    async fn rerank(
        &self,
        _query: &str,
        _documents: &[String],
    ) -> Result<Vec<RankedIndex>, RankingError> {
        Err(RankingError::Transport(
            "reranker unavailable".to_string(),
        ))
    }
}
