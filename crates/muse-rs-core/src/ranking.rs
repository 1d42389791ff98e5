//! HTTP client for the embedding/reranking collaborator.

use async_trait::async_trait;
use log::debug;
use muse_rs_memory::{EmbeddingProvider, RankedIndex, RankingError, Reranker};
use serde_json::{Value, json};

/// Client for a Cohere-style `/embed` + `/rerank` JSON API.
///
/// The ranking service is a black box: this client only moves text in and
/// index permutations out.
pub struct HttpRankingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    embed_model: String,
    rerank_model: String,
}

impl HttpRankingClient {
    /// Create a client for the given API root and bearer key.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        embed_model: impl Into<String>,
        rerank_model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            embed_model: embed_model.into(),
            rerank_model: rerank_model.into(),
        }
    }

    /// POST a JSON payload and return the decoded body.
    async fn post(&self, path: &str, payload: &Value) -> Result<Value, RankingError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| RankingError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RankingError::Transport(format!(
                "{url} returned status {status}"
            )));
        }
        response
            .json()
            .await
            .map_err(|err| RankingError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpRankingClient {
    /// Embed one text into a vector of floats.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RankingError> {
        let payload = json!({
            "model": self.embed_model,
            "texts": [text],
        });
        let body = self.post("/embed", &payload).await?;
        let embedding = extract_embedding(&body)?;
        debug!(
            "embedded text (model={}, dimensions={})",
            self.embed_model,
            embedding.len()
        );
        Ok(embedding)
    }
}

#[async_trait]
impl Reranker for HttpRankingClient {
    /// Rank documents against a query, most relevant first.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
    ) -> Result<Vec<RankedIndex>, RankingError> {
        let payload = json!({
            "model": self.rerank_model,
            "query": query,
            "documents": documents,
        });
        let body = self.post("/rerank", &payload).await?;
        let ranked = extract_ranking(&body, documents.len())?;
        debug!(
            "reranked documents (model={}, documents={}, returned={})",
            self.rerank_model,
            documents.len(),
            ranked.len()
        );
        Ok(ranked)
    }
}

/// Pull the first embedding vector out of an `/embed` response body.
fn extract_embedding(body: &Value) -> Result<Vec<f32>, RankingError> {
    let vector = body
        .get("embeddings")
        .and_then(Value::as_array)
        .and_then(|embeddings| embeddings.first())
        .and_then(Value::as_array)
        .ok_or_else(|| RankingError::Malformed("no embeddings[0] array".to_string()))?;
    vector
        .iter()
        .map(|value| {
            value
                .as_f64()
                .map(|value| value as f32)
                .ok_or_else(|| RankingError::Malformed("non-numeric embedding value".to_string()))
        })
        .collect()
}

/// Pull the ranked index permutation out of a `/rerank` response body.
fn extract_ranking(body: &Value, document_count: usize) -> Result<Vec<RankedIndex>, RankingError> {
    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| RankingError::Malformed("no results array".to_string()))?;

    let mut ranked = Vec::with_capacity(results.len());
    for result in results {
        let index = result
            .get("index")
            .and_then(Value::as_u64)
            .ok_or_else(|| RankingError::Malformed("result without index".to_string()))?
            as usize;
        if index >= document_count {
            return Err(RankingError::Malformed(format!(
                "index {index} out of range for {document_count} documents"
            )));
        }
        let relevance_score = result
            .get("relevance_score")
            .and_then(Value::as_f64)
            .ok_or_else(|| RankingError::Malformed("result without relevance_score".to_string()))?
            as f32;
        ranked.push(RankedIndex {
            index,
            relevance_score,
        });
    }
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::{extract_embedding, extract_ranking};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn extracts_embedding_vector() {
        let body = json!({"embeddings": [[0.5, -1.0, 2.0]]});
        assert_eq!(
            extract_embedding(&body).expect("embedding"),
            vec![0.5, -1.0, 2.0]
        );
    }

    #[test]
    fn rejects_malformed_embedding_bodies() {
        assert!(extract_embedding(&json!({})).is_err());
        assert!(extract_embedding(&json!({"embeddings": []})).is_err());
        assert!(extract_embedding(&json!({"embeddings": [["x"]]})).is_err());
    }

    #[test]
    fn extracts_ranked_indexes_in_order() {
        let body = json!({"results": [
            {"index": 2, "relevance_score": 0.9},
            {"index": 0, "relevance_score": 0.4}
        ]});
        let ranked = extract_ranking(&body, 3).expect("ranking");
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].index, 2);
        assert_eq!(ranked[1].index, 0);
        assert!(ranked[0].relevance_score > ranked[1].relevance_score);
    }

    #[test]
    fn rejects_out_of_range_indexes() {
        let body = json!({"results": [{"index": 5, "relevance_score": 0.9}]});
        assert!(extract_ranking(&body, 3).is_err());
    }
}
