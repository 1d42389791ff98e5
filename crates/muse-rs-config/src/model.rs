//! Configuration schema for Muse.

use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Root config for the Muse loop.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MuseConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl MuseConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> MuseConfigBuilder {
        MuseConfigBuilder::new()
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.max_size == 0 {
            return Err(ConfigError::Invalid(
                "memory.max_size must be at least 1".to_string(),
            ));
        }
        if self.memory.recall_k == 0 {
            return Err(ConfigError::Invalid(
                "memory.recall_k must be at least 1".to_string(),
            ));
        }
        if self.gateway.url.is_empty() {
            return Err(ConfigError::Invalid(
                "gateway.url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for assembling a `MuseConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct MuseConfigBuilder {
    config: MuseConfig,
}

impl MuseConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: MuseConfig::default(),
        }
    }

    /// Replace the completion gateway configuration.
    pub fn gateway(mut self, gateway: GatewayConfig) -> Self {
        self.config.gateway = gateway;
        self
    }

    /// Replace the per-agent model configuration.
    pub fn models(mut self, models: ModelsConfig) -> Self {
        self.config.models = models;
        self
    }

    /// Replace the ranking collaborator configuration.
    pub fn ranking(mut self, ranking: RankingConfig) -> Self {
        self.config.ranking = ranking;
        self
    }

    /// Replace the memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Finalize and return the built `MuseConfig`.
    pub fn build(self) -> MuseConfig {
        self.config
    }
}

/// Completion endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Chat-completions endpoint URL.
    #[serde(default = "default_gateway_url")]
    pub url: String,
    /// Environment variable holding the bearer key.
    #[serde(default = "default_gateway_key_env")]
    pub api_key_env: String,
    /// Sampling temperature for completion requests.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            api_key_env: default_gateway_key_env(),
            temperature: default_temperature(),
        }
    }
}

impl GatewayConfig {
    /// Resolve the bearer key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

fn default_gateway_url() -> String {
    "https://api.perplexity.ai/chat/completions".to_string()
}

fn default_gateway_key_env() -> String {
    "PERPLEXITY_API_KEY".to_string()
}

fn default_temperature() -> f64 {
    0.1
}

/// Model identifiers for the three agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_creator_model")]
    pub creator: String,
    #[serde(default = "default_evaluator_model")]
    pub evaluator: String,
    #[serde(default = "default_feedback_model")]
    pub feedback: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            creator: default_creator_model(),
            evaluator: default_evaluator_model(),
            feedback: default_feedback_model(),
        }
    }
}

fn default_creator_model() -> String {
    "llama-3-sonar-large-32k-online".to_string()
}

fn default_evaluator_model() -> String {
    "llama-3-sonar-large-32k-online".to_string()
}

fn default_feedback_model() -> String {
    "llama-3-sonar-large-32k-chat".to_string()
}

/// Embedding/reranking collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// API root for the `/embed` and `/rerank` endpoints.
    #[serde(default = "default_ranking_url")]
    pub base_url: String,
    /// Environment variable holding the bearer key.
    #[serde(default = "default_ranking_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_rerank_model")]
    pub rerank_model: String,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            base_url: default_ranking_url(),
            api_key_env: default_ranking_key_env(),
            embed_model: default_embed_model(),
            rerank_model: default_rerank_model(),
        }
    }
}

impl RankingConfig {
    /// Resolve the bearer key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

fn default_ranking_url() -> String {
    "https://api.cohere.com/v2".to_string()
}

fn default_ranking_key_env() -> String {
    "COHERE_API_KEY".to_string()
}

fn default_embed_model() -> String {
    "embed-english-v3.0".to_string()
}

fn default_rerank_model() -> String {
    "rerank-english-v3.0".to_string()
}

/// Iteration store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Bound on the in-memory recency window.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Directory for session log files.
    #[serde(default = "default_memory_dir")]
    pub dir: String,
    /// Path of the SQLite archive; defaults to `<dir>/iterations.sqlite3`.
    #[serde(default)]
    pub archive_path: Option<String>,
    /// Number of past iterations fetched by relevance retrieval.
    #[serde(default = "default_recall_k")]
    pub recall_k: usize,
    /// Scores below this are treated as needing attention.
    #[serde(default = "default_low_score_threshold")]
    pub low_score_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            dir: default_memory_dir(),
            archive_path: None,
            recall_k: default_recall_k(),
            low_score_threshold: default_low_score_threshold(),
        }
    }
}

impl MemoryConfig {
    /// Resolved archive path.
    pub fn archive_path(&self) -> std::path::PathBuf {
        match &self.archive_path {
            Some(path) => std::path::PathBuf::from(path),
            None => std::path::Path::new(&self.dir).join("iterations.sqlite3"),
        }
    }
}

fn default_max_size() -> usize {
    100
}

fn default_memory_dir() -> String {
    "memory".to_string()
}

fn default_recall_k() -> usize {
    5
}

fn default_low_score_threshold() -> f64 {
    7.0
}

#[cfg(test)]
mod tests {
    use super::{MemoryConfig, MuseConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_shipped_settings() {
        let config = MuseConfig::default();
        assert_eq!(config.memory.max_size, 100);
        assert_eq!(config.memory.recall_k, 5);
        assert_eq!(config.memory.low_score_threshold, 7.0);
        assert_eq!(config.gateway.temperature, 0.1);
        assert_eq!(config.models.feedback, "llama-3-sonar-large-32k-chat");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn archive_path_defaults_under_the_memory_dir() {
        let memory = MemoryConfig::default();
        assert_eq!(
            memory.archive_path(),
            std::path::Path::new("memory").join("iterations.sqlite3")
        );

        let explicit = MemoryConfig {
            archive_path: Some("/tmp/muse.sqlite3".to_string()),
            ..MemoryConfig::default()
        };
        assert_eq!(
            explicit.archive_path(),
            std::path::PathBuf::from("/tmp/muse.sqlite3")
        );
    }

    #[test]
    fn zero_window_fails_validation() {
        let config = MuseConfig::builder()
            .memory(MemoryConfig {
                max_size: 0,
                ..MemoryConfig::default()
            })
            .build();
        assert!(config.validate().is_err());
    }
}
