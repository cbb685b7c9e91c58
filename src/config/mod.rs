//! Configuration management for ragline
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! The loaded `Config` is immutable: it is built once at startup and handed
//! to constructors by reference.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Qdrant collection name
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Embedding gateway configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generation gateway configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Hybrid retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Answer composer configuration
    #[serde(default)]
    pub composer: ComposerConfig,

    /// Retry policy for idempotent upstream calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Session store configuration
    #[serde(default)]
    pub session: SessionConfig,
}

/// Embedding gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the OpenAI-compatible embedding endpoint
    #[serde(default = "default_embedding_url")]
    pub url: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension; single fixed constant shared by all records in
    /// one collection, and by every query vector
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Generation gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible chat completion endpoint
    #[serde(default = "default_llm_url")]
    pub url: String,

    /// Model name/identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Maximum completion tokens
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0 - 1.0)
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Hybrid retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of results when the caller does not specify one
    #[serde(default = "default_retrieval_limit")]
    pub default_limit: usize,

    /// Maximum results a caller may request
    #[serde(default = "default_retrieval_max_limit")]
    pub max_limit: usize,

    /// Weight given to the lexical leg in score fusion (0.0 - 1.0);
    /// the vector leg receives the complement
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,

    /// Candidate pool per search leg is `oversample_factor * limit`
    #[serde(default = "default_oversample_factor")]
    pub oversample_factor: usize,

    /// Upper bound on candidates scanned for in-process lexical scoring
    #[serde(default = "default_lexical_scan_limit")]
    pub lexical_scan_limit: usize,

    /// Per-call search timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
}

impl RetrievalConfig {
    /// Vector fusion weight, complement of the lexical weight
    pub fn vector_weight(&self) -> f32 {
        1.0 - self.lexical_weight
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

/// What the composer does when retrieval produced no hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyContextPolicy {
    /// Return a deterministic insufficient-information answer without
    /// calling the LLM
    #[default]
    Static,
    /// Call the LLM with an explicit "no sources found" context marker
    CallThrough,
}

/// Answer composer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Total character budget for the grounding context block
    #[serde(default = "default_context_budget_chars")]
    pub context_budget_chars: usize,

    /// Behavior when retrieval produced no hits
    #[serde(default)]
    pub empty_context: EmptyContextPolicy,
}

/// Retry policy for idempotent upstream calls (embedding, search).
/// Generation calls are never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: usize,

    /// Base delay; doubles per attempt, with jitter
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Delay ceiling
    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Oldest turns are dropped beyond this cap
    #[serde(default = "default_session_max_turns")]
    pub max_turns: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: default_qdrant_url(),
            collection_name: default_collection_name(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            composer: ComposerConfig::default(),
            retry: RetryConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_retrieval_limit(),
            max_limit: default_retrieval_max_limit(),
            lexical_weight: default_lexical_weight(),
            oversample_factor: default_oversample_factor(),
            lexical_scan_limit: default_lexical_scan_limit(),
            search_timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            context_budget_chars: default_context_budget_chars(),
            empty_context: EmptyContextPolicy::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_session_max_turns(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.retrieval.lexical_weight) {
            return Err(Error::Config(format!(
                "retrieval.lexical_weight must be in [0.0, 1.0], got {}",
                self.retrieval.lexical_weight
            )));
        }

        if self.retrieval.oversample_factor == 0 {
            return Err(Error::Config(
                "retrieval.oversample_factor must be at least 1".to_string(),
            ));
        }

        if self.retrieval.default_limit == 0 || self.retrieval.default_limit > self.retrieval.max_limit {
            return Err(Error::Config(format!(
                "retrieval.default_limit must be in 1..={}, got {}",
                self.retrieval.max_limit, self.retrieval.default_limit
            )));
        }

        if self.composer.context_budget_chars == 0 {
            return Err(Error::Config(
                "composer.context_budget_chars must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Config(format!(
                "llm.temperature must be in [0.0, 2.0], got {}",
                self.llm.temperature
            )));
        }

        Ok(())
    }
}
