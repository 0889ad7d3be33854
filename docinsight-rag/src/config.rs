//! Configuration for the indexing and retrieval pipeline.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::index::SimilarityMetric;

/// Name of the embedding model used when none is configured.
///
/// `all-minilm` is the Ollama name of `sentence-transformers/all-MiniLM-L6-v2`.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

const ENV_PREFIX: &str = "DOCINSIGHT_";

/// How documents are cut into segments.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Prefer paragraph, line, sentence and word boundaries.
    #[default]
    Recursive,
    /// Exact sliding character windows.
    FixedSize,
}

impl FromStr for ChunkingStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recursive" => Ok(Self::Recursive),
            "fixed" | "fixed_size" | "fixed-size" => Ok(Self::FixedSize),
            other => Err(RagError::ConfigError(format!("unknown chunking strategy '{other}'"))),
        }
    }
}

/// Configuration parameters for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum segment size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive segments.
    pub chunk_overlap: usize,
    /// Number of segments retrieved per query.
    pub top_k: usize,
    /// Minimum similarity score for retrieved segments. `None` keeps every hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
    /// Segmentation strategy.
    #[serde(default)]
    pub chunking: ChunkingStrategy,
    /// Similarity metric used by the vector index.
    #[serde(default)]
    pub metric: SimilarityMetric,
    /// Embedding model selector, e.g. `all-minilm` or `hashing:384`.
    pub embedding_model_name: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 3,
            similarity_threshold: None,
            chunking: ChunkingStrategy::default(),
            metric: SimilarityMetric::default(),
            embedding_model_name: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a validated config from `DOCINSIGHT_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::builder_from_lookup(lookup)?.build()
    }

    /// A builder preloaded with the `DOCINSIGHT_*` variables read through
    /// `lookup`.
    ///
    /// Values are parsed but not checked against each other, so callers can
    /// layer further overrides before [`RagConfigBuilder::build`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] for a value that does not parse.
    pub fn builder_from_lookup<F>(lookup: F) -> Result<RagConfigBuilder>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut builder = Self::builder();

        if let Some(value) = var("CHUNK_SIZE") {
            builder = builder.chunk_size(parse_var("CHUNK_SIZE", &value)?);
        }
        if let Some(value) = var("CHUNK_OVERLAP") {
            builder = builder.chunk_overlap(parse_var("CHUNK_OVERLAP", &value)?);
        }
        if let Some(value) = var("TOP_K") {
            builder = builder.top_k(parse_var("TOP_K", &value)?);
        }
        if let Some(value) = var("SIMILARITY_THRESHOLD") {
            builder = builder.similarity_threshold(parse_var("SIMILARITY_THRESHOLD", &value)?);
        }
        if let Some(value) = var("CHUNKING") {
            builder = builder.chunking(value.parse()?);
        }
        if let Some(value) = var("METRIC") {
            builder = builder.metric(value.parse()?);
        }
        if let Some(value) = var("EMBEDDING_MODEL") {
            builder = builder.embedding_model_name(value);
        }

        Ok(builder)
    }

    /// Check that the parameters are mutually consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `embedding_model_name` is blank
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.embedding_model_name.trim().is_empty() {
            return Err(RagError::ConfigError("embedding_model_name must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        RagError::ConfigError(format!("invalid value '{value}' for {ENV_PREFIX}{name}: {e}"))
    })
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum segment size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive segments in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of segments retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for retrieved segments.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the segmentation strategy.
    pub fn chunking(mut self, strategy: ChunkingStrategy) -> Self {
        self.config.chunking = strategy;
        self
    }

    /// Set the similarity metric of the vector index.
    pub fn metric(mut self, metric: SimilarityMetric) -> Self {
        self.config.metric = metric;
        self
    }

    /// Set the embedding model selector.
    pub fn embedding_model_name(mut self, name: impl Into<String>) -> Self {
        self.config.embedding_model_name = name.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
