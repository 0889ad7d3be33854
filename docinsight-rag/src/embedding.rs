//! Embedding provider trait for generating vector embeddings from text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::hashing::HashingEmbeddingProvider;

/// Model-name prefix selecting the local [`HashingEmbeddingProvider`].
pub const HASHING_MODEL_PREFIX: &str = "hashing";

/// Model-name prefix selecting in-process `fastembed` embeddings.
pub const FASTEMBED_MODEL_PREFIX: &str = "fastembed";

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. Every vector returned by one provider instance has
/// [`dimensions()`](EmbeddingProvider::dimensions) entries, and identical
/// input text yields identical vectors.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch) implementation
/// calls [`embed`](EmbeddingProvider::embed) sequentially; backends that
/// support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use docinsight_rag::{EmbeddingProvider, HashingEmbeddingProvider};
///
/// let provider = HashingEmbeddingProvider::new(64)?;
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Return the model name, for logs and error messages.
    fn name(&self) -> &str;
}

/// Resolve `config.embedding_model_name` to a ready provider.
///
/// - `hashing` or `hashing:<dims>` selects the local [`HashingEmbeddingProvider`].
/// - `fastembed` or `fastembed:<model>` runs a sentence-transformer in
///   process (needs the `fastembed` feature).
/// - Any other name is looked up on the Ollama server at `ollama_url`, with
///   `request_timeout` applied to every request. The model is probed once so
///   an unreachable server or unknown model fails here rather than halfway
///   through an index build.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] for a malformed selector or a backend
/// whose feature is disabled, and [`RagError::EmbeddingError`] if the model
/// cannot be loaded.
pub async fn load_embedding_provider(
    config: &RagConfig,
    ollama_url: &str,
    request_timeout: Duration,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let name = config.embedding_model_name.trim();

    if let Some(rest) = name.strip_prefix(HASHING_MODEL_PREFIX) {
        let dimensions = match rest.strip_prefix(':') {
            Some(dims) => dims.parse().map_err(|_| {
                RagError::ConfigError(format!("invalid hashing dimensions in '{name}'"))
            })?,
            None if rest.is_empty() => HashingEmbeddingProvider::DEFAULT_DIMENSIONS,
            None => return load_remote(name, ollama_url, request_timeout).await,
        };
        info!(model = name, dimensions, "using local hashing embeddings");
        return Ok(Arc::new(HashingEmbeddingProvider::new(dimensions)?));
    }

    if let Some(rest) = name.strip_prefix(FASTEMBED_MODEL_PREFIX) {
        match rest.strip_prefix(':') {
            Some(model) => return load_local(model).await,
            None if rest.is_empty() => return load_local("").await,
            None => {}
        }
    }

    load_remote(name, ollama_url, request_timeout).await
}

#[cfg(feature = "fastembed")]
async fn load_local(model: &str) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(crate::local::FastEmbedProvider::load(model).await?))
}

#[cfg(not(feature = "fastembed"))]
async fn load_local(model: &str) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(RagError::ConfigError(format!(
        "embedding model '{FASTEMBED_MODEL_PREFIX}:{model}' needs the `fastembed` feature"
    )))
}

#[cfg(feature = "ollama")]
async fn load_remote(
    name: &str,
    ollama_url: &str,
    request_timeout: Duration,
) -> Result<Arc<dyn EmbeddingProvider>> {
    use crate::ollama::{OllamaConfig, OllamaEmbeddingProvider};

    let config = OllamaConfig::new(ollama_url).with_timeout(request_timeout);
    let provider = OllamaEmbeddingProvider::connect(config, name).await?;
    info!(model = name, dimensions = provider.dimensions(), "embedding model ready");
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "ollama"))]
async fn load_remote(
    name: &str,
    _ollama_url: &str,
    _request_timeout: Duration,
) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(RagError::ConfigError(format!(
        "embedding model '{name}' needs the `ollama` feature; use '{HASHING_MODEL_PREFIX}' instead"
    )))
}
