//! In-process sentence embeddings via `fastembed`.
//!
//! This module is only available when the `fastembed` feature is enabled.
//! Model weights are downloaded on first use into `FASTEMBED_CACHE_PATH`,
//! or `~/.cache/fastembed` when that is unset.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{error, info};

use crate::embedding::{EmbeddingProvider, FASTEMBED_MODEL_PREFIX};
use crate::error::{RagError, Result};

const PROVIDER: &str = "fastembed";

/// Map the part after `fastembed:` to a model and its dimensionality.
///
/// An empty name selects `all-MiniLM-L6-v2`.
pub fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    match name.trim().to_ascii_lowercase().as_str() {
        "" | "all-minilm" | "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        other => Err(RagError::ConfigError(format!("unknown fastembed model '{other}'"))),
    }
}

fn cache_dir() -> PathBuf {
    std::env::var("FASTEMBED_CACHE_PATH")
        .ok()
        .or_else(|| std::env::var("HOME").ok().map(|home| format!("{home}/.cache/fastembed")))
        .unwrap_or_else(|| ".fastembed_cache".to_string())
        .into()
}

/// Embeddings computed locally with an ONNX sentence-transformer.
pub struct FastEmbedProvider {
    model: Arc<TextEmbedding>,
    dimensions: usize,
    name: String,
}

impl FastEmbedProvider {
    /// Load the model named by `selector` (the text after `fastembed:`).
    ///
    /// Loading may download weights, so it runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// [`RagError::ConfigError`] for an unknown model name and
    /// [`RagError::EmbeddingError`] if the model cannot be initialised.
    pub async fn load(selector: &str) -> Result<Self> {
        let (model, dimensions) = resolve_model(selector)?;
        let name = format!("{FASTEMBED_MODEL_PREFIX}:{model:?}");

        let options =
            InitOptions::new(model).with_cache_dir(cache_dir()).with_show_download_progress(false);
        let text_embedding = tokio::task::spawn_blocking(move || TextEmbedding::try_new(options))
            .await
            .map_err(|e| RagError::embedding(PROVIDER, format!("model load task failed: {e}")))?
            .map_err(|e| {
                error!(model = %name, error = %e, "local embedding model failed to load");
                RagError::embedding(PROVIDER, format!("failed to initialise model: {e}"))
            })?;

        info!(model = %name, dimensions, "local embedding model ready");
        Ok(Self { model: Arc::new(text_embedding), dimensions, name })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .map_err(|e| RagError::embedding(PROVIDER, format!("embedding task failed: {e}")))?
            .map_err(|e| {
                RagError::embedding(PROVIDER, format!("failed to generate embeddings: {e}"))
            })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| RagError::embedding(PROVIDER, "model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts.iter().map(|t| t.to_string()).collect()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selector_is_all_minilm() {
        let (model, dimensions) = resolve_model("").unwrap();
        assert!(matches!(model, EmbeddingModel::AllMiniLML6V2));
        assert_eq!(dimensions, 384);
        let (model, _) = resolve_model("All-MiniLM-L6-v2").unwrap();
        assert!(matches!(model, EmbeddingModel::AllMiniLML6V2));
        assert_eq!(resolve_model("bge-base-en-v1.5").unwrap().1, 768);
    }

    #[test]
    fn unknown_model_is_a_config_error() {
        assert!(matches!(resolve_model("word2vec"), Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    #[ignore = "downloads model weights"]
    async fn embeds_with_the_reported_dimensions() {
        let provider = FastEmbedProvider::load("").await.unwrap();
        let vectors = provider.embed_batch(&["grass is green", "the sky is blue"]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == provider.dimensions()));
    }
}
