//! Index build pipeline.
//!
//! [`IndexPipeline`] runs the one-way build: chunk → embed → index. It
//! either returns a complete index or an error; nothing partial escapes.
//!
//! # Example
//!
//! ```rust,ignore
//! use docinsight_rag::{IndexPipeline, RagConfig, HashingEmbeddingProvider};
//!
//! let config = RagConfig::default();
//! let pipeline = IndexPipeline::from_config(&config, Arc::new(HashingEmbeddingProvider::default()))?;
//! let index = pipeline.build(&document).await?;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::{Chunker, chunker_for};
use crate::config::RagConfig;
use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{FlatIndexBuilder, IndexBuilder, VectorIndex};

/// Composes a [`Chunker`], an [`EmbeddingProvider`] and an [`IndexBuilder`].
#[derive(Clone)]
pub struct IndexPipeline {
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    index_builder: Arc<dyn IndexBuilder>,
}

impl IndexPipeline {
    /// Create a pipeline from explicit components.
    pub fn new(
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn EmbeddingProvider>,
        index_builder: Arc<dyn IndexBuilder>,
    ) -> Self {
        Self { chunker, embedder, index_builder }
    }

    /// Create a pipeline with the chunker and flat index selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] for invalid chunk sizes.
    pub fn from_config(config: &RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Ok(Self {
            chunker: chunker_for(config)?,
            embedder,
            index_builder: Arc::new(FlatIndexBuilder::new(config.metric)),
        })
    }

    /// Build a fresh index for `document`.
    ///
    /// A document with no text yields an empty index without calling the
    /// embedding provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if embedding fails or returns the
    /// wrong number of vectors, and the index builder's
    /// [`RagError::DimensionMismatch`] / [`RagError::SizeMismatch`].
    pub async fn build(&self, document: &Document) -> Result<Arc<dyn VectorIndex>> {
        // 1. Chunk the document
        let segments = self.chunker.split(document);
        if segments.is_empty() {
            info!(source = %document.source, segment_count = 0, "indexed document (empty)");
            return self.index_builder.build(Vec::new(), Vec::new());
        }

        // 2. Embed all segment texts in one batch
        let texts: Vec<&str> = segments.iter().map(|s| s.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.inspect_err(|e| {
            error!(source = %document.source, error = %e, "embedding failed during indexing");
        })?;

        if embeddings.len() != segments.len() {
            error!(
                source = %document.source,
                segments = segments.len(),
                embeddings = embeddings.len(),
                "embedding count mismatch"
            );
            return Err(RagError::embedding(
                self.embedder.name(),
                format!("returned {} vectors for {} segments", embeddings.len(), segments.len()),
            ));
        }

        // 3. Build the index
        let segment_count = segments.len();
        let index = self.index_builder.build(segments, embeddings).inspect_err(|e| {
            error!(source = %document.source, error = %e, "index build failed");
        })?;

        info!(source = %document.source, segment_count, "indexed document");
        Ok(index)
    }
}
