//! Query-time retrieval: embed the question, search the index.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;

/// Outcome of a retrieval.
#[derive(Debug, Clone)]
pub enum Retrieval {
    /// Ranked results, best first. Never empty.
    Relevant(Vec<SearchResult>),
    /// Nothing usable was found: the result set was empty or its best hit
    /// had no text. Callers answer with a fallback instead of asking the
    /// chat model with an empty context.
    NoRelevantContent,
}

impl Retrieval {
    /// The ranked results, or an empty slice for [`Retrieval::NoRelevantContent`].
    pub fn results(&self) -> &[SearchResult] {
        match self {
            Self::Relevant(results) => results,
            Self::NoRelevantContent => &[],
        }
    }

    /// Return `true` for [`Retrieval::NoRelevantContent`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoRelevantContent)
    }
}

/// Embeds queries and searches a [`VectorIndex`].
///
/// Holds no reference to any index, so one retriever serves every index a
/// session builds and may be shared across concurrent queries.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    similarity_threshold: Option<f32>,
}

impl Retriever {
    /// Create a retriever with `top_k` and threshold taken from `config`.
    pub fn from_config(embedder: Arc<dyn EmbeddingProvider>, config: &RagConfig) -> Self {
        Self { embedder, top_k: config.top_k, similarity_threshold: config.similarity_threshold }
    }

    /// Drop results scoring below `threshold`.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    /// Retrieve the configured `top_k` segments most similar to `query`.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures and index dimension mismatches.
    pub async fn retrieve(&self, index: &dyn VectorIndex, query: &str) -> Result<Retrieval> {
        self.retrieve_with_k(index, query, self.top_k).await
    }

    /// Like [`retrieve`](Self::retrieve) with a one-off `k`.
    pub async fn retrieve_with_k(
        &self,
        index: &dyn VectorIndex,
        query: &str,
        k: usize,
    ) -> Result<Retrieval> {
        if index.is_empty() || k == 0 {
            debug!(k, index_len = index.len(), "nothing to search");
            return Ok(Retrieval::NoRelevantContent);
        }

        let query_embedding = self.embedder.embed(query).await.inspect_err(|e| {
            error!(model = self.embedder.name(), error = %e, "query embedding failed");
        })?;

        let mut results = index.search(&query_embedding, k)?;
        if let Some(threshold) = self.similarity_threshold {
            results.retain(|r| r.score >= threshold);
        }

        let usable = results.first().is_some_and(|top| !top.segment.content.trim().is_empty());
        info!(result_count = results.len(), usable, "retrieval completed");

        Ok(if usable { Retrieval::Relevant(results) } else { Retrieval::NoRelevantContent })
    }
}
