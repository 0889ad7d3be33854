//! Immutable vector index with exact nearest-neighbour search.
//!
//! An index is produced once by an [`IndexBuilder`] from parallel sequences of
//! segments and embeddings and is never mutated afterwards. Replacing the
//! document means building a fresh index and swapping the `Arc`.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{SearchResult, Segment};
use crate::error::{RagError, Result};

/// How two vectors are compared. Scores are always "higher is more similar".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine similarity in `[-1, 1]`. Zero-magnitude vectors score 0.
    #[default]
    Cosine,
    /// Negated Euclidean (L2) distance; an exact match scores 0.
    Euclidean,
}

impl FromStr for SimilarityMetric {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            other => Err(RagError::ConfigError(format!("unknown similarity metric '{other}'"))),
        }
    }
}

/// A read-only, searchable set of (segment, vector) pairs.
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` segments most similar to `query`, best first.
    ///
    /// Equal scores keep insertion order. An empty index, or `k == 0`,
    /// yields an empty `Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if `query` has a different
    /// length than the stored vectors.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Number of stored segments.
    fn len(&self) -> usize;

    /// Return `true` if the index holds no segments.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality of the stored vectors, or `None` for an empty index.
    fn dimensions(&self) -> Option<usize>;
}

/// Constructs a [`VectorIndex`] backend from segments and their embeddings.
pub trait IndexBuilder: Send + Sync {
    /// Build an index from parallel sequences of equal length.
    ///
    /// # Errors
    ///
    /// - [`RagError::SizeMismatch`] if the sequences differ in length.
    /// - [`RagError::DimensionMismatch`] if the vectors are not all the same,
    ///   non-zero length.
    fn build(
        &self,
        segments: Vec<Segment>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Arc<dyn VectorIndex>>;
}

/// Builder for [`FlatIndex`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatIndexBuilder {
    metric: SimilarityMetric,
}

impl FlatIndexBuilder {
    /// Create a builder using the given metric.
    pub fn new(metric: SimilarityMetric) -> Self {
        Self { metric }
    }
}

impl IndexBuilder for FlatIndexBuilder {
    fn build(
        &self,
        segments: Vec<Segment>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Arc<dyn VectorIndex>> {
        Ok(Arc::new(FlatIndex::build(segments, embeddings, self.metric)?))
    }
}

/// Brute-force index scoring every stored vector on each search.
///
/// For cosine similarity the stored vectors are normalized once at build time.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    entries: Vec<(Segment, Vec<f32>)>,
    dimensions: Option<usize>,
    metric: SimilarityMetric,
}

impl FlatIndex {
    /// Build an index. See [`IndexBuilder::build`] for the failure modes.
    pub fn build(
        segments: Vec<Segment>,
        embeddings: Vec<Vec<f32>>,
        metric: SimilarityMetric,
    ) -> Result<Self> {
        if segments.len() != embeddings.len() {
            return Err(RagError::SizeMismatch {
                segments: segments.len(),
                embeddings: embeddings.len(),
            });
        }

        let dimensions = embeddings.first().map(Vec::len);
        if let Some(expected) = dimensions {
            for (position, vector) in embeddings.iter().enumerate() {
                if vector.len() != expected || vector.is_empty() {
                    return Err(RagError::DimensionMismatch {
                        expected: expected.max(1),
                        found: vector.len(),
                        position,
                    });
                }
            }
        }

        let entries = segments
            .into_iter()
            .zip(embeddings)
            .map(|(segment, vector)| match metric {
                SimilarityMetric::Cosine => (segment, normalized(vector)),
                SimilarityMetric::Euclidean => (segment, vector),
            })
            .collect::<Vec<_>>();

        debug!(entries = entries.len(), ?dimensions, ?metric, "built flat index");
        Ok(Self { entries, dimensions, metric })
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let Some(dimensions) = self.dimensions else {
            return Ok(Vec::new());
        };
        if query.len() != dimensions {
            return Err(RagError::DimensionMismatch {
                expected: dimensions,
                found: query.len(),
                position: 0,
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = match self.metric {
            SimilarityMetric::Cosine => {
                let query = normalized(query.to_vec());
                self.entries.iter().map(|(_, v)| dot(v, &query)).enumerate().collect()
            }
            SimilarityMetric::Euclidean => {
                self.entries.iter().map(|(_, v)| -euclidean(v, query)).enumerate().collect()
            }
        };

        // Stable sort: equal scores stay in insertion order.
        scored.iter_mut().for_each(|(_, score)| *score = sortable(*score));
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult { segment: self.entries[i].0.clone(), score })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}

/// Map NaN below every real score and fold `-0.0` into `0.0` so that
/// `total_cmp` treats equal scores as ties.
fn sortable(score: f32) -> f32 {
    if score.is_nan() { f32::NEG_INFINITY } else { score + 0.0 }
}

/// Scale to unit length. Zero vectors are returned unchanged.
fn normalized(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
    vector
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}
