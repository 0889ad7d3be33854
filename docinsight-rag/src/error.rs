//! Error types for the `docinsight-rag` crate.

use thiserror::Error;

/// Errors that can occur while building an index or answering a question.
///
/// "No relevant content" is deliberately absent: it is a normal outcome of
/// retrieval, modelled by [`Retrieval::NoRelevantContent`](crate::Retrieval).
#[derive(Debug, Error)]
pub enum RagError {
    /// The source document could not be read or its text extracted.
    #[error("Load error: {0}")]
    LoadError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The embedding model is unavailable or returned malformed output.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector's length disagrees with the rest of the index.
    #[error("Dimension mismatch at position {position}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// The dimensionality established by the first vector (or the index).
        expected: usize,
        /// The dimensionality of the offending vector.
        found: usize,
        /// Index of the offending vector in its input sequence.
        position: usize,
    },

    /// Segment and embedding sequences passed to an index build differ in length.
    #[error("Size mismatch: {segments} segments but {embeddings} embeddings")]
    SizeMismatch {
        /// Number of segments supplied.
        segments: usize,
        /// Number of embeddings supplied.
        embeddings: usize,
    },

    /// The chat model could not produce an answer.
    #[error("Chat error ({provider}): {message}")]
    ChatError {
        /// The chat backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The transient on-disk copy of an upload could not be written.
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl RagError {
    /// Shorthand for [`RagError::EmbeddingError`].
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.into(), message: message.into() }
    }

    /// Shorthand for [`RagError::ChatError`].
    pub fn chat(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChatError { provider: provider.into(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
