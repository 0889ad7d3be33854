//! # docinsight-rag
//!
//! Question answering over a single uploaded document.
//!
//! ## Overview
//!
//! A document is loaded into text blocks, split into overlapping segments,
//! embedded and stored in an in-memory vector index. Each question is
//! embedded with the same model, the nearest segments are retrieved, and a
//! grounded prompt is sent to a chat model. Replies may contain a
//! `<think>…</think>` reasoning span, which is separated from the answer.
//!
//! - [`FileLoader`] - PDF and plain text loading
//! - [`RecursiveChunker`] / [`FixedSizeChunker`] - segmenting
//! - [`EmbeddingProvider`] - [`HashingEmbeddingProvider`] offline, `fastembed` in
//!   process, Ollama over HTTP
//! - [`VectorIndex`] - [`FlatIndex`] with cosine or euclidean scoring
//! - [`Retriever`] - top-k search with a relevance check
//! - [`assemble`] - prompt construction
//! - [`ChatModel`] / [`ChatReply`] - generation and reasoning split
//! - [`Session`] - per-user index and history
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docinsight_rag::{RagConfig, Session, load_embedding_provider};
//! use docinsight_rag::ollama::{OllamaChatModel, OllamaConfig, DEFAULT_CHAT_MODEL};
//!
//! let config = RagConfig::from_env()?;
//! let ollama = OllamaConfig::default();
//! let embedder =
//!     load_embedding_provider(&config, &ollama.base_url, ollama.request_timeout).await?;
//! let chat = Arc::new(OllamaChatModel::new(ollama, DEFAULT_CHAT_MODEL)?);
//!
//! let session = Session::builder()
//!     .config(config)
//!     .embedding_provider(embedder)
//!     .chat_model(chat)
//!     .build()?;
//!
//! session.index_document("report.pdf".as_ref()).await?;
//! println!("{}", session.ask("What is the main finding?").await?.text());
//! ```
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` (default) | Ollama embedding and chat clients |
//! | `fastembed` | In-process `all-MiniLM-L6-v2` and BGE embeddings |

pub mod chat;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod index;
pub mod loader;
#[cfg(feature = "fastembed")]
pub mod local;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod pipeline;
pub mod prompt;
pub mod reply;
pub mod retriever;
pub mod session;
pub mod upload;

pub use chat::ChatModel;
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, chunker_for};
pub use config::{ChunkingStrategy, DEFAULT_EMBEDDING_MODEL, RagConfig, RagConfigBuilder};
pub use document::{Document, SearchResult, Segment, TextBlock};
pub use embedding::{
    EmbeddingProvider, FASTEMBED_MODEL_PREFIX, HASHING_MODEL_PREFIX, load_embedding_provider,
};
pub use error::{RagError, Result};
pub use hashing::HashingEmbeddingProvider;
pub use index::{FlatIndex, FlatIndexBuilder, IndexBuilder, SimilarityMetric, VectorIndex};
pub use loader::{DocumentLoader, FileLoader, PdfLoader, TextLoader};
#[cfg(feature = "fastembed")]
pub use local::FastEmbedProvider;
#[cfg(feature = "ollama")]
pub use ollama::{OllamaChatModel, OllamaConfig, OllamaEmbeddingProvider};
pub use pipeline::IndexPipeline;
pub use prompt::{DEFAULT_SYSTEM_INSTRUCTION, Prompt, assemble, assemble_from_results};
pub use reply::ChatReply;
pub use retriever::{Retrieval, Retriever};
pub use session::{
    Answer, ChatMessage, GREETING, IndexedDocument, NO_DOCUMENT_MESSAGE,
    NO_RELEVANT_CONTENT_MESSAGE, Role, Session, SessionBuilder,
};
pub use upload::TempFileStore;
