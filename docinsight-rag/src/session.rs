//! Per-user session: the current index plus the visible chat history.
//!
//! A [`Session`] is the explicit context every pipeline call runs against.
//! It is created when the user starts, its index is replaced atomically on
//! each upload, and [`Session::close`] tears it down.
//!
//! # Example
//!
//! ```rust,ignore
//! use docinsight_rag::{Session, RagConfig};
//!
//! let session = Session::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder)
//!     .chat_model(chat)
//!     .build()?;
//!
//! session.upload(&pdf_bytes, "report.pdf").await?;
//! let answer = session.ask("What is the conclusion?").await?;
//! println!("{}", answer.text());
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::chat::ChatModel;
use crate::chunking::{Chunker, chunker_for};
use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{FlatIndexBuilder, IndexBuilder, VectorIndex};
use crate::loader::{DocumentLoader, FileLoader};
use crate::pipeline::IndexPipeline;
use crate::prompt::{DEFAULT_SYSTEM_INSTRUCTION, assemble_from_results};
use crate::reply::{ChatReply, is_zero};
use crate::retriever::{Retrieval, Retriever};
use crate::upload::TempFileStore;

/// First assistant message of every session.
pub const GREETING: &str = "Upload a document and ask me anything about its content!";

/// Answer given when retrieval finds nothing usable.
pub const NO_RELEVANT_CONTENT_MESSAGE: &str =
    "I couldn't find anything relevant. Try asking a different question.";

/// Answer given when a question arrives before any document.
pub const NO_DOCUMENT_MESSAGE: &str = "Please upload a document before asking questions.";

/// Who wrote a history entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking.
    User,
    /// DocInsight.
    Assistant,
}

/// One entry of the visible chat history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Author of the message.
    pub role: Role,
    /// Text to display.
    pub content: String,
    /// Reasoning span of an assistant reply, kept apart for rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Byte offset in `content` where the reasoning span sat.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub reasoning_at: usize,
}

impl ChatMessage {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), reasoning: None, reasoning_at: 0 }
    }

    /// An assistant message without reasoning.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), reasoning: None, reasoning_at: 0 }
    }

    /// An assistant message from a model reply.
    pub fn from_reply(reply: &ChatReply) -> Self {
        Self {
            role: Role::Assistant,
            content: reply.visible_answer.clone(),
            reasoning: reply.reasoning.clone(),
            reasoning_at: reply.reasoning_at,
        }
    }

    /// The message as a [`ChatReply`]; `to_raw()` on it gives the model's original text.
    pub fn to_reply(&self) -> ChatReply {
        ChatReply {
            reasoning: self.reasoning.clone(),
            visible_answer: self.content.clone(),
            reasoning_at: self.reasoning_at,
        }
    }
}

/// Result of [`Session::ask`].
#[derive(Debug, Clone)]
pub enum Answer {
    /// The chat model answered from retrieved segments.
    Grounded {
        /// The model's reply.
        reply: ChatReply,
        /// Segments the prompt was grounded on, best first.
        sources: Vec<SearchResult>,
    },
    /// Retrieval found nothing usable; no model call was made.
    NoRelevantContent,
    /// No document has been indexed yet.
    NoDocument,
}

impl Answer {
    /// Text to show the user.
    pub fn text(&self) -> &str {
        match self {
            Self::Grounded { reply, .. } => reply.answer_text(),
            Self::NoRelevantContent => NO_RELEVANT_CONTENT_MESSAGE,
            Self::NoDocument => NO_DOCUMENT_MESSAGE,
        }
    }

    fn to_message(&self) -> ChatMessage {
        match self {
            Self::Grounded { reply, .. } => ChatMessage::from_reply(reply),
            other => ChatMessage::assistant(other.text()),
        }
    }
}

/// Summary of a successful index build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDocument {
    /// Document source name.
    pub source: String,
    /// Number of text blocks (pages) loaded.
    pub blocks: usize,
    /// Number of segments in the new index.
    pub segments: usize,
}

/// Session state and the components that act on it.
pub struct Session {
    pipeline: IndexPipeline,
    retriever: Retriever,
    chat_model: Arc<dyn ChatModel>,
    loader: Arc<dyn DocumentLoader>,
    uploads: TempFileStore,
    system_instruction: String,
    index: RwLock<Option<Arc<dyn VectorIndex>>>,
    history: RwLock<Vec<ChatMessage>>,
}

impl Session {
    /// Create a new [`SessionBuilder`].
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// The index queries currently run against, if any.
    ///
    /// The returned `Arc` stays valid even if a new document replaces the
    /// index while it is in use.
    pub async fn current_index(&self) -> Option<Arc<dyn VectorIndex>> {
        self.index.read().await.clone()
    }

    /// Return `true` once a document has been indexed.
    pub async fn has_document(&self) -> bool {
        self.index.read().await.is_some()
    }

    /// A snapshot of the visible chat history.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.read().await.clone()
    }

    /// Load, index and install the document at `path`.
    ///
    /// The new index replaces the current one only after it is completely
    /// built. On error the previous index stays installed.
    ///
    /// # Errors
    ///
    /// Any [`RagError`] raised while loading, chunking, embedding or indexing.
    pub async fn index_document(&self, path: &Path) -> Result<IndexedDocument> {
        self.index_path(path, None).await
    }

    /// Index an uploaded file.
    ///
    /// The bytes are written to a temporary file for the loader, which is
    /// deleted again whether or not indexing succeeds. `file_name` selects the
    /// loader by extension and names the document.
    ///
    /// # Errors
    ///
    /// [`RagError::StorageError`] if the temporary copy cannot be written, and
    /// everything [`index_document`](Self::index_document) can return.
    pub async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<IndexedDocument> {
        let path = self.uploads.save(bytes, file_name).await?;
        let result = self.index_path(&path, Some(file_name)).await;
        self.uploads.delete(&path).await;
        result
    }

    async fn index_path(&self, path: &Path, source: Option<&str>) -> Result<IndexedDocument> {
        let loader = Arc::clone(&self.loader);
        let owned = path.to_path_buf();
        let mut document = tokio::task::spawn_blocking(move || loader.load(&owned))
            .await
            .map_err(|e| RagError::LoadError(format!("loader task failed: {e}")))?
            .inspect_err(|e| error!(path = %path.display(), error = %e, "document load failed"))?;

        if let Some(source) = source {
            document.source = source.to_string();
            for block in &mut document.blocks {
                block.metadata.insert("source".to_string(), source.to_string());
            }
        }

        let index = self.pipeline.build(&document).await?;
        let summary = IndexedDocument {
            source: document.source.clone(),
            blocks: document.blocks.len(),
            segments: index.len(),
        };

        *self.index.write().await = Some(index);
        info!(source = %summary.source, blocks = summary.blocks, segments = summary.segments, "index replaced");
        Ok(summary)
    }

    /// Answer a question about the current document.
    ///
    /// The question and the outcome are both appended to the history. A chat
    /// or embedding failure is recorded there as an assistant message before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// [`RagError::EmbeddingError`], [`RagError::DimensionMismatch`] or
    /// [`RagError::ChatError`] from the query path.
    pub async fn ask(&self, query: &str) -> Result<Answer> {
        self.history.write().await.push(ChatMessage::user(query));

        let outcome = match self.current_index().await {
            Some(index) => self.answer(index.as_ref(), query).await,
            None => Ok(Answer::NoDocument),
        };

        let message = match &outcome {
            Ok(answer) => answer.to_message(),
            Err(e) => {
                warn!(error = %e, "question could not be answered");
                ChatMessage::assistant(format!("Sorry, something went wrong: {e}"))
            }
        };
        self.history.write().await.push(message);

        outcome
    }

    async fn answer(&self, index: &dyn VectorIndex, query: &str) -> Result<Answer> {
        let results = match self.retriever.retrieve(index, query).await? {
            Retrieval::Relevant(results) => results,
            Retrieval::NoRelevantContent => return Ok(Answer::NoRelevantContent),
        };

        let prompt = assemble_from_results(&results, query, &self.system_instruction);
        let reply = self.chat_model.reply(&prompt).await?;
        info!(
            model = self.chat_model.name(),
            sources = results.len(),
            has_reasoning = reply.reasoning.is_some(),
            "answered question"
        );

        Ok(Answer::Grounded { reply, sources: results })
    }

    /// End the session: drop the index and the history.
    pub async fn close(&self) {
        self.index.write().await.take();
        self.history.write().await.clear();
        info!("session closed");
    }
}

/// Builder for constructing a [`Session`].
///
/// `config`, `embedding_provider` and `chat_model` are required. The loader
/// defaults to [`FileLoader`], the chunker and index to those selected by the
/// config, uploads to [`TempFileStore::default`], and the system instruction
/// to [`DEFAULT_SYSTEM_INSTRUCTION`].
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chat_model: Option<Arc<dyn ChatModel>>,
    loader: Option<Arc<dyn DocumentLoader>>,
    chunker: Option<Arc<dyn Chunker>>,
    index_builder: Option<Arc<dyn IndexBuilder>>,
    uploads: Option<TempFileStore>,
    system_instruction: Option<String>,
}

impl SessionBuilder {
    /// Set the session configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the chat model.
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Override the document loader.
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Override the chunker selected by the config.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the index backend.
    pub fn index_builder(mut self, builder: Arc<dyn IndexBuilder>) -> Self {
        self.index_builder = Some(builder);
        self
    }

    /// Override where uploads are written.
    pub fn upload_store(mut self, store: TempFileStore) -> Self {
        self.uploads = Some(store);
        self
    }

    /// Override the system instruction.
    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Build the [`Session`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the config is invalid.
    pub fn build(self) -> Result<Session> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedder = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let chat_model = self
            .chat_model
            .ok_or_else(|| RagError::ConfigError("chat_model is required".to_string()))?;

        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => chunker_for(&config)?,
        };
        let index_builder = self
            .index_builder
            .unwrap_or_else(|| Arc::new(FlatIndexBuilder::new(config.metric)));
        let pipeline = IndexPipeline::new(chunker, Arc::clone(&embedder), index_builder);

        Ok(Session {
            retriever: Retriever::from_config(embedder, &config),
            pipeline,
            chat_model,
            loader: self.loader.unwrap_or_else(|| Arc::new(FileLoader)),
            uploads: self.uploads.unwrap_or_default(),
            system_instruction: self
                .system_instruction
                .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()),
            index: RwLock::new(None),
            history: RwLock::new(vec![ChatMessage::assistant(GREETING)]),
        })
    }
}
