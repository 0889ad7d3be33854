//! Ollama embedding and chat backends using the Ollama HTTP API.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::chat::ChatModel;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::prompt::Prompt;

/// The default Ollama server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// The default chat model, a small reasoning model that emits `<think>` spans.
pub const DEFAULT_CHAT_MODEL: &str = "deepseek-r1:1.5b";

/// The default per-request timeout, generous enough for CPU-only inference.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const PROVIDER: &str = "Ollama";

/// Connection settings shared by the Ollama clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Server base URL, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_URL)
    }
}

impl OllamaConfig {
    /// Settings for the server at `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), request_timeout: DEFAULT_TIMEOUT }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    fn client(&self) -> std::result::Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.request_timeout).build()
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatRequestMessage<'a>; 2],
    stream: bool,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// POST `body` as JSON and decode a successful response as `T`.
///
/// Failures are reported as strings; callers wrap them in the error variant
/// that fits their side of the boundary.
async fn post_json<B, T>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
) -> std::result::Result<T, String>
where
    B: Serialize + ?Sized,
    T: for<'de> Deserialize<'de>,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| format!("request to {url} failed: {e}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
        return Err(format!("API returned {status}: {detail}"));
    }

    response.json::<T>().await.map_err(|e| format!("failed to parse response: {e}"))
}

/// Check an embedding response against what was asked for.
fn check_embeddings(
    expected_count: usize,
    expected_dimensions: Option<usize>,
    embeddings: Vec<Vec<f32>>,
) -> std::result::Result<Vec<Vec<f32>>, String> {
    if embeddings.len() != expected_count {
        return Err(format!("expected {expected_count} embeddings, got {}", embeddings.len()));
    }
    let dimensions = expected_dimensions.or_else(|| embeddings.first().map(Vec::len));
    for (i, embedding) in embeddings.iter().enumerate() {
        if embedding.is_empty() || Some(embedding.len()) != dimensions {
            return Err(format!(
                "embedding {i} has {} dimensions, expected {}",
                embedding.len(),
                dimensions.unwrap_or_default()
            ));
        }
    }
    Ok(embeddings)
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
///
/// Construct with [`connect`](Self::connect), which probes the model so its
/// dimensionality is known before any document is indexed.
///
/// # Example
///
/// ```rust,ignore
/// use docinsight_rag::ollama::{OllamaConfig, OllamaEmbeddingProvider};
///
/// let provider = OllamaEmbeddingProvider::connect(OllamaConfig::default(), "all-minilm").await?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Connect to `model` on the configured server.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the server is unreachable, the
    /// model is unknown, or the probe returns no usable vector.
    pub async fn connect(config: OllamaConfig, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(RagError::embedding(PROVIDER, "model name must not be empty"));
        }
        let client = config
            .client()
            .map_err(|e| RagError::embedding(PROVIDER, format!("failed to build client: {e}")))?;

        let mut provider =
            Self { client, url: config.endpoint("api/embed"), model, dimensions: 0 };
        let probe = provider.request(&["dimension probe"], None).await?;
        provider.dimensions = probe.first().map(Vec::len).unwrap_or_default();
        debug!(provider = PROVIDER, model = %provider.model, dimensions = provider.dimensions, "model probed");
        Ok(provider)
    }

    async fn request(&self, texts: &[&str], dimensions: Option<usize>) -> Result<Vec<Vec<f32>>> {
        let body = EmbedRequest { model: &self.model, input: texts.to_vec() };
        let response: EmbedResponse =
            post_json(&self.client, &self.url, &body).await.map_err(|message| {
                error!(provider = PROVIDER, model = %self.model, error = %message, "embedding request failed");
                RagError::embedding(PROVIDER, format!("model '{}': {message}", self.model))
            })?;

        check_embeddings(texts.len(), dimensions, response.embeddings).map_err(|message| {
            error!(provider = PROVIDER, model = %self.model, error = %message, "malformed embeddings");
            RagError::embedding(PROVIDER, format!("model '{}': {message}", self.model))
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding(PROVIDER, "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");
        self.request(texts, Some(self.dimensions)).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ── Chat ───────────────────────────────────────────────────────────

/// A [`ChatModel`] backed by Ollama's `/api/chat` endpoint (non-streaming).
pub struct OllamaChatModel {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaChatModel {
    /// Create a client for `model` on the configured server.
    ///
    /// No request is made until the first [`complete`](ChatModel::complete).
    pub fn new(config: OllamaConfig, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(RagError::ConfigError("chat model name must not be empty".to_string()));
        }
        let client = config
            .client()
            .map_err(|e| RagError::chat(PROVIDER, format!("failed to build client: {e}")))?;
        Ok(Self { client, url: config.endpoint("api/chat"), model })
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.user_message.len(), "chat request");

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatRequestMessage { role: "system", content: &prompt.system_instruction },
                ChatRequestMessage { role: "user", content: &prompt.user_message },
            ],
            stream: false,
        };

        let response: ChatResponse =
            post_json(&self.client, &self.url, &body).await.map_err(|message| {
                error!(provider = PROVIDER, model = %self.model, error = %message, "chat request failed");
                RagError::chat(PROVIDER, format!("model '{}': {message}", self.model))
            })?;

        Ok(response.message.content)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
