//! `docinsight`: ask questions about a PDF or text document from the terminal.

mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use docinsight_rag::ollama::{
    DEFAULT_CHAT_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_TIMEOUT, OllamaChatModel, OllamaConfig,
};
use docinsight_rag::{GREETING, RagConfig, Session, load_embedding_provider};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docinsight")]
#[command(about = "Ask questions about a PDF or text document using a local Ollama model")]
#[command(version)]
struct Cli {
    /// Document to load at startup (PDF, txt or markdown).
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Ask a single question and exit instead of starting the interactive prompt.
    #[arg(short, long, requires = "file")]
    question: Option<String>,

    /// Maximum segment size in characters [env: DOCINSIGHT_CHUNK_SIZE]
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive segments [env: DOCINSIGHT_CHUNK_OVERLAP]
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Segments retrieved per question [env: DOCINSIGHT_TOP_K]
    #[arg(long)]
    top_k: Option<usize>,

    /// Embedding model, `hashing[:dims]` or `fastembed[:model]` [env: DOCINSIGHT_EMBEDDING_MODEL]
    #[arg(long)]
    embedding_model: Option<String>,

    /// Chat model served by Ollama.
    #[arg(long, env = "DOCINSIGHT_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Ollama server address.
    #[arg(long, env = "DOCINSIGHT_OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Seconds to wait for each Ollama request.
    #[arg(long, env = "DOCINSIGHT_OLLAMA_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Do not print the model's reasoning.
    #[arg(long)]
    hide_reasoning: bool,
}

impl Cli {
    /// Environment config with command-line overrides applied.
    fn rag_config(&self) -> Result<RagConfig> {
        self.rag_config_with(|key| std::env::var(key).ok())
    }

    fn rag_config_with<F>(&self, lookup: F) -> Result<RagConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder =
            RagConfig::builder_from_lookup(lookup).context("invalid DOCINSIGHT_* environment")?;
        if let Some(size) = self.chunk_size {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = self.chunk_overlap {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(k) = self.top_k {
            builder = builder.top_k(k);
        }
        if let Some(model) = &self.embedding_model {
            builder = builder.embedding_model_name(model.clone());
        }
        Ok(builder.build()?)
    }

    fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig::new(&self.ollama_url).with_timeout(Duration::from_secs(self.timeout))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docinsight=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.rag_config()?;
    let ollama = cli.ollama_config();

    let embedder = load_embedding_provider(&config, &ollama.base_url, ollama.request_timeout)
        .await
        .with_context(|| format!("cannot load embedding model '{}'", config.embedding_model_name))?;
    let chat = Arc::new(OllamaChatModel::new(ollama, &cli.chat_model)?);
    info!(chat_model = %cli.chat_model, embedding_model = embedder.name(), "models ready");

    let session =
        Session::builder().config(config).embedding_provider(embedder).chat_model(chat).build()?;

    if let Some(path) = &cli.file {
        load(&session, path).await?;
    }

    let result = match &cli.question {
        Some(question) => ask(&session, question, !cli.hide_reasoning).await,
        None => repl(&session, !cli.hide_reasoning).await,
    };

    session.close().await;
    result
}

async fn load(session: &Session, path: &Path) -> Result<()> {
    let indexed = session
        .index_document(path)
        .await
        .with_context(|| format!("cannot index '{}'", path.display()))?;
    eprintln!(
        "Loaded {} ({} pages, {} segments)",
        indexed.source, indexed.blocks, indexed.segments
    );
    Ok(())
}

async fn ask(session: &Session, question: &str, show_reasoning: bool) -> Result<()> {
    let answer = session.ask(question).await?;
    println!("{}", render::answer(&answer, show_reasoning));
    Ok(())
}

async fn repl(session: &Session, show_reasoning: bool) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("{GREETING}");
    println!("Commands: /load <path>, /history, /quit");

    loop {
        let line = match editor.readline("docinsight> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        editor.add_history_entry(line)?;

        if let Some(path) = line.strip_prefix("/load") {
            let path = path.trim();
            if path.is_empty() {
                eprintln!("usage: /load <path>");
            } else if let Err(e) = load(session, Path::new(path)).await {
                // The previous document stays loaded.
                eprintln!("{e:#}");
            }
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/history" => println!("{}", render::history(&session.history().await, show_reasoning)),
            question => match session.ask(question).await {
                Ok(answer) => println!("{}\n", render::answer(&answer, show_reasoning)),
                Err(e) => {
                    warn!(error = %e, "question failed");
                    eprintln!("Error: {e}");
                }
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn flags_are_applied_before_validation() {
        let cli = Cli::parse_from(["docinsight", "--chunk-overlap", "10"]);
        let config = cli.rag_config_with(env(&[("DOCINSIGHT_CHUNK_SIZE", "50")])).unwrap();
        assert_eq!(config.chunk_size, 50);
        assert_eq!(config.chunk_overlap, 10);
    }

    #[test]
    fn flags_override_the_environment() {
        let cli = Cli::parse_from(["docinsight", "--top-k", "5", "--embedding-model", "hashing"]);
        let config = cli
            .rag_config_with(env(&[("DOCINSIGHT_TOP_K", "2"), ("DOCINSIGHT_CHUNKING", "fixed")]))
            .unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.embedding_model_name, "hashing");
        assert_eq!(config.chunking, docinsight_rag::ChunkingStrategy::FixedSize);
    }

    #[test]
    fn invalid_final_config_is_rejected() {
        let cli = Cli::parse_from(["docinsight", "--chunk-size", "10", "--chunk-overlap", "10"]);
        assert!(cli.rag_config_with(env(&[])).is_err());
    }

    #[test]
    fn timeout_flag_reaches_the_ollama_config() {
        let cli = Cli::parse_from(["docinsight", "--timeout", "42"]);
        assert_eq!(cli.ollama_config().request_timeout, Duration::from_secs(42));
        assert_eq!(cli.ollama_config().base_url, cli.ollama_url);
    }
}
