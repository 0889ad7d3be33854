//! Document loaders: turn a file on disk into a [`Document`].

use std::path::Path;

use tracing::{debug, info, warn};

use crate::document::{Document, TextBlock};
use crate::error::{RagError, Result};

/// Extracts text blocks from a file.
pub trait DocumentLoader: Send + Sync {
    /// Load the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::LoadError`] if the file is missing, unreadable, or
    /// cannot be parsed.
    fn load(&self, path: &Path) -> Result<Document>;
}

fn source_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Loads PDFs with one [`TextBlock`] per page.
///
/// Blocks carry `source` (the file name) and `page` (1-based) metadata.
/// Pages whose text cannot be extracted are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Document> {
        let source = source_name(path);
        let pdf = lopdf::Document::load(path)
            .map_err(|e| RagError::LoadError(format!("cannot parse PDF '{source}': {e}")))?;
        if pdf.is_encrypted() {
            return Err(RagError::LoadError(format!("'{source}' is encrypted")));
        }

        let pages = pdf.get_pages();
        let mut blocks = Vec::with_capacity(pages.len());
        let mut failed = 0usize;

        for &page in pages.keys() {
            match pdf.extract_text(&[page]) {
                Ok(text) => blocks.push(
                    TextBlock::new(text)
                        .with_metadata("source", source.clone())
                        .with_metadata("page", page.to_string()),
                ),
                Err(e) => {
                    warn!(source = %source, page, error = %e, "skipping page without extractable text");
                    failed += 1;
                }
            }
        }

        if !pages.is_empty() && blocks.is_empty() {
            return Err(RagError::LoadError(format!(
                "no text could be extracted from any of the {failed} pages of '{source}'"
            )));
        }

        info!(source = %source, pages = pages.len(), skipped = failed, "loaded PDF");
        Ok(Document::new(source, blocks))
    }
}

/// Loads a UTF-8 text or markdown file as a single block.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> Result<Document> {
        let source = source_name(path);
        let bytes = std::fs::read(path)
            .map_err(|e| RagError::LoadError(format!("cannot read '{}': {e}", path.display())))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| RagError::LoadError(format!("'{source}' is not valid UTF-8: {e}")))?;

        debug!(source = %source, chars = text.chars().count(), "loaded text file");
        Ok(Document::from_text(source, text))
    }
}

/// Picks a loader from the file extension.
///
/// | Extension | Loader |
/// |-----------|--------|
/// | `pdf` | [`PdfLoader`] |
/// | `txt`, `text`, `md`, `markdown` | [`TextLoader`] |
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    /// Return `true` if `path` has an extension this loader understands.
    pub fn supports(path: &Path) -> bool {
        Self::loader_for(path).is_some()
    }

    fn loader_for(path: &Path) -> Option<&'static dyn DocumentLoader> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(&PdfLoader),
            "txt" | "text" | "md" | "markdown" => Some(&TextLoader),
            _ => None,
        }
    }
}

impl DocumentLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<Document> {
        let loader = Self::loader_for(path).ok_or_else(|| {
            RagError::LoadError(format!("unsupported document type: '{}'", path.display()))
        })?;
        loader.load(path)
    }
}
