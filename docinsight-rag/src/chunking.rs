//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] - exact sliding character windows with overlap
//! - [`RecursiveChunker`] - splits hierarchically by paragraphs, lines, sentences, then words
//!
//! All sizes are counted in `char`s. Segments never cross block boundaries.

use std::collections::VecDeque;
use std::iter;
use std::sync::Arc;

use crate::config::{ChunkingStrategy, RagConfig};
use crate::document::{Document, Segment};
use crate::error::{RagError, Result};

/// Separators tried by [`RecursiveChunker`], coarsest first.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// A strategy for splitting documents into segments.
///
/// Implementations are pure: the same document always yields the same
/// segments. Embeddings are attached later by the index pipeline.
pub trait Chunker: Send + Sync {
    /// Split every block of a document into segments, preserving order.
    ///
    /// Returns an empty `Vec` if the document has no text.
    fn split(&self, document: &Document) -> Vec<Segment>;
}

/// Construct the chunker selected by `config.chunking`.
pub fn chunker_for(config: &RagConfig) -> Result<Arc<dyn Chunker>> {
    let chunker: Arc<dyn Chunker> = match config.chunking {
        ChunkingStrategy::Recursive => {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?)
        }
        ChunkingStrategy::FixedSize => {
            Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?)
        }
    };
    Ok(chunker)
}

fn check_sizes(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Number the pieces produced per block and wrap them as [`Segment`]s.
///
/// `chunk_index` runs across the whole document; `block_index` records the
/// originating block.
fn collect_segments<F>(document: &Document, mut split_block: F) -> Vec<Segment>
where
    F: FnMut(&str) -> Vec<String>,
{
    let mut segments = Vec::new();
    for (block_index, block) in document.blocks.iter().enumerate() {
        if block.text.is_empty() {
            continue;
        }
        for content in split_block(&block.text) {
            let chunk_index = segments.len();
            let mut metadata = block.metadata.clone();
            metadata.insert("chunk_index".to_string(), chunk_index.to_string());
            metadata.insert("block_index".to_string(), block_index.to_string());
            segments.push(Segment {
                id: format!("{}#{chunk_index}", document.source),
                content,
                metadata,
            });
        }
    }
    segments
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits text into fixed-size windows by character count.
///
/// Each window is exactly `chunk_size` characters and starts
/// `chunk_size - chunk_overlap` characters after the previous one; the last
/// window of a block holds whatever remains and may be shorter.
///
/// # Example
///
/// ```rust
/// use docinsight_rag::{Chunker, Document, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(20, 5)?;
/// let segments = chunker.split(&Document::from_text("doc", "The sky is blue. Grass is green."));
/// assert_eq!(segments[0].content, "The sky is blue. Gra");
/// assert_eq!(segments[1].content, ". Grass is green.");
/// # Ok::<(), docinsight_rag::RagError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        check_sizes(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, document: &Document) -> Vec<Segment> {
        collect_segments(document, |text| {
            split_by_size(text, self.chunk_size, self.chunk_overlap)
                .into_iter()
                .map(str::to_string)
                .collect()
        })
    }
}

/// Character windows over `text`. Slices always fall on `char` boundaries.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<&str> {
    let bounds: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(iter::once(text.len())).collect();
    let len = bounds.len() - 1;
    if len == 0 {
        return Vec::new();
    }

    let step = chunk_size - chunk_overlap;
    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(len);
        windows.push(&text[bounds[start]..bounds[end]]);
        if end == len {
            break;
        }
        start += step;
    }
    windows
}

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Text is split at the coarsest separator it contains. Pieces that fit are
/// merged greedily up to `chunk_size`, and each new segment starts with up to
/// `chunk_overlap` characters of trailing pieces from the previous one. Pieces
/// that are still too long are split again with the next finer separator;
/// character windows are the last resort. Segments are trimmed, and
/// whitespace-only segments are dropped.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        check_sizes(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, document: &Document) -> Vec<Segment> {
        collect_segments(document, |text| {
            split_recursive(text, self.chunk_size, self.chunk_overlap, SEPARATORS)
                .into_iter()
                .map(|chunk| chunk.trim().to_string())
                .filter(|chunk| !chunk.is_empty())
                .collect()
        })
    }
}

fn split_recursive(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let Some(level) = separators.iter().position(|sep| text.contains(sep)) else {
        return split_by_size(text, chunk_size, chunk_overlap)
            .into_iter()
            .map(str::to_string)
            .collect();
    };
    let separator = separators[level];
    let finer = &separators[level + 1..];

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) <= chunk_size {
            fitting.push(piece);
        } else {
            chunks.extend(merge_pieces(&fitting, chunk_size, chunk_overlap));
            fitting.clear();
            chunks.extend(split_recursive(piece, chunk_size, chunk_overlap, finer));
        }
    }
    chunks.extend(merge_pieces(&fitting, chunk_size, chunk_overlap));

    chunks
}

/// Split text at a separator while keeping the separator attached to the preceding piece.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Greedily join pieces (each at most `chunk_size` long) into chunks.
///
/// When a chunk is emitted, pieces are dropped from its front until what
/// remains is at most `chunk_overlap` long and leaves room for the next piece;
/// the remainder opens the next chunk.
fn merge_pieces(pieces: &[&str], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut window_len = 0;

    for &piece in pieces {
        let len = char_len(piece);
        if window_len + len > chunk_size && !window.is_empty() {
            chunks.push(window.iter().map(|(p, _)| *p).collect::<String>());
            while window_len > chunk_overlap || window_len + len > chunk_size {
                match window.pop_front() {
                    Some((_, dropped)) => window_len -= dropped,
                    None => break,
                }
            }
        }
        window.push_back((piece, len));
        window_len += len;
    }

    if !window.is_empty() {
        chunks.push(window.iter().map(|(p, _)| *p).collect());
    }

    chunks
}
