//! Data types for documents, segments, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A loaded source document: ordered raw text blocks plus where they came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Human-readable origin, usually the file name.
    pub source: String,
    /// Text blocks in reading order (one per PDF page, for example).
    pub blocks: Vec<TextBlock>,
}

impl Document {
    /// Create a document from its blocks.
    pub fn new(source: impl Into<String>, blocks: Vec<TextBlock>) -> Self {
        Self { source: source.into(), blocks }
    }

    /// Create a single-block document from a string.
    pub fn from_text(source: impl Into<String>, text: impl Into<String>) -> Self {
        let source = source.into();
        let block = TextBlock::new(text).with_metadata("source", source.clone());
        Self { source, blocks: vec![block] }
    }

    /// Total number of characters across all blocks.
    pub fn char_count(&self) -> usize {
        self.blocks.iter().map(|b| b.text.chars().count()).sum()
    }
}

/// One unit of extracted text with its positional metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextBlock {
    /// The extracted text.
    pub text: String,
    /// Key-value metadata such as `source` and `page`.
    pub metadata: HashMap<String, String>,
}

impl TextBlock {
    /// Create a block without metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), metadata: HashMap::new() }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A contiguous piece of one [`TextBlock`], the unit that gets embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Identifier of the form `{source}#{chunk_index}`.
    pub id: String,
    /// The segment text. Never empty.
    pub content: String,
    /// Block metadata plus `chunk_index` and `block_index`.
    pub metadata: HashMap<String, String>,
}

impl Segment {
    /// Page number the segment was taken from, if the loader recorded one.
    pub fn page(&self) -> Option<u32> {
        self.metadata.get("page").and_then(|p| p.parse().ok())
    }
}

/// A retrieved [`Segment`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved segment.
    pub segment: Segment,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
