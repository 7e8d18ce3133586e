//! Text chunking domain models
//!
//! Models for splitting an uploaded document into passages for retrieval.

use serde::{Deserialize, Serialize};

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChunkingConfig {
    /// Maximum size of each chunk in tokens
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in tokens
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Cut chunks at the last sentence boundary instead of mid-sentence
    #[serde(default = "default_respect_boundaries")]
    pub respect_boundaries: bool,
}

const fn default_chunk_size() -> usize {
    512
}

const fn default_chunk_overlap() -> usize {
    50
}

const fn default_respect_boundaries() -> bool {
    true
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            respect_boundaries: default_respect_boundaries(),
        }
    }
}

impl ChunkingConfig {
    /// Validate the chunking configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err("chunk_overlap must be less than chunk_size".to_string());
        }

        Ok(())
    }
}

/// A passage of text taken from one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{source}:chunk:{index}`
    pub id: String,

    /// Name of the document the chunk came from
    pub source: String,

    /// The passage text
    pub content: String,

    /// Position within the document (0-based)
    pub chunk_index: usize,

    /// Number of tokens in this chunk
    pub token_count: usize,

    /// Byte offset of the passage start in the extracted text
    pub start_offset: usize,

    /// Whether the chunk was cut back to a sentence boundary
    pub truncated_at_boundary: bool,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(source: &str, content: String, chunk_index: usize, token_count: usize) -> Self {
        Self {
            id: format!("{source}:chunk:{chunk_index}"),
            source: source.to_string(),
            content,
            chunk_index,
            token_count,
            start_offset: 0,
            truncated_at_boundary: false,
        }
    }

    /// Set the start offset
    #[must_use]
    pub const fn at_offset(mut self, start_offset: usize) -> Self {
        self.start_offset = start_offset;
        self
    }

    /// Mark as truncated at a sentence boundary
    #[must_use]
    pub const fn mark_truncated(mut self) -> Self {
        self.truncated_at_boundary = true;
        self
    }

    /// Returns true if this is the first chunk
    pub const fn is_first(&self) -> bool {
        self.chunk_index == 0
    }

    /// Short preview for logs (first 80 chars)
    pub fn preview(&self) -> String {
        match self.content.char_indices().nth(80) {
            Some((idx, _)) => format!("{}...", &self.content[..idx]),
            None => self.content.clone(),
        }
    }
}
