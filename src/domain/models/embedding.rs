//! Retrieval result models

use serde::{Deserialize, Serialize};

use super::chunking::Chunk;

/// A chunk returned by similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk ID
    pub id: String,

    /// Chunk text
    pub content: String,

    /// Position of the chunk in its document
    pub chunk_index: usize,

    /// Cosine similarity (-1..1, higher is better)
    pub score: f32,
}

impl SearchResult {
    /// Build a result for a matched chunk
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            id: chunk.id.clone(),
            content: chunk.content.clone(),
            chunk_index: chunk.chunk_index,
            score,
        }
    }
}
