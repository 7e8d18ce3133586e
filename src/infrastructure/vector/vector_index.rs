//! In-memory vector index over one document
//!
//! The index is built once from a document's chunks and never mutated, so a
//! pipeline can share it across concurrent queries without locking.

use crate::domain::models::{Chunk, SearchResult};
use anyhow::{anyhow, Result};

struct IndexedChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Immutable brute-force cosine similarity index
pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
    dimensions: usize,
}

impl VectorIndex {
    /// Build an index from chunks and their embeddings (same order)
    pub fn build(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>, dimensions: usize) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(anyhow!(
                "chunk/embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            ));
        }

        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
            return Err(anyhow!(
                "embedding has {} dimensions, index expects {}",
                bad.len(),
                dimensions
            ));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();

        Ok(Self {
            entries,
            dimensions,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Return the `limit` chunks most similar to `query`, best first.
    /// Ties keep document order.
    pub fn search(&self, query: &[f32], limit: usize) -> Vec<SearchResult> {
        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query, &entry.embedding), entry))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(limit)
            .map(|(score, entry)| SearchResult::from_chunk(&entry.chunk, score))
            .collect()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
