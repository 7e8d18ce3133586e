//! Hashed bag-of-words embeddings
//!
//! Generates deterministic embeddings without downloading a model: each
//! lowercase word and word bigram is hashed into one of `dimensions` buckets
//! with a signed weight, and the vector is L2-normalised. Lexically similar
//! passages land close together under cosine similarity.

use crate::domain::ports::EmbeddingService;
use anyhow::{anyhow, Result};
use async_trait::async_trait;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Local feature-hashing embedding service
pub struct HashedEmbeddingService {
    dimensions: usize,
}

impl HashedEmbeddingService {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(anyhow!("embedding dimensions must be greater than 0"));
        }
        Ok(Self { dimensions })
    }

    /// Embed `text` synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimensions];
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        for word in &words {
            self.accumulate(&mut embedding, word.as_bytes(), 1.0);
        }
        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut embedding, bigram.as_bytes(), 0.5);
        }

        // f64 accumulation keeps the norm stable for wide vectors
        let magnitude = embedding
            .iter()
            .map(|x| f64::from(*x) * f64::from(*x))
            .sum::<f64>()
            .sqrt();

        if magnitude > 1e-10 {
            #[allow(clippy::cast_possible_truncation)]
            let magnitude = magnitude as f32;
            for val in &mut embedding {
                *val /= magnitude;
            }
        }

        embedding
    }

    fn accumulate(&self, embedding: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        #[allow(clippy::cast_possible_truncation)]
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        embedding[bucket] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingService for HashedEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(HashedEmbeddingService::new(0).is_err());
    }

    #[tokio::test]
    async fn test_embed_dimensions_and_norm() {
        let service = HashedEmbeddingService::new(384).unwrap();
        let embedding = service.embed("Hello world").await.unwrap();

        assert_eq!(embedding.len(), 384);
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_deterministic_and_case_insensitive() {
        let service = HashedEmbeddingService::new(128).unwrap();
        let a = service.embed("Refund Policy").await.unwrap();
        let b = service.embed("refund policy").await.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let service = HashedEmbeddingService::new(64).unwrap();
        let embedding = service.embed_text("  ...  ");
        assert!(embedding.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_overlapping_text_scores_higher() {
        let service = HashedEmbeddingService::new(384).unwrap();
        let query = service.embed_text("what is the refund policy");
        let related = service.embed_text("Our refund policy allows returns within 30 days.");
        let unrelated = service.embed_text("The cluster runs on three GPU nodes.");

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let service = HashedEmbeddingService::new(96).unwrap();
        let texts = ["alpha beta", "gamma", "delta epsilon zeta"];
        let batch = service.embed_batch(&texts).await.unwrap();

        assert_eq!(batch.len(), 3);
        for (text, embedding) in texts.iter().zip(&batch) {
            assert_eq!(&service.embed(text).await.unwrap(), embedding);
        }
    }
}
