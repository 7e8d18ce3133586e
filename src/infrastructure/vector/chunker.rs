//! Token-window chunker
//!
//! Splits extracted document text into overlapping token windows using the
//! `cl100k_base` BPE, optionally cutting each window back to its last
//! sentence boundary.

use crate::domain::models::{Chunk, ChunkingConfig};
use crate::domain::ports::ChunkingService;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tiktoken_rs::CoreBPE;

const SENTENCE_ENDINGS: [char; 4] = ['.', '!', '?', '\n'];

/// Token-aware chunker
pub struct TokenChunker {
    config: ChunkingConfig,
    bpe: CoreBPE,
}

impl TokenChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("Invalid chunking config: {}", e))?;

        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

        Ok(Self { config, bpe })
    }

    /// Byte offset of every token start in `text`, followed by `text.len()`
    fn token_offsets(&self, text: &str) -> Result<Vec<usize>> {
        let tokens = self.bpe.encode_with_special_tokens(text);
        let mut offsets = Vec::with_capacity(tokens.len() + 1);
        let mut position = 0;
        offsets.push(position);
        for bytes in self.bpe._decode_native_and_split(tokens) {
            position += bytes.len();
            offsets.push(position);
        }

        if position != text.len() {
            return Err(anyhow!(
                "Token bytes cover {} of {} input bytes",
                position,
                text.len()
            ));
        }
        Ok(offsets)
    }

    fn split(&self, text: &str, source: &str) -> Result<Vec<Chunk>> {
        let offsets = self.token_offsets(text)?;
        let total = offsets.len() - 1;
        // A token may hold part of a multi-byte character, so windows only
        // start and end where a token edge is also a character edge.
        let on_char = |index: usize| text.is_char_boundary(offsets[index]);

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            while !on_char(start) {
                start += 1;
            }
            if start >= total {
                break;
            }

            let limit = (start + self.config.chunk_size).min(total);
            let mut end = limit;
            while end > start && !on_char(end) {
                end -= 1;
            }
            if end == start {
                end = limit;
                while !on_char(end) {
                    end += 1;
                }
            }

            let window = &text[offsets[start]..offsets[end]];
            let is_last = end >= total;
            let boundary = if self.config.respect_boundaries && !is_last {
                last_sentence_end(window)
            } else {
                None
            };
            let (content, consumed_tokens) = match boundary {
                Some(pos) => {
                    let cut = offsets[start] + pos;
                    let whole = offsets[start + 1..=end].partition_point(|&o| o <= cut);
                    (&window[..pos], whole)
                }
                None => (window, end - start),
            };

            if !content.trim().is_empty() {
                let mut chunk =
                    Chunk::new(source, content.to_string(), chunks.len(), end - start)
                        .at_offset(offsets[start]);
                if boundary.is_some() {
                    chunk = chunk.mark_truncated();
                }
                chunks.push(chunk);
            }

            if is_last {
                break;
            }

            start = (start + consumed_tokens)
                .saturating_sub(self.config.chunk_overlap)
                .max(start + 1);
        }

        Ok(chunks)
    }
}

/// Byte position just past the last sentence ending in `text`
fn last_sentence_end(text: &str) -> Option<usize> {
    text.char_indices()
        .rev()
        .find(|(_, c)| SENTENCE_ENDINGS.contains(c))
        .map(|(i, c)| i + c.len_utf8())
}

#[async_trait]
impl ChunkingService for TokenChunker {
    async fn chunk(&self, text: &str, source: &str) -> Result<Vec<Chunk>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.split(text, source)
    }

    async fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.bpe.encode_with_special_tokens(text).len())
    }
}
