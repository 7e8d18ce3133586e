//! Retrieval + generation over one indexed document

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::{PipelineOutput, SearchResult, ANSWER_MARKER};
use crate::domain::ports::{EmbeddingService, LanguageModel, RetrievalPipeline};
use crate::infrastructure::vector::VectorIndex;

const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Build the question-answering prompt from retrieved passages
pub fn build_prompt(query: &str, context: &[SearchResult]) -> String {
    let passages = context
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {}", i + 1, r.content.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{PROMPT_PREAMBLE}\n\n{passages}\n\nQuestion: {query}\n{ANSWER_MARKER}")
}

/// Immutable pipeline bound to one document index and the shared model
pub struct RagPipeline {
    source: PathBuf,
    index: VectorIndex,
    embedder: Arc<dyn EmbeddingService>,
    model: Arc<dyn LanguageModel>,
    top_k: usize,
    return_full_text: bool,
}

impl RagPipeline {
    pub fn new(
        source: PathBuf,
        index: VectorIndex,
        embedder: Arc<dyn EmbeddingService>,
        model: Arc<dyn LanguageModel>,
        top_k: usize,
        return_full_text: bool,
    ) -> Self {
        Self {
            source,
            index,
            embedder,
            model,
            top_k,
            return_full_text,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }
}

#[async_trait]
impl RetrievalPipeline for RagPipeline {
    async fn invoke(&self, query: &str) -> Result<PipelineOutput> {
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let sources = self.index.search(&query_embedding, self.top_k);
        debug!(
            source = %self.source.display(),
            retrieved = sources.len(),
            "Retrieved context"
        );

        let prompt = build_prompt(query, &sources);
        let completion = self
            .model
            .generate(&prompt)
            .await
            .with_context(|| format!("Generation failed for model {}", self.model.model_id()))?;

        let result = if self.return_full_text {
            prompt + &completion
        } else {
            completion
        };

        Ok(PipelineOutput::new(result).with_sources(sources))
    }

    fn source(&self) -> &Path {
        &self.source
    }
}
