//! Document indexing: stored document -> retrieval pipeline
//!
//! Every build allocates its own chunks, embeddings and index, so builds for
//! different documents run concurrently without sharing scratch state.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::domain::models::{ChunkingConfig, RetrievalConfig};
use crate::domain::ports::{
    ChunkingService, EmbeddingService, LanguageModel, PipelineBuilder, RetrievalPipeline,
    TextExtractor,
};
use crate::domain::{ServiceError, ServiceResult};
use crate::infrastructure::vector::{HashedEmbeddingService, TokenChunker, VectorIndex};
use crate::infrastructure::FileTextExtractor;
use crate::services::rag_pipeline::RagPipeline;

pub struct DocumentIndexer {
    extractor: Arc<dyn TextExtractor>,
    chunker: Arc<dyn ChunkingService>,
    embedder: Arc<dyn EmbeddingService>,
    retrieval: RetrievalConfig,
}

impl DocumentIndexer {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        chunker: Arc<dyn ChunkingService>,
        embedder: Arc<dyn EmbeddingService>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            extractor,
            chunker,
            embedder,
            retrieval,
        }
    }

    /// Indexer wired to the local extractor, token chunker and hashed embeddings
    pub fn with_defaults(chunking: ChunkingConfig, retrieval: RetrievalConfig) -> Result<Self> {
        let chunker = TokenChunker::new(chunking)?;
        let embedder = HashedEmbeddingService::new(retrieval.embedding_dimensions)?;
        Ok(Self::new(
            Arc::new(FileTextExtractor::new()),
            Arc::new(chunker),
            Arc::new(embedder),
            retrieval,
        ))
    }
}

fn index_failure(path: &Path, stage: &str, err: &anyhow::Error) -> ServiceError {
    error!(
        path = %path.display(),
        stage,
        error = %format!("{err:#}"),
        "Document indexing failed"
    );
    ServiceError::IndexBuild(format!("{stage} failed"))
}

#[async_trait]
impl PipelineBuilder for DocumentIndexer {
    async fn build(
        &self,
        document_path: &Path,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> ServiceResult<Arc<dyn RetrievalPipeline>> {
        let model = model.ok_or(ServiceError::ModelUnavailable)?;
        let started = Instant::now();

        let text = self
            .extractor
            .extract(document_path)
            .await
            .map_err(|e| index_failure(document_path, "text extraction", &e))?;

        if text.trim().is_empty() {
            return Err(ServiceError::IndexBuild(
                "no extractable content".to_string(),
            ));
        }

        let source = document_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let chunks = self
            .chunker
            .chunk(&text, &source)
            .await
            .map_err(|e| index_failure(document_path, "chunking", &e))?;

        if chunks.is_empty() {
            return Err(ServiceError::IndexBuild(
                "no extractable content".to_string(),
            ));
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| index_failure(document_path, "embedding", &e))?;

        let chunk_count = chunks.len();
        let index = VectorIndex::build(chunks, embeddings, self.embedder.dimensions())
            .map_err(|e| index_failure(document_path, "index construction", &e))?;

        info!(
            path = %document_path.display(),
            chunks = chunk_count,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Document indexed"
        );

        Ok(Arc::new(RagPipeline::new(
            document_path.to_path_buf(),
            index,
            Arc::clone(&self.embedder),
            model,
            self.retrieval.top_k,
            self.retrieval.return_full_text,
        )))
    }
}
