//! Ports implemented by infrastructure collaborators.
//!
//! Collaborators report failures with `anyhow`; the services that call them
//! translate failures into [`ServiceError`] variants.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::errors::ServiceResult;
use super::models::{Chunk, PipelineOutput, ResourceStatus};

/// Handle to a loaded generation model.
///
/// Implementations must be safe for concurrent inference: one handle is
/// shared read-only by every request once the model is ready.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier the model was loaded under
    fn model_id(&self) -> &str;

    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Acquires and initializes a generation model.
///
/// Not safe to call concurrently with itself; `ModelManager` serializes
/// load attempts.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Load `model_id`, possibly writing artifacts into `cache_dir`
    async fn load(&self, model_id: &str, cache_dir: &Path) -> Result<Arc<dyn LanguageModel>>;
}

/// Extracts plain text from a stored document
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String>;
}

/// Splits text into retrieval passages
#[async_trait]
pub trait ChunkingService: Send + Sync {
    /// Split `text` into chunks attributed to `source`
    async fn chunk(&self, text: &str, source: &str) -> Result<Vec<Chunk>>;

    /// Count tokens in `text`
    async fn count_tokens(&self, text: &str) -> Result<usize>;
}

/// Turns text into dense vectors
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    fn dimensions(&self) -> usize;
}

/// A built, immutable retrieval + generation pipeline over one document
#[async_trait]
pub trait RetrievalPipeline: Send + Sync {
    /// Answer `query` from the indexed document
    async fn invoke(&self, query: &str) -> Result<PipelineOutput>;

    /// Document the pipeline was built from
    fn source(&self) -> &Path;
}

/// Builds a pipeline from a stored document and the shared model handle.
///
/// Pure with respect to the pipeline registry: the caller installs the
/// result. Safe to call concurrently for different documents.
#[async_trait]
pub trait PipelineBuilder: Send + Sync {
    async fn build(
        &self,
        document_path: &Path,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> ServiceResult<Arc<dyn RetrievalPipeline>>;
}

/// Source of the latest process resource sample
#[async_trait]
pub trait ResourceProbe: Send + Sync {
    /// Most recent cached sample, without taking a new one
    async fn latest_status(&self) -> Option<ResourceStatus>;
}
