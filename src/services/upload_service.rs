//! Upload orchestration: persist, index, install

use bytes::Bytes;
use futures::Stream;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::domain::models::{validate_user_id, StoredDocument};
use crate::domain::ports::PipelineBuilder;
use crate::domain::ServiceResult;
use crate::services::document_store::DocumentStore;
use crate::services::metrics::{Outcome, ServiceMetrics};
use crate::services::model_manager::ModelManager;
use crate::services::pipeline_registry::PipelineRegistry;

/// Handles document uploads and installs the resulting pipelines
pub struct UploadService {
    models: Arc<ModelManager>,
    store: Arc<DocumentStore>,
    builder: Arc<dyn PipelineBuilder>,
    registry: Arc<PipelineRegistry>,
    metrics: Arc<ServiceMetrics>,
}

impl UploadService {
    pub fn new(
        models: Arc<ModelManager>,
        store: Arc<DocumentStore>,
        builder: Arc<dyn PipelineBuilder>,
        registry: Arc<PipelineRegistry>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            models,
            store,
            builder,
            registry,
            metrics,
        }
    }

    /// Fail fast with `ServiceNotReady` before any of the body is read
    pub fn check_ready(&self) -> ServiceResult<()> {
        let result = self.models.ensure_ready();
        if result.is_err() {
            self.metrics.count_upload(Outcome::NotReady);
        }
        result
    }

    /// Store `filename` for `user_id` and make it the user's active pipeline.
    ///
    /// Indexing starts only after the whole stream is durably stored. A failed
    /// build leaves the user's previous pipeline in place. Once this returns
    /// `Ok`, chat requests for the user see the new pipeline (or one built
    /// from an even newer upload).
    pub async fn handle_upload<S, E>(
        &self,
        user_id: &str,
        filename: &str,
        stream: S,
    ) -> ServiceResult<StoredDocument>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::fmt::Display,
    {
        let result = self.upload(user_id, filename, stream).await;
        self.metrics.count_upload(Outcome::of(&result));
        result
    }

    async fn upload<S, E>(
        &self,
        user_id: &str,
        filename: &str,
        stream: S,
    ) -> ServiceResult<StoredDocument>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::fmt::Display,
    {
        let model = self.models.ready_model()?;
        validate_user_id(user_id)?;

        let registry = &self.registry;
        let (document, generation) = self
            .store
            .persist_stamped(user_id, filename, stream, || registry.next_generation())
            .await?;

        let started = Instant::now();
        let built = self.builder.build(&document.path, Some(model)).await;
        self.metrics
            .index_build_seconds
            .observe(started.elapsed().as_secs_f64());

        let pipeline = built.map_err(|e| {
            warn!(
                user_id,
                path = %document.path.display(),
                error = %e,
                "Pipeline build failed, keeping previous pipeline"
            );
            e
        })?;

        if self
            .registry
            .put_if_newer(user_id, pipeline, generation)
            .await
        {
            info!(
                user_id,
                path = %document.path.display(),
                generation,
                "Document processed and pipeline installed"
            );
        } else {
            info!(
                user_id,
                generation,
                "Newer upload already installed, discarding this pipeline"
            );
        }

        Ok(document)
    }
}
