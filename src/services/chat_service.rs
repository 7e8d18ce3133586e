//! Query orchestration: readiness, document, pipeline, answer

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use crate::domain::models::{extract_answer, validate_user_id};
use crate::domain::{ServiceError, ServiceResult};
use crate::services::document_store::DocumentStore;
use crate::services::metrics::{Outcome, ServiceMetrics};
use crate::services::model_manager::ModelManager;
use crate::services::pipeline_registry::PipelineRegistry;

/// Answers chat queries from each user's installed pipeline
pub struct ChatService {
    models: Arc<ModelManager>,
    store: Arc<DocumentStore>,
    registry: Arc<PipelineRegistry>,
    metrics: Arc<ServiceMetrics>,
}

impl ChatService {
    pub fn new(
        models: Arc<ModelManager>,
        store: Arc<DocumentStore>,
        registry: Arc<PipelineRegistry>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            models,
            store,
            registry,
            metrics,
        }
    }

    /// Answer `query` from the user's latest document.
    ///
    /// Preconditions are checked in order: model ready, a stored document,
    /// a registry entry. Every call is counted and timed, whatever the outcome.
    pub async fn handle_chat(&self, user_id: &str, query: &str) -> ServiceResult<String> {
        self.metrics.chat_requests_total.inc();
        let started = Instant::now();

        let result = self.chat(user_id, query).await;

        self.metrics
            .observe_chat(Outcome::of(&result), started.elapsed().as_secs_f64());
        result
    }

    async fn chat(&self, user_id: &str, query: &str) -> ServiceResult<String> {
        self.models.ensure_ready()?;
        validate_user_id(user_id)?;

        let document = self
            .store
            .latest_for_user(user_id)
            .await?
            .ok_or(ServiceError::NoDocumentForUser)?;

        let pipeline = self
            .registry
            .get(user_id)
            .await
            .ok_or(ServiceError::PipelineNotReady)?;

        debug!(
            user_id,
            latest_document = %document.path.display(),
            pipeline_source = %pipeline.source().display(),
            "Answering chat request"
        );

        match pipeline.invoke(query).await {
            Ok(output) => Ok(extract_answer(&output.result)),
            Err(e) => {
                error!(user_id, error = %format!("{e:#}"), "Error processing chat request");
                Err(ServiceError::Generation(e.to_string()))
            }
        }
    }
}
