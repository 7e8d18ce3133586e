//! Readiness and health reporting
//!
//! Reads only in-memory state, so probes can poll as often as they like.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::models::{ReadinessState, ResourceStatus};
use crate::domain::ports::ResourceProbe;
use crate::services::model_manager::ModelManager;
use crate::services::pipeline_registry::PipelineRegistry;

/// Point-in-time service health
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// `healthy` or `unhealthy`
    pub status: &'static str,
    /// Readiness of the shared model
    pub model_state: ReadinessState,
    /// Configured model identifier
    pub model_id: String,
    /// Number of installed user pipelines
    pub pipelines: usize,
    /// Seconds since the reporter was created
    pub uptime_secs: u64,
    /// Latest memory sample, when a probe is attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<ResourceStatus>,
}

impl HealthReport {
    pub const fn is_healthy(&self) -> bool {
        self.model_state.is_ready()
    }
}

/// Builds health reports from the model manager and registry
pub struct HealthReporter {
    models: Arc<ModelManager>,
    registry: Arc<PipelineRegistry>,
    probe: Option<Arc<dyn ResourceProbe>>,
    started: Instant,
}

impl HealthReporter {
    pub fn new(models: Arc<ModelManager>, registry: Arc<PipelineRegistry>) -> Self {
        Self {
            models,
            registry,
            probe: None,
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ResourceProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn is_ready(&self) -> bool {
        self.models.is_ready()
    }

    pub async fn health(&self) -> HealthReport {
        let model_state = self.models.state();
        let memory = match &self.probe {
            Some(probe) => probe.latest_status().await,
            None => None,
        };

        HealthReport {
            status: if model_state.is_ready() {
                "healthy"
            } else {
                "unhealthy"
            },
            model_state,
            model_id: self.models.model_id().to_string(),
            pipelines: self.registry.len().await,
            uptime_secs: self.started.elapsed().as_secs(),
            memory,
        }
    }
}
