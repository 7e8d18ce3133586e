//! Composition root
//!
//! Wires configuration into the service graph and runs the HTTP server with
//! its background tasks.

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::adapters::http::{build_router, serve_with_shutdown, AppState};
use crate::application::resource_monitor::ResourceMonitor;
use crate::domain::models::Config;
use crate::domain::ports::{ModelLoader, PipelineBuilder, ResourceProbe};
use crate::infrastructure::build_model_loader;
use crate::services::{
    ChatService, DocumentIndexer, DocumentStore, HealthReporter, ModelManager, PipelineRegistry,
    ServiceMetrics, UploadService,
};

pub struct Application {
    config: Config,
    metrics: Arc<ServiceMetrics>,
    models: Arc<ModelManager>,
    registry: Arc<PipelineRegistry>,
    store: Arc<DocumentStore>,
    monitor: Arc<ResourceMonitor>,
    state: Arc<AppState>,
}

impl Application {
    /// Build with the configured model backend and the local indexer
    pub fn build(config: Config) -> Result<Self> {
        let loader = build_model_loader(&config.model).context("Failed to create model loader")?;
        let indexer = DocumentIndexer::with_defaults(config.chunking.clone(), config.retrieval.clone())
            .context("Failed to create document indexer")?;
        Self::with_components(config, loader, Arc::new(indexer))
    }

    /// Build with caller-supplied model loader and pipeline builder
    pub fn with_components(
        config: Config,
        loader: Arc<dyn ModelLoader>,
        builder: Arc<dyn PipelineBuilder>,
    ) -> Result<Self> {
        let metrics = Arc::new(ServiceMetrics::new().context("Failed to register metrics")?);

        let models = Arc::new(ModelManager::new(
            config.model.identifier.clone(),
            config.model.model_dir(),
            loader,
            Arc::clone(&metrics),
        ));
        let registry = Arc::new(
            PipelineRegistry::new(config.registry.idle_ttl_secs.map(Duration::from_secs))
                .with_metrics(Arc::clone(&metrics)),
        );
        let store = Arc::new(DocumentStore::new(&config.storage));
        let monitor = Arc::new(ResourceMonitor::new(
            config.monitor.memory_warn_mb,
            Arc::clone(&metrics),
        )?);

        let upload = Arc::new(UploadService::new(
            Arc::clone(&models),
            Arc::clone(&store),
            builder,
            Arc::clone(&registry),
            Arc::clone(&metrics),
        ));
        let chat = Arc::new(ChatService::new(
            Arc::clone(&models),
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&metrics),
        ));
        let probe: Arc<dyn ResourceProbe> = monitor.clone();
        let health = Arc::new(
            HealthReporter::new(Arc::clone(&models), Arc::clone(&registry)).with_probe(probe),
        );

        let state = Arc::new(AppState::new(
            upload,
            chat,
            health,
            Arc::clone(&metrics),
            &config.model,
        ));

        Ok(Self {
            config,
            metrics,
            models,
            registry,
            store,
            monitor,
            state,
        })
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn model_manager(&self) -> &Arc<ModelManager> {
        &self.models
    }

    pub fn registry(&self) -> &Arc<PipelineRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    pub fn router(&self) -> Router {
        build_router(
            Arc::clone(&self.state),
            self.config.storage.max_upload_bytes,
            self.config.server.enable_cors,
        )
    }

    /// Load the model, then serve until `shutdown` resolves.
    ///
    /// A failed model load does not stop the server: it keeps answering with
    /// 503 and reports unhealthy.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.store
            .ensure_dir()
            .await
            .context("Failed to create upload directory")?;

        let monitor_handle = self
            .monitor
            .start(Duration::from_secs(self.config.monitor.interval_secs));

        let (janitor_tx, janitor_rx) = broadcast::channel(1);
        let janitor_handle = self.registry.spawn_janitor(
            Duration::from_secs(self.config.registry.eviction_interval_secs),
            janitor_rx,
        );

        if self.config.model.load_in_background {
            info!(model_id = %self.models.model_id(), "Loading model in the background");
            drop(self.models.spawn_load());
        } else if let Err(e) = self.models.load().await {
            error!(error = %e, "Model failed to load, serving in unhealthy state");
        }

        let result = serve_with_shutdown(self.router(), &self.config.server, shutdown).await;

        info!("HTTP server stopped, shutting down background tasks");
        if let Err(e) = self.monitor.shutdown() {
            warn!(error = %e, "Resource monitor was not running");
        }
        let _ = janitor_tx.send(());
        let _ = monitor_handle.await;
        if let Some(handle) = janitor_handle {
            let _ = handle.await;
        }

        result
    }
}
