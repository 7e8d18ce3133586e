//! Common test utilities for integration tests
//!
//! Provides shared fixtures, fake collaborators and a service harness used
//! across multiple integration test files.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

use rag_pipeline::domain::models::{Config, ModelBackend, PipelineOutput};
use rag_pipeline::domain::ports::{LanguageModel, ModelLoader, PipelineBuilder, RetrievalPipeline};
use rag_pipeline::domain::{ServiceError, ServiceResult};
use rag_pipeline::infrastructure::llm::ExtractiveLoader;
use rag_pipeline::services::{
    ChatService, DocumentIndexer, DocumentStore, ModelManager, PipelineRegistry, ServiceMetrics,
    UploadService,
};

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Configuration rooted in `dir` using the offline extractive backend
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.model.backend = ModelBackend::Extractive;
    config.model.identifier = "test/extractive".to_string();
    config.model.cache_dir = dir.join("models");
    config.storage.upload_dir = dir.join("uploads");
    config.storage.max_upload_bytes = 64 * 1024;
    config.monitor.interval_secs = 1;
    config
}

/// Body stream made of `parts`
pub fn body(parts: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
    let chunks: Vec<Result<Bytes, std::io::Error>> = parts
        .iter()
        .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
        .collect();
    stream::iter(chunks)
}

/// Body stream that fails after yielding `parts`
pub fn broken_body(parts: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
    let mut chunks: Vec<Result<Bytes, std::io::Error>> = parts
        .iter()
        .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
        .collect();
    chunks.push(Err(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "client went away",
    )));
    stream::iter(chunks)
}

/// Wait for a condition to be true with timeout
pub async fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Model that answers with a fixed string, or fails when `fail` is set
pub struct ScriptedModel {
    pub answer: String,
    pub fail: bool,
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "test/scripted"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        if self.fail {
            Err(anyhow!("CUDA out of memory at /secret/path"))
        } else {
            Ok(self.answer.clone())
        }
    }
}

/// Loader handing out a fixed model
pub struct FixedLoader(pub Arc<dyn LanguageModel>);

#[async_trait]
impl ModelLoader for FixedLoader {
    async fn load(&self, _model_id: &str, _cache_dir: &Path) -> Result<Arc<dyn LanguageModel>> {
        Ok(Arc::clone(&self.0))
    }
}

/// Loader that blocks until released, then delegates to the extractive loader
pub struct GatedLoader {
    gate: Notify,
    inner: ExtractiveLoader,
    pub calls: AtomicUsize,
}

impl GatedLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Notify::new(),
            inner: ExtractiveLoader::new(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl ModelLoader for GatedLoader {
    async fn load(&self, model_id: &str, cache_dir: &Path) -> Result<Arc<dyn LanguageModel>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.inner.load(model_id, cache_dir).await
    }
}

/// Loader that always fails
pub struct FailingLoader;

#[async_trait]
impl ModelLoader for FailingLoader {
    async fn load(&self, _model_id: &str, _cache_dir: &Path) -> Result<Arc<dyn LanguageModel>> {
        Err(anyhow!("weights not found"))
    }
}

/// Pipeline that answers with the name of the document it was built from,
/// or with the model's completion when it holds a model
pub struct EchoPipeline {
    pub source: PathBuf,
    pub model: Option<Arc<dyn LanguageModel>>,
}

#[async_trait]
impl RetrievalPipeline for EchoPipeline {
    async fn invoke(&self, query: &str) -> Result<PipelineOutput> {
        let completion = match &self.model {
            Some(model) => model.generate(query).await?,
            None => self
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        Ok(PipelineOutput {
            result: format!("Question: {query}\nAnswer: {completion}"),
            sources: Vec::new(),
        })
    }

    fn source(&self) -> &Path {
        &self.source
    }
}

/// Builder with scripted behavior keyed on the stored file name
#[derive(Default)]
pub struct ScriptedBuilder {
    /// Documents whose file name contains this fail to build
    pub fail_on: Option<String>,
    /// Documents whose file name contains this take the given time to build
    pub slow_on: Option<(String, Duration)>,
    /// Pass the model handle into built pipelines
    pub use_model: bool,
    pub builds: AtomicUsize,
}

#[async_trait]
impl PipelineBuilder for ScriptedBuilder {
    async fn build(
        &self,
        document_path: &Path,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> ServiceResult<Arc<dyn RetrievalPipeline>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let name = document_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some((needle, delay)) = &self.slow_on {
            if name.contains(needle.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }
        if let Some(needle) = &self.fail_on {
            if name.contains(needle.as_str()) {
                return Err(ServiceError::IndexBuild("scripted failure".to_string()));
            }
        }
        let Some(model) = model else {
            return Err(ServiceError::ModelUnavailable);
        };

        Ok(Arc::new(EchoPipeline {
            source: document_path.to_path_buf(),
            model: self.use_model.then_some(model),
        }))
    }
}

/// Service graph wired the way the application wires it
pub struct Harness {
    pub dir: TempDir,
    pub config: Config,
    pub metrics: Arc<ServiceMetrics>,
    pub models: Arc<ModelManager>,
    pub registry: Arc<PipelineRegistry>,
    pub store: Arc<DocumentStore>,
    pub upload: Arc<UploadService>,
    pub chat: Arc<ChatService>,
}

impl Harness {
    pub fn new(loader: Arc<dyn ModelLoader>, builder: Arc<dyn PipelineBuilder>) -> Self {
        let dir = temp_dir();
        let config = test_config(dir.path());
        let metrics = Arc::new(ServiceMetrics::new().unwrap());
        let models = Arc::new(ModelManager::new(
            config.model.identifier.clone(),
            config.model.model_dir(),
            loader,
            Arc::clone(&metrics),
        ));
        let registry = Arc::new(PipelineRegistry::new(None).with_metrics(Arc::clone(&metrics)));
        let store = Arc::new(DocumentStore::new(&config.storage));
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

        Self {
            dir,
            config,
            metrics,
            models,
            registry,
            store,
            upload,
            chat,
        }
    }

    /// Extractive model with the real indexer
    pub fn extractive() -> Self {
        let defaults = Config::default();
        let indexer = DocumentIndexer::with_defaults(defaults.chunking, defaults.retrieval)
            .expect("Failed to create indexer");
        Self::new(Arc::new(ExtractiveLoader::new()), Arc::new(indexer))
    }

    /// Scripted builder over the extractive loader
    pub fn scripted(builder: ScriptedBuilder) -> Self {
        Self::new(Arc::new(ExtractiveLoader::new()), Arc::new(builder))
    }

    pub async fn ready(self) -> Self {
        self.models.load().await.expect("Model failed to load");
        self
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.config.storage.upload_dir.clone()
    }
}
