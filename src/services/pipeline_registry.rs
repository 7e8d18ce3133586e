//! Per-user pipeline registry
//!
//! Maps `user_id` to the pipeline built from that user's latest document.
//! Pipelines are swapped in as whole `Arc`s under a write lock, so a reader
//! sees either the previous pipeline or the new one, never a partial build.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::ports::RetrievalPipeline;
use crate::services::metrics::ServiceMetrics;

struct RegistryEntry {
    pipeline: Arc<dyn RetrievalPipeline>,
    generation: u64,
    /// Milliseconds since the registry epoch
    last_access_ms: AtomicU64,
}

pub struct PipelineRegistry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
    next_generation: AtomicU64,
    epoch: Instant,
    idle_ttl: Option<Duration>,
    metrics: Option<Arc<ServiceMetrics>>,
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PipelineRegistry {
    /// `idle_ttl` of `None` keeps entries for the life of the process
    pub fn new(idle_ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            epoch: Instant::now(),
            idle_ttl,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<ServiceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Reserve a generation number; later reservations always compare newer
    pub fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst)
    }

    /// Install `pipeline` for `user_id`, replacing any previous entry
    pub async fn put(&self, user_id: &str, pipeline: Arc<dyn RetrievalPipeline>) {
        let generation = self.next_generation();
        let mut entries = self.entries.write().await;
        entries.insert(user_id.to_string(), self.entry(pipeline, generation));
        self.record_size(entries.len());
        debug!(user_id, generation, "Pipeline installed");
    }

    /// Install `pipeline` only if `generation` is newer than the installed one.
    ///
    /// Returns whether the pipeline was installed.
    pub async fn put_if_newer(
        &self,
        user_id: &str,
        pipeline: Arc<dyn RetrievalPipeline>,
        generation: u64,
    ) -> bool {
        let mut entries = self.entries.write().await;
        if let Some(current) = entries.get(user_id) {
            if current.generation >= generation {
                debug!(
                    user_id,
                    generation,
                    installed = current.generation,
                    "Discarding pipeline superseded by a newer upload"
                );
                return false;
            }
        }

        entries.insert(user_id.to_string(), self.entry(pipeline, generation));
        self.record_size(entries.len());
        debug!(user_id, generation, "Pipeline installed");
        true
    }

    pub async fn get(&self, user_id: &str) -> Option<Arc<dyn RetrievalPipeline>> {
        let entries = self.entries.read().await;
        entries.get(user_id).map(|entry| {
            entry
                .last_access_ms
                .store(self.now_ms(), Ordering::Relaxed);
            Arc::clone(&entry.pipeline)
        })
    }

    pub async fn contains(&self, user_id: &str) -> bool {
        self.entries.read().await.contains_key(user_id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop entries idle for longer than the TTL; returns how many were removed
    pub async fn evict_idle(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let now = self.now_ms();

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|user_id, entry| {
            let idle = now.saturating_sub(entry.last_access_ms.load(Ordering::Relaxed));
            let keep = idle <= ttl_ms;
            if !keep {
                info!(user_id = %user_id, idle_ms = idle, "Evicting idle pipeline");
            }
            keep
        });
        self.record_size(entries.len());
        before - entries.len()
    }

    /// Spawn the periodic eviction task. Returns `None` when no TTL is set.
    pub fn spawn_janitor(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Option<JoinHandle<()>> {
        if self.idle_ttl.is_none() {
            return None;
        }
        let registry = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = registry.evict_idle().await;
                        if evicted > 0 {
                            info!(evicted, "Registry janitor evicted idle pipelines");
                        }
                    }
                    _ = shutdown.recv() => {
                        debug!("Registry janitor shutting down");
                        break;
                    }
                }
            }
        }))
    }

    fn entry(&self, pipeline: Arc<dyn RetrievalPipeline>, generation: u64) -> RegistryEntry {
        RegistryEntry {
            pipeline,
            generation,
            last_access_ms: AtomicU64::new(self.now_ms()),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn record_size(&self, len: usize) {
        if let Some(metrics) = &self.metrics {
            metrics
                .pipelines_active
                .set(i64::try_from(len).unwrap_or(i64::MAX));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PipelineOutput;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};

    struct NamedPipeline {
        path: PathBuf,
    }

    fn pipeline(name: &str) -> Arc<dyn RetrievalPipeline> {
        Arc::new(NamedPipeline {
            path: PathBuf::from(name),
        })
    }

    #[async_trait]
    impl RetrievalPipeline for NamedPipeline {
        async fn invoke(&self, _query: &str) -> anyhow::Result<PipelineOutput> {
            Ok(PipelineOutput::new(self.path.display().to_string()))
        }

        fn source(&self) -> &Path {
            &self.path
        }
    }

    #[tokio::test]
    async fn test_get_after_put_returns_same_pipeline() {
        let registry = PipelineRegistry::default();
        let p = pipeline("a.pdf");
        registry.put("user1", p.clone()).await;

        let got = registry.get("user1").await.unwrap();
        assert!(Arc::ptr_eq(&got, &p));
        assert!(registry.get("user2").await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let registry = PipelineRegistry::default();
        registry.put("user1", pipeline("old.pdf")).await;
        registry.put("user1", pipeline("new.pdf")).await;

        assert_eq!(registry.len().await, 1);
        let got = registry.get("user1").await.unwrap();
        assert_eq!(got.source(), Path::new("new.pdf"));
    }

    #[tokio::test]
    async fn test_put_if_newer_rejects_stale_generation() {
        let registry = PipelineRegistry::default();
        let older = registry.next_generation();
        let newer = registry.next_generation();

        assert!(registry.put_if_newer("u", pipeline("newer.pdf"), newer).await);
        assert!(!registry.put_if_newer("u", pipeline("older.pdf"), older).await);

        let got = registry.get("u").await.unwrap();
        assert_eq!(got.source(), Path::new("newer.pdf"));
    }

    #[tokio::test]
    async fn test_evict_idle_disabled_without_ttl() {
        let registry = PipelineRegistry::default();
        registry.put("u", pipeline("a.pdf")).await;
        assert_eq!(registry.evict_idle().await, 0);
        assert!(registry.contains("u").await);
    }

    #[tokio::test]
    async fn test_evict_idle_removes_stale_entries() {
        let registry = PipelineRegistry::new(Some(Duration::from_millis(20)));
        registry.put("idle", pipeline("a.pdf")).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        registry.put("fresh", pipeline("b.pdf")).await;

        assert_eq!(registry.evict_idle().await, 1);
        assert!(!registry.contains("idle").await);
        assert!(registry.contains("fresh").await);
    }

    #[tokio::test]
    async fn test_metrics_track_occupancy() {
        let metrics = Arc::new(ServiceMetrics::new().unwrap());
        let registry = PipelineRegistry::default().with_metrics(metrics.clone());
        registry.put("a", pipeline("a.pdf")).await;
        registry.put("b", pipeline("b.pdf")).await;
        registry.put("a", pipeline("a2.pdf")).await;

        assert_eq!(metrics.pipelines_active.get(), 2);
    }

    #[tokio::test]
    async fn test_janitor_not_spawned_without_ttl() {
        let registry = Arc::new(PipelineRegistry::default());
        let (_tx, rx) = broadcast::channel(1);
        assert!(registry.spawn_janitor(Duration::from_secs(1), rx).is_none());
    }
}
