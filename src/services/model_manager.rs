//! Model lifecycle and readiness gate
//!
//! The readiness state and the model handle are published together through a
//! `watch` channel, so any request that observes `Ready` also observes the
//! handle installed by the same transition.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::models::ReadinessState;
use crate::domain::ports::{LanguageModel, ModelLoader};
use crate::domain::{ServiceError, ServiceResult};
use crate::services::metrics::ServiceMetrics;

/// Readiness state and the handle it vouches for
#[derive(Clone)]
pub struct ModelSlot {
    /// Current readiness of the shared model
    pub state: ReadinessState,
    /// Loaded model, present only while `state` is `Ready`
    pub handle: Option<Arc<dyn LanguageModel>>,
}

impl ModelSlot {
    const fn empty(state: ReadinessState) -> Self {
        Self {
            state,
            handle: None,
        }
    }
}

/// Owns the shared generation model and publishes its readiness
pub struct ModelManager {
    model_id: String,
    cache_dir: PathBuf,
    loader: Arc<dyn ModelLoader>,
    slot: watch::Sender<ModelSlot>,
    load_lock: Mutex<()>,
    metrics: Arc<ServiceMetrics>,
}

impl ModelManager {
    /// `cache_dir` is the model-specific directory the loader may write into
    pub fn new(
        model_id: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        loader: Arc<dyn ModelLoader>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        let (slot, _) = watch::channel(ModelSlot::empty(ReadinessState::NotLoaded));
        Self {
            model_id: model_id.into(),
            cache_dir: cache_dir.into(),
            loader,
            slot,
            load_lock: Mutex::new(()),
            metrics,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn state(&self) -> ReadinessState {
        self.slot.borrow().state
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Gate for request handling
    pub fn ensure_ready(&self) -> ServiceResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ServiceError::ServiceNotReady)
        }
    }

    /// The shared handle, only once the model is ready
    pub fn ready_model(&self) -> ServiceResult<Arc<dyn LanguageModel>> {
        let slot = self.slot.borrow();
        match (&slot.state, &slot.handle) {
            (ReadinessState::Ready, Some(handle)) => Ok(Arc::clone(handle)),
            _ => Err(ServiceError::ServiceNotReady),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ModelSlot> {
        self.slot.subscribe()
    }

    /// Wait until a load attempt has finished, returning `Ready` or `Failed`
    pub async fn wait_settled(&self) -> ReadinessState {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|slot| matches!(slot.state, ReadinessState::Ready | ReadinessState::Failed))
            .await
            .map(|slot| slot.state);
        // The sender lives in `self`, so the channel cannot close here
        settled.unwrap_or_else(|_| self.state())
    }

    /// Load the model. Attempts are serialized; a ready manager never reloads.
    ///
    /// A `Failed` manager may be retried by calling `load` again, nothing
    /// retries automatically.
    pub async fn load(&self) -> ServiceResult<()> {
        let _guard = self.load_lock.lock().await;

        if self.is_ready() {
            warn!(model_id = %self.model_id, "Model already loaded, ignoring reload request");
            return Ok(());
        }

        self.transition(ModelSlot::empty(ReadinessState::Loading));
        info!(
            model_id = %self.model_id,
            cache_dir = %self.cache_dir.display(),
            "Loading model"
        );

        let started = Instant::now();
        match self.loader.load(&self.model_id, &self.cache_dir).await {
            Ok(handle) => {
                let elapsed = started.elapsed();
                self.transition(ModelSlot {
                    state: ReadinessState::Ready,
                    handle: Some(handle),
                });
                self.metrics.model_load_seconds.observe(elapsed.as_secs_f64());
                self.metrics.model_ready.set(1);
                info!(
                    model_id = %self.model_id,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Model loaded successfully"
                );
                Ok(())
            }
            Err(e) => {
                self.transition(ModelSlot::empty(ReadinessState::Failed));
                self.metrics.model_ready.set(0);
                error!(model_id = %self.model_id, error = %format!("{e:#}"), "Error loading model");
                Err(ServiceError::ModelLoad(e.to_string()))
            }
        }
    }

    /// Run [`ModelManager::load`] on a background task
    pub fn spawn_load(self: &Arc<Self>) -> JoinHandle<ServiceResult<()>> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.load().await })
    }

    fn transition(&self, next: ModelSlot) {
        self.slot.send_modify(|slot| {
            debug_assert!(
                slot.state == next.state || slot.state.can_transition_to(next.state),
                "illegal readiness transition {} -> {}",
                slot.state,
                next.state
            );
            *slot = next;
        });
    }
}
