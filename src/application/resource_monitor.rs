use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{MemoryRefreshKind, Pid, ProcessesToUpdate, RefreshKind, System};
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::domain::models::ResourceStatus;
use crate::domain::ports::ResourceProbe;
use crate::services::metrics::ServiceMetrics;

/// Background memory monitor
///
/// Samples this process's resident memory and host memory usage at a fixed
/// interval, caches the latest sample for health reporting, feeds the
/// `rag_process_memory_bytes` gauge and warns above `memory_warn_mb`.
///
/// Uses tokio primitives for concurrent monitoring:
/// - RwLock for the cached sample (read-heavy access pattern)
/// - broadcast channel for the shutdown signal
/// - interval timer with select! for graceful shutdown
pub struct ResourceMonitor {
    system: Arc<RwLock<System>>,
    pid: Pid,
    memory_warn_mb: u64,
    current_status: Arc<RwLock<Option<ResourceStatus>>>,
    metrics: Arc<ServiceMetrics>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ResourceMonitor {
    pub fn new(memory_warn_mb: u64, metrics: Arc<ServiceMetrics>) -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| anyhow!("Cannot resolve own pid: {e}"))?;
        let system = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
        );
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            system: Arc::new(RwLock::new(system)),
            pid,
            memory_warn_mb,
            current_status: Arc::new(RwLock::new(None)),
            metrics,
            shutdown_tx,
        })
    }

    /// Start the background sampling task.
    ///
    /// Returns a JoinHandle that completes when the monitor shuts down.
    pub fn start(&self, interval_duration: Duration) -> tokio::task::JoinHandle<()> {
        let system = Arc::clone(&self.system);
        let current_status = Arc::clone(&self.current_status);
        let metrics = Arc::clone(&self.metrics);
        let pid = self.pid;
        let memory_warn_mb = self.memory_warn_mb;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut check_interval = interval(interval_duration);

            info!(
                interval_secs = interval_duration.as_secs(),
                memory_warn_mb,
                "Resource monitor started"
            );

            loop {
                tokio::select! {
                    _ = check_interval.tick() => {
                        let status = {
                            let mut sys = system.write().await;
                            sample(&mut sys, pid)
                        };
                        record(&status, &metrics, memory_warn_mb);
                        *current_status.write().await = Some(status);
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Resource monitor shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Most recent cached sample, or None before the first check
    pub async fn get_status(&self) -> Option<ResourceStatus> {
        self.current_status.read().await.clone()
    }

    /// Take a sample now and cache it
    pub async fn check_resources(&self) -> ResourceStatus {
        let status = {
            let mut sys = self.system.write().await;
            sample(&mut sys, self.pid)
        };
        record(&status, &self.metrics, self.memory_warn_mb);
        *self.current_status.write().await = Some(status.clone());
        status
    }

    /// Signal the background task to stop
    pub fn shutdown(&self) -> Result<()> {
        info!("Initiating resource monitor shutdown");
        self.shutdown_tx
            .send(())
            .map(|_| ())
            .context("Failed to send shutdown signal")
    }
}

#[async_trait]
impl ResourceProbe for ResourceMonitor {
    async fn latest_status(&self) -> Option<ResourceStatus> {
        self.get_status().await
    }
}

fn sample(sys: &mut System, pid: Pid) -> ResourceStatus {
    sys.refresh_memory();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    ResourceStatus {
        process_memory_bytes: sys.process(pid).map_or(0, sysinfo::Process::memory),
        system_used_memory_mb: sys.used_memory() / 1024 / 1024,
        system_total_memory_mb: sys.total_memory() / 1024 / 1024,
        timestamp: chrono::Utc::now(),
    }
}

fn record(status: &ResourceStatus, metrics: &ServiceMetrics, memory_warn_mb: u64) {
    metrics
        .process_memory_bytes
        .set(i64::try_from(status.process_memory_bytes).unwrap_or(i64::MAX));

    let memory_mb = status.process_memory_mb();
    if memory_mb > memory_warn_mb {
        warn!(
            memory_mb,
            memory_warn_mb,
            system_used_memory_mb = status.system_used_memory_mb,
            "Process memory above warning threshold"
        );
    } else {
        debug!(
            memory_mb,
            system_used_memory_mb = status.system_used_memory_mb,
            "Resource check completed"
        );
    }
}
