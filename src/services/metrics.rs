//! Prometheus metrics for the RAG service
//!
//! Each [`ServiceMetrics`] owns a private registry, so independent instances
//! (one per test, one per application) never collide on metric names.

use anyhow::{Context, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];
const LOAD_BUCKETS: &[f64] = &[1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// Outcome label for chat latency and upload counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ClientError,
    NotReady,
    ServerError,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ClientError => "client_error",
            Self::NotReady => "not_ready",
            Self::ServerError => "server_error",
        }
    }

    pub fn of<T>(result: &crate::domain::ServiceResult<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) if e.is_readiness_error() => Self::NotReady,
            Err(e) if e.is_client_error() => Self::ClientError,
            Err(_) => Self::ServerError,
        }
    }
}

pub struct ServiceMetrics {
    registry: Registry,
    pub model_load_seconds: Histogram,
    pub model_ready: IntGauge,
    pub chat_requests_total: IntCounter,
    pub chat_latency_seconds: HistogramVec,
    pub uploads_total: IntCounterVec,
    pub index_build_seconds: Histogram,
    pub pipelines_active: IntGauge,
    pub process_memory_bytes: IntGauge,
}

impl ServiceMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let model_load_seconds = Histogram::with_opts(
            HistogramOpts::new("rag_model_load_seconds", "Time spent loading the generation model")
                .buckets(LOAD_BUCKETS.to_vec()),
        )?;
        let model_ready = IntGauge::new("rag_model_ready", "1 when the generation model is ready")?;
        let chat_requests_total =
            IntCounter::new("rag_chat_requests_total", "Total number of chat requests")?;
        let chat_latency_seconds = HistogramVec::new(
            HistogramOpts::new("rag_chat_latency_seconds", "End-to-end chat request latency")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["outcome"],
        )?;
        let uploads_total = IntCounterVec::new(
            Opts::new("rag_uploads_total", "Document uploads by outcome"),
            &["outcome"],
        )?;
        let index_build_seconds = Histogram::with_opts(
            HistogramOpts::new("rag_index_build_seconds", "Time spent building a document pipeline")
                .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        let pipelines_active =
            IntGauge::new("rag_pipelines_active", "Pipelines held in the registry")?;
        let process_memory_bytes =
            IntGauge::new("rag_process_memory_bytes", "Resident memory of this process")?;

        registry.register(Box::new(model_load_seconds.clone()))?;
        registry.register(Box::new(model_ready.clone()))?;
        registry.register(Box::new(chat_requests_total.clone()))?;
        registry.register(Box::new(chat_latency_seconds.clone()))?;
        registry.register(Box::new(uploads_total.clone()))?;
        registry.register(Box::new(index_build_seconds.clone()))?;
        registry.register(Box::new(pipelines_active.clone()))?;
        registry.register(Box::new(process_memory_bytes.clone()))?;

        Ok(Self {
            registry,
            model_load_seconds,
            model_ready,
            chat_requests_total,
            chat_latency_seconds,
            uploads_total,
            index_build_seconds,
            pipelines_active,
            process_memory_bytes,
        })
    }

    pub fn observe_chat(&self, outcome: Outcome, seconds: f64) {
        self.chat_latency_seconds
            .with_label_values(&[outcome.as_str()])
            .observe(seconds);
    }

    pub fn count_upload(&self, outcome: Outcome) {
        self.uploads_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Render every metric in the Prometheus text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output was not UTF-8")
    }

    pub fn content_type() -> &'static str {
        prometheus::TEXT_FORMAT
    }
}
