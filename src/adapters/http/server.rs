//! HTTP server for the RAG service.
//!
//! Exposes document upload, chat, health and Prometheus endpoints over the
//! service layer.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::types::{ConfigResponse, ModelDescriptor};
use crate::domain::models::{ModelConfig, ServerConfig};
use crate::services::{ChatService, HealthReporter, ServiceMetrics, UploadService};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub upload: Arc<UploadService>,
    pub chat: Arc<ChatService>,
    pub health: Arc<HealthReporter>,
    pub metrics: Arc<ServiceMetrics>,
    pub descriptor: ConfigResponse,
}

impl AppState {
    pub fn new(
        upload: Arc<UploadService>,
        chat: Arc<ChatService>,
        health: Arc<HealthReporter>,
        metrics: Arc<ServiceMetrics>,
        model: &ModelConfig,
    ) -> Self {
        Self {
            upload,
            chat,
            health,
            metrics,
            descriptor: ConfigResponse {
                backend_name: "rag-pipeline".to_string(),
                models: vec![ModelDescriptor {
                    id: model.alias.clone(),
                    name: model.display_name.clone(),
                }],
            },
        }
    }
}

/// Build the router.
pub fn build_router(state: Arc<AppState>, max_upload_bytes: u64, enable_cors: bool) -> Router {
    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let app = Router::new()
        .route("/metadata", get(handlers::metadata))
        .route("/health", get(handlers::health))
        .route(
            "/api/upload_pdf",
            post(handlers::upload_pdf).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/chat", post(handlers::chat))
        .route("/api/config", get(handlers::config))
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    if enable_cors {
        app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(TraceLayer::new_for_http())
    } else {
        app.layer(TraceLayer::new_for_http())
    }
}

/// Bind `config.host:config.port` and serve until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(
    router: Router,
    config: &ServerConfig,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "RAG pipeline HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
