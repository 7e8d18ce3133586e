//! Implementation of the `rag-pipeline serve` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use tracing::info;

use crate::application::Application;
use crate::infrastructure::{ConfigLoader, ConfigOverrides, LoggerImpl};

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Generation model identifier
    #[arg(short, long)]
    pub model: Option<String>,
}

impl From<&ServeArgs> for ConfigOverrides {
    fn from(args: &ServeArgs) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            model: args.model.clone(),
        }
    }
}

pub async fn execute(args: ServeArgs, config_file: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load_with_overrides(config_file, &ConfigOverrides::from(&args))
        .context("Failed to load configuration")?;

    // Held until exit so file logs are flushed
    let _logger = LoggerImpl::init(&config.logging).context("Failed to initialize logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        model_id = %config.model.identifier,
        backend = %config.model.backend,
        upload_dir = %config.storage.upload_dir.display(),
        "Starting RAG pipeline"
    );

    let app = Application::build(config)?;
    app.run(shutdown_signal()).await
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
