//! RAG Pipeline - per-user retrieval-augmented chat
//!
//! Users upload a document over HTTP; the service stores it, indexes it into
//! a per-user retrieval pipeline and answers chat queries against the user's
//! most recent document with a shared generation model.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, the error taxonomy and ports
//! - **Service Layer** (`services`): Model lifecycle, document store, registry and request flows
//! - **Application Layer** (`application`): Composition root and background tasks
//! - **Infrastructure Layer** (`infrastructure`): Config, logging, model backends, extraction and indexing
//! - **Adapters** (`adapters`): HTTP API
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use rag_pipeline::{Application, ConfigLoader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load(None)?;
//!     Application::build(config)?.run(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{Application, ResourceMonitor};
pub use domain::models::{Config, LoggingConfig, ModelConfig, ReadinessState, StoredDocument};
pub use domain::ports::{LanguageModel, ModelLoader, PipelineBuilder, RetrievalPipeline};
pub use domain::{ServiceError, ServiceResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ChatService, ModelManager, PipelineRegistry, UploadService};
