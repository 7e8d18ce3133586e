pub mod chat_service;
pub mod document_indexer;
pub mod document_store;
pub mod health;
pub mod metrics;
pub mod model_manager;
pub mod pipeline_registry;
pub mod rag_pipeline;
pub mod upload_service;

pub use chat_service::ChatService;
pub use document_indexer::DocumentIndexer;
pub use document_store::DocumentStore;
pub use health::{HealthReport, HealthReporter};
pub use metrics::{Outcome, ServiceMetrics};
pub use model_manager::{ModelManager, ModelSlot};
pub use pipeline_registry::PipelineRegistry;
pub use rag_pipeline::{build_prompt, RagPipeline};
pub use upload_service::UploadService;
