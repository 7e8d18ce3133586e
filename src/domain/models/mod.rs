pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod pipeline;
pub mod readiness;
pub mod resources;

pub use chunking::{Chunk, ChunkingConfig};
pub use config::{
    Config, LoggingConfig, ModelBackend, ModelConfig, MonitorConfig, RegistryConfig,
    RetrievalConfig, RetryConfig, ServerConfig, StorageConfig,
};
pub use document::{file_extension, sanitize_filename, validate_user_id, StoredDocument};
pub use embedding::SearchResult;
pub use pipeline::{extract_answer, PipelineOutput, ANSWER_MARKER};
pub use readiness::ReadinessState;
pub use resources::ResourceStatus;
