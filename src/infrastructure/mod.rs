//! Infrastructure layer module
//!
//! Concrete implementations of the domain ports and process-wide plumbing:
//! - Configuration management
//! - Logging
//! - Generation model backends
//! - Text extraction, chunking, embeddings and the vector index

pub mod config;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod vector;

pub use config::{ConfigError, ConfigLoader, ConfigOverrides};
pub use extract::FileTextExtractor;
pub use llm::build_model_loader;
pub use logging::LoggerImpl;
pub use vector::{HashedEmbeddingService, TokenChunker, VectorIndex};
