//! Vector infrastructure components
//!
//! Text chunking, embedding generation and the in-memory similarity index
//! each pipeline owns.

pub mod chunker;
pub mod embedding_service;
pub mod vector_index;

pub use chunker::TokenChunker;
pub use embedding_service::HashedEmbeddingService;
pub use vector_index::VectorIndex;
