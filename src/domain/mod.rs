//! Domain layer for the RAG pipeline service
//!
//! Core models, the error taxonomy and the ports infrastructure implements.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ServiceError, ServiceResult, OPAQUE_FAILURE};
