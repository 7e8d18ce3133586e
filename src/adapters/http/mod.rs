//! HTTP adapter: axum router over the service layer

pub mod error;
pub mod handlers;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use server::{build_router, serve_with_shutdown, AppState};
