//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty stdout
//! - Rolling JSON log files

pub mod logger;

pub use logger::{LogFormat, LoggerImpl, RotationPolicy};
