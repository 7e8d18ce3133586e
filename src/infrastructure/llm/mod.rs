//! Generation model backends

pub mod extractive;
pub mod openai_compat;
pub mod retry;

pub use extractive::{ExtractiveLoader, ExtractiveModel};
pub use openai_compat::{OpenAiCompatLoader, OpenAiCompatModel, OpenAiCompatSettings};
pub use retry::{AttemptError, RetryPolicy};

use anyhow::Result;
use std::sync::Arc;

use crate::domain::models::{ModelBackend, ModelConfig};
use crate::domain::ports::ModelLoader;

/// Build the loader for the configured backend
pub fn build_model_loader(config: &ModelConfig) -> Result<Arc<dyn ModelLoader>> {
    let loader: Arc<dyn ModelLoader> = match config.backend {
        ModelBackend::OpenAiCompatible => Arc::new(OpenAiCompatLoader::new(
            OpenAiCompatSettings::from(config),
            RetryPolicy::from(&config.retry),
        )?),
        ModelBackend::Extractive => Arc::new(ExtractiveLoader::new()),
    };
    Ok(loader)
}
