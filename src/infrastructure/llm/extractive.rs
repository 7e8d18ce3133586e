//! Offline extractive backend.
//!
//! Needs no network or weights: the "completion" is the top-ranked passage
//! quoted in the prompt. Useful for air-gapped deployments and tests.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::domain::ports::{LanguageModel, ModelLoader};

const FALLBACK_ANSWER: &str = "I don't know.";
const FIRST_PASSAGE: &str = "[1] ";
const PASSAGE_END_MARKERS: [&str; 2] = ["\n[2] ", "\n\nQuestion:"];

#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveLoader;

impl ExtractiveLoader {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelLoader for ExtractiveLoader {
    async fn load(&self, model_id: &str, _cache_dir: &Path) -> Result<Arc<dyn LanguageModel>> {
        info!(model_id, "Using extractive backend, no weights to load");
        Ok(Arc::new(ExtractiveModel {
            model_id: model_id.to_string(),
        }))
    }
}

#[derive(Debug, Clone)]
pub struct ExtractiveModel {
    model_id: String,
}

impl ExtractiveModel {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
        }
    }

    /// First passage of the prompt's context block, trimmed
    fn top_passage(prompt: &str) -> Option<&str> {
        let start = prompt.find(FIRST_PASSAGE)? + FIRST_PASSAGE.len();
        let rest = &prompt[start..];
        let end = PASSAGE_END_MARKERS
            .iter()
            .filter_map(|marker| rest.find(marker))
            .min()
            .unwrap_or(rest.len());

        let passage = rest[..end].trim();
        (!passage.is_empty()).then_some(passage)
    }
}

#[async_trait]
impl LanguageModel for ExtractiveModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let answer = Self::top_passage(prompt).unwrap_or(FALLBACK_ANSWER);
        Ok(format!(" {}", answer))
    }
}
