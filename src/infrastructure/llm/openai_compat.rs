//! OpenAI-compatible inference server backend.
//!
//! Works against any server exposing `/v1/models` and `/v1/completions`
//! (vLLM, llama.cpp server, Ollama, text-generation-inference).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::retry::{AttemptError, RetryPolicy};
use crate::domain::models::ModelConfig;
use crate::domain::ports::{LanguageModel, ModelLoader};

/// Manifest written into the model cache directory after a successful load
pub const MANIFEST_FILE: &str = "model.json";

#[derive(Debug, Clone)]
pub struct OpenAiCompatSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl From<&ModelConfig> for OpenAiCompatSettings {
    fn from(config: &ModelConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Loads models served by an OpenAI-compatible endpoint
pub struct OpenAiCompatLoader {
    settings: OpenAiCompatSettings,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiCompatLoader {
    pub fn new(settings: OpenAiCompatSettings, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            settings,
            retry,
            client,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.settings.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, AttemptError> {
        let url = format!("{}/v1/models", self.settings.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(AttemptError::from_status(
                status,
                anyhow!("Model listing returned {}: {}", status, body),
            ));
        }

        let listing: ModelList = response
            .json()
            .await
            .map_err(|e| AttemptError::Permanent(anyhow!("Failed to parse model listing: {}", e)))?;

        Ok(listing.data.into_iter().map(|m| m.id).collect())
    }

    async fn write_manifest(&self, model_id: &str, cache_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(cache_dir)
            .await
            .with_context(|| format!("Failed to create model cache dir {}", cache_dir.display()))?;

        let manifest = ModelManifest {
            model_id: model_id.to_string(),
            backend: "openai_compatible".to_string(),
            base_url: self.settings.base_url.clone(),
            loaded_at: chrono::Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&manifest)?;
        let path = cache_dir.join(MANIFEST_FILE);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write model manifest {}", path.display()))?;

        Ok(())
    }
}

#[async_trait]
impl ModelLoader for OpenAiCompatLoader {
    async fn load(&self, model_id: &str, cache_dir: &Path) -> Result<Arc<dyn LanguageModel>> {
        info!(
            model_id,
            base_url = %self.settings.base_url,
            "Connecting to inference server"
        );

        let served = self
            .retry
            .execute(|| async {
                let models = self.list_models().await?;
                if models.iter().any(|m| m == model_id) {
                    Ok(models)
                } else {
                    Err(AttemptError::Permanent(anyhow!(
                        "Model {} is not served by {} (available: {})",
                        model_id,
                        self.settings.base_url,
                        models.join(", ")
                    )))
                }
            })
            .await
            .with_context(|| format!("Failed to load model {}", model_id))?;

        debug!(model_id, served = served.len(), "Inference server lists model");
        self.write_manifest(model_id, cache_dir).await?;

        Ok(Arc::new(OpenAiCompatModel {
            model_id: model_id.to_string(),
            settings: self.settings.clone(),
            client: self.client.clone(),
        }))
    }
}

/// Handle to a model behind an OpenAI-compatible completions endpoint
pub struct OpenAiCompatModel {
    model_id: String,
    settings: OpenAiCompatSettings,
    client: reqwest::Client,
}

#[async_trait]
impl LanguageModel for OpenAiCompatModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/completions", self.settings.base_url);
        let body = CompletionRequest {
            model: &self.model_id,
            prompt,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(anyhow!("Completion endpoint returned {}: {}", status, body));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| anyhow!("Completion response contained no choices"))
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelManifest {
    model_id: String,
    backend: String,
    base_url: String,
    loaded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}
