use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::chunking::ChunkingConfig;

/// Main configuration structure for the RAG pipeline service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Generation model configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Uploaded document storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Document chunking
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval and prompt assembly
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Per-user pipeline registry
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Background resource monitor
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether to allow cross-origin requests
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: default_true(),
        }
    }
}

/// Which inference backend serves the generation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelBackend {
    /// OpenAI-compatible completion server (vLLM, llama.cpp, Ollama)
    #[serde(rename = "openai_compatible", alias = "openai")]
    OpenAiCompatible,
    /// Offline backend answering with the best retrieved passage
    Extractive,
}

impl std::fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAiCompatible => write!(f, "openai_compatible"),
            Self::Extractive => write!(f, "extractive"),
        }
    }
}

/// Generation model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    /// Model identifier, e.g. a Hugging Face repository name
    #[serde(default = "default_model_identifier")]
    pub identifier: String,

    /// Inference backend
    #[serde(default = "default_backend")]
    pub backend: ModelBackend,

    /// Base URL of the inference server (`openai_compatible` only)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for the inference server
    #[serde(default)]
    pub api_key: Option<String>,

    /// Root directory for per-model cache directories
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Short id reported by `/api/config`
    #[serde(default = "default_alias")]
    pub alias: String,

    /// Human-readable name reported by `/api/config`
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Maximum tokens generated per answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout against the inference server
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bind the HTTP server first and load the model in the background
    #[serde(default)]
    pub load_in_background: bool,

    /// Retry policy for transient failures while loading
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_model_identifier() -> String {
    "Qwen/Qwen2.5-0.5B-Instruct".to_string()
}

const fn default_backend() -> ModelBackend {
    ModelBackend::OpenAiCompatible
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".rag-pipeline/models")
}

fn default_alias() -> String {
    "qwen".to_string()
}

fn default_display_name() -> String {
    "Qwen 2.5 Instruct".to_string()
}

const fn default_max_tokens() -> u32 {
    256
}

const fn default_temperature() -> f32 {
    0.1
}

const fn default_timeout_secs() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            identifier: default_model_identifier(),
            backend: default_backend(),
            base_url: default_base_url(),
            api_key: None,
            cache_dir: default_cache_dir(),
            alias: default_alias(),
            display_name: default_display_name(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            load_in_background: false,
            retry: RetryConfig::default(),
        }
    }
}

impl ModelConfig {
    /// Cache directory for this model: `{cache_dir}/models--{org}--{name}`
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir
            .join(format!("models--{}", self.identifier.replace('/', "--")))
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    8000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Uploaded document storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Directory holding `{user_id}_{filename}` documents
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Accepted file extensions (lowercase, without dot)
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploaded_pdfs")
}

const fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["pdf".to_string(), "txt".to_string(), "md".to_string()]
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// Retrieval and prompt assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Number of chunks placed into the prompt
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Dimensions of the hashed embedding space
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Return prompt + completion as the raw result, like a text-generation pipeline
    #[serde(default = "default_true")]
    pub return_full_text: bool,
}

const fn default_top_k() -> usize {
    4
}

const fn default_embedding_dimensions() -> usize {
    384
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            embedding_dimensions: default_embedding_dimensions(),
            return_full_text: default_true(),
        }
    }
}

/// Per-user pipeline registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegistryConfig {
    /// Evict pipelines unused for this many seconds (disabled when unset)
    #[serde(default)]
    pub idle_ttl_secs: Option<u64>,

    /// How often the eviction janitor runs
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,
}

const fn default_eviction_interval_secs() -> u64 {
    60
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: None,
            eviction_interval_secs: default_eviction_interval_secs(),
        }
    }
}

/// Background resource monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorConfig {
    /// Sampling interval in seconds
    #[serde(default = "default_monitor_interval_secs")]
    pub interval_secs: u64,

    /// Warn when process memory exceeds this many MB
    #[serde(default = "default_memory_warn_mb")]
    pub memory_warn_mb: u64,
}

const fn default_monitor_interval_secs() -> u64 {
    10
}

const fn default_memory_warn_mb() -> u64 {
    4096
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval_secs(),
            memory_warn_mb: default_memory_warn_mb(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling JSON log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_service() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.identifier, "Qwen/Qwen2.5-0.5B-Instruct");
        assert_eq!(config.storage.upload_dir, PathBuf::from("./uploaded_pdfs"));
        assert!(config.registry.idle_ttl_secs.is_none());
        assert!(!config.model.load_in_background);
    }

    #[test]
    fn test_model_dir_flattens_identifier() {
        let model = ModelConfig {
            cache_dir: PathBuf::from("/cache"),
            ..Default::default()
        };
        assert_eq!(
            model.model_dir(),
            PathBuf::from("/cache/models--Qwen--Qwen2.5-0.5B-Instruct")
        );
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r"
server:
  port: 9000
model:
  backend: extractive
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.backend, ModelBackend::Extractive);
        assert_eq!(config.retrieval.top_k, 4);
    }
}
