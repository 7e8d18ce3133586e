use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::Config;

/// Project-local base configuration
pub const PROJECT_CONFIG: &str = ".rag-pipeline/config.yaml";
/// Project-local overrides, usually untracked
pub const LOCAL_CONFIG: &str = ".rag-pipeline/local.yaml";
/// Environment variable prefix; `__` separates nested keys
pub const ENV_PREFIX: &str = "RAG_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port: {0}. Must be between 1 and 65535")]
    InvalidPort(u16),

    #[error("Model identifier cannot be empty")]
    EmptyModelIdentifier,

    #[error("Upload directory cannot be empty")]
    EmptyUploadDir,

    #[error("Invalid max_upload_bytes: {0}. Must be positive")]
    InvalidUploadLimit(u64),

    #[error("Invalid chunking configuration: {0}")]
    InvalidChunking(String),

    #[error("Invalid top_k: {0}. Must be at least 1")]
    InvalidTopK(usize),

    #[error("Invalid embedding_dimensions: {0}. Must be at least 1")]
    InvalidEmbeddingDimensions(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid monitor interval_secs: {0}. Must be at least 1")]
    InvalidMonitorInterval(u64),
}

/// Command-line values that take precedence over every other source
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(model) = &self.model {
            config.model.identifier.clone_from(model);
        }
    }
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .rag-pipeline/config.yaml
    /// 3. .rag-pipeline/local.yaml
    /// 4. `config_file`, when given
    /// 5. Environment variables (RAG_* prefix)
    pub fn load(config_file: Option<&Path>) -> Result<Config> {
        let config: Config = Self::figment(config_file)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load, apply command-line overrides, then validate the result
    pub fn load_with_overrides(
        config_file: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Config> {
        let mut config: Config = Self::figment(config_file)
            .extract()
            .context("Failed to extract configuration from figment")?;

        overrides.apply(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, ignoring project files and env
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(PROJECT_CONFIG))
            .merge(Yaml::file(LOCAL_CONFIG));

        if let Some(path) = config_file {
            figment = figment.merge(Yaml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.server.port == 0 {
            return Err(ConfigError::InvalidPort(config.server.port));
        }

        if config.model.identifier.trim().is_empty() {
            return Err(ConfigError::EmptyModelIdentifier);
        }

        if config.storage.upload_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyUploadDir);
        }

        if config.storage.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidUploadLimit(config.storage.max_upload_bytes));
        }

        config
            .chunking
            .validate()
            .map_err(ConfigError::InvalidChunking)?;

        if config.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidTopK(config.retrieval.top_k));
        }

        if config.retrieval.embedding_dimensions == 0 {
            return Err(ConfigError::InvalidEmbeddingDimensions(
                config.retrieval.embedding_dimensions,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        let retry = &config.model.retry;
        if retry.initial_backoff_ms >= retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                retry.initial_backoff_ms,
                retry.max_backoff_ms,
            ));
        }

        if config.monitor.interval_secs == 0 {
            return Err(ConfigError::InvalidMonitorInterval(
                config.monitor.interval_secs,
            ));
        }

        Ok(())
    }
}
