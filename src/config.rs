//! Configuration System
//!
//! Hierarchical configuration with environment variable overrides and
//! runtime validation. A config file is optional; every section falls back
//! to defaults.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::error::GenerationError;
use crate::fallback::FallbackConfig;
use crate::logging::LoggingConfig;
use crate::orchestrator::PollingConfig;
use crate::provider::VideoProviderConfig;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipforgeConfig {
    /// Primary video provider
    #[serde(default)]
    pub provider: VideoProviderConfig,

    /// Degraded-path text describer
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Artifact cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Poll loop tuning
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    Fallback(String),
    Cache(String),
    Polling(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Fallback(msg) => write!(f, "Fallback: {}", msg),
            ValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ValidationError::Polling(msg) => write!(f, "Polling: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ClipforgeConfig {
    /// Load configuration, lowest to highest precedence: defaults, the TOML
    /// file at `path` (when given and present), `CLIPFORGE_*` environment
    /// variables (`CLIPFORGE_PROVIDER__MODEL` etc.).
    pub fn load(path: Option<&Path>) -> Result<Self, GenerationError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("CLIPFORGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: ClipforgeConfig = builder
            .build()
            .map_err(|e| GenerationError::Config(format!("Failed to load config: {}", e)))?
            .try_deserialize()
            .map_err(|e| GenerationError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Validate the entire configuration, collecting every error rather than
    /// stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.provider.base_url.trim().is_empty() {
            errors.push(ValidationError::Provider(
                "base_url cannot be empty".to_string(),
            ));
        }
        if self.provider.model.trim().is_empty() {
            errors.push(ValidationError::Provider(
                "model cannot be empty".to_string(),
            ));
        }

        if self.fallback.base_url.trim().is_empty() {
            errors.push(ValidationError::Fallback(
                "base_url cannot be empty".to_string(),
            ));
        }
        if self.fallback.model.trim().is_empty() {
            errors.push(ValidationError::Fallback(
                "model cannot be empty".to_string(),
            ));
        }
        if self.fallback.max_tokens == 0 {
            errors.push(ValidationError::Fallback(
                "max_tokens must be positive".to_string(),
            ));
        }

        if self.cache.max_size == 0 {
            errors.push(ValidationError::Cache(
                "max_size must be positive".to_string(),
            ));
        }
        if self.cache.max_age_ms == 0 {
            errors.push(ValidationError::Cache(
                "max_age_ms must be positive".to_string(),
            ));
        }
        if self.cache.sweep_period_ms == 0 {
            errors.push(ValidationError::Cache(
                "sweep_period_ms must be positive".to_string(),
            ));
        }

        if self.polling.poll_interval_ms == 0 {
            errors.push(ValidationError::Polling(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.polling.max_attempts == 0 {
            errors.push(ValidationError::Polling(
                "max_attempts must be positive".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold errors into a single [`GenerationError::Config`].
    pub fn validated(self) -> Result<Self, GenerationError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            GenerationError::Config(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(self)
    }
}
