//! Configuration System
//!
//! Layered configuration for the executor, the generation backend, result
//! validation, the cache and logging. Sources are merged by the `config` crate
//! (see [`ConfigLoader`]); the merged tree deserializes into [`GenpoolConfig`].

use serde::{Deserialize, Serialize};

pub use crate::backend::{BackendConfig, BackendKind, SimulationProfile};
pub use crate::executor::ExecutorConfig;
pub use crate::logging::LoggingConfig;
pub use crate::validator::ValidationConfig;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenpoolConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_true() -> bool {
    true
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// LRU bound; absent means unbounded
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: None,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == Some(0) {
            return Err("max_entries must be at least 1 (omit it for an unbounded cache)".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Executor(String),
    Backend(String),
    Validation(String),
    Cache(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Executor(msg) => write!(f, "Executor: {}", msg),
            ValidationError::Backend(msg) => write!(f, "Backend: {}", msg),
            ValidationError::Validation(msg) => write!(f, "Validation: {}", msg),
            ValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl GenpoolConfig {
    /// Validate the entire configuration, reporting every violation.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.executor.validate() {
            errors.push(ValidationError::Executor(e));
        }
        if let Err(e) = self.backend.validate() {
            errors.push(ValidationError::Backend(e));
        }
        if let Err(e) = self.validation.validate() {
            errors.push(ValidationError::Validation(e));
        }
        if let Err(e) = self.cache.validate() {
            errors.push(ValidationError::Cache(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
