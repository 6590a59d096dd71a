//! Error types for the generation executor.
//!
//! Two families: [`GenerationError`] describes why a single attempt failed and is
//! always folded into a failed [`GenerationResult`](crate::types::GenerationResult);
//! [`ApiError`] covers batch-level and configuration faults, the only errors a
//! batch call ever returns.

use std::time::Duration;
use thiserror::Error;

/// Per-attempt generation errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// The backend answered, but reported the generation as failed.
    #[error("Backend reported failure: {0}")]
    Backend(String),

    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Backend authentication failed: {0}")]
    AuthFailed(String),

    #[error("Backend rejected request: {0}")]
    InvalidRequest(String),

    /// A fault inside the attempt itself (panic, broken invariant).
    #[error("Unexpected fault: {0}")]
    Unexpected(String),
}

impl GenerationError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::AuthFailed(_) => false,
            GenerationError::InvalidRequest(_) => false,
            GenerationError::Backend(_)
            | GenerationError::Transport(_)
            | GenerationError::Timeout(_)
            | GenerationError::RateLimited(_)
            | GenerationError::Unexpected(_) => true,
        }
    }

    /// Whether the backend could not be reached at all (the simulator fallback trigger).
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            GenerationError::Transport(_) | GenerationError::Timeout(_)
        )
    }

    /// Short machine-readable label for events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Backend(_) => "backend",
            GenerationError::Transport(_) => "transport",
            GenerationError::Timeout(_) => "timeout",
            GenerationError::RateLimited(_) => "rate_limited",
            GenerationError::AuthFailed(_) => "auth_failed",
            GenerationError::InvalidRequest(_) => "invalid_request",
            GenerationError::Unexpected(_) => "unexpected",
        }
    }
}

/// Batch and configuration errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Duplicate task id in batch: {0}")]
    DuplicateTask(String),

    #[error("Scheduling failed: {0}")]
    Scheduling(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}
