//! Generation Backend Abstraction
//!
//! Strategy interface over the external generation service. Two implementations:
//! [`RemoteBackend`] speaks JSON over HTTP to a real service, [`SimulatedBackend`]
//! is a local stand-in with configurable latency, failure rate and quality. Which
//! one runs, and whether the simulator may stand in when the remote is
//! unreachable, is decided by configuration, never implicitly.

use crate::error::{ApiError, GenerationError};
use crate::types::GenerationTask;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod remote;
pub mod simulated;

pub use remote::RemoteBackend;
pub use simulated::{SimulatedBackend, SimulationProfile};

/// Payload of a successful backend call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendOutput {
    #[serde(default)]
    pub artifact_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub quality_score: Option<f64>,
}

/// Generation backend trait
///
/// A structured failure reported by the service is `Err(GenerationError::Backend)`;
/// transport problems use the other error kinds.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, task: &GenerationTask) -> Result<BackendOutput, GenerationError>;

    /// Backend name for logs and events
    fn name(&self) -> &str;
}

/// Backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Remote,
    #[default]
    Simulated,
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Base URL of the remote generation service
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token; falls back to GENPOOL_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Let the simulator answer when the remote backend is unreachable
    #[serde(default)]
    pub fallback_to_simulator: bool,

    #[serde(default)]
    pub simulation: SimulationProfile,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            endpoint: None,
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            fallback_to_simulator: false,
            simulation: SimulationProfile::default(),
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.kind == BackendKind::Remote {
            let endpoint = self
                .endpoint
                .as_deref()
                .ok_or_else(|| "Remote backend requires an endpoint".to_string())?;
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!("Endpoint must be an http(s) URL: {}", endpoint));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be at least one second".to_string());
        }
        self.simulation.validate()
    }

    fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GENPOOL_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Primary backend plus the optional fallback selected by configuration
pub struct BackendSet {
    pub primary: Arc<dyn GenerationBackend>,
    pub fallback: Option<Arc<dyn GenerationBackend>>,
}

pub struct BackendFactory;

impl BackendFactory {
    pub fn create(config: &BackendConfig) -> Result<BackendSet, ApiError> {
        config.validate().map_err(ApiError::ConfigError)?;
        match config.kind {
            BackendKind::Simulated => Ok(BackendSet {
                primary: Arc::new(SimulatedBackend::new(config.simulation.clone())),
                fallback: None,
            }),
            BackendKind::Remote => {
                let endpoint = config.endpoint.clone().ok_or_else(|| {
                    ApiError::ConfigError("Remote backend requires an endpoint".to_string())
                })?;
                let remote = RemoteBackend::new(
                    endpoint,
                    config.resolved_api_key(),
                    std::time::Duration::from_secs(config.request_timeout_secs),
                )?;
                let fallback: Option<Arc<dyn GenerationBackend>> = if config.fallback_to_simulator
                {
                    Some(Arc::new(SimulatedBackend::new(config.simulation.clone())))
                } else {
                    None
                };
                Ok(BackendSet {
                    primary: Arc::new(remote),
                    fallback,
                })
            }
        }
    }
}
