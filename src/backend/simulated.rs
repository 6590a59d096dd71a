//! Local simulated generation backend.
//!
//! Latency = base + long-prompt penalty + detail-marker penalty. Success is drawn
//! with `success_probability`; successful outputs get a quality score drawn
//! uniformly from `[min_quality, max_quality]`. All draws come from a seedable
//! [`ChaosPolicy`].

use super::{BackendOutput, GenerationBackend};
use crate::cache::CacheKey;
use crate::chaos::ChaosPolicy;
use crate::error::GenerationError;
use crate::types::GenerationTask;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

fn default_base_latency_ms() -> u64 {
    2000
}

fn default_long_prompt_threshold() -> usize {
    500
}

fn default_long_prompt_penalty_ms() -> u64 {
    500
}

fn default_detail_marker_penalty_ms() -> u64 {
    1000
}

fn default_detail_markers() -> Vec<String> {
    vec!["high quality".to_string(), "detailed".to_string()]
}

fn default_success_probability() -> f64 {
    0.9
}

fn default_min_quality() -> f64 {
    0.7
}

fn default_max_quality() -> f64 {
    0.95
}

/// Simulation profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationProfile {
    #[serde(default = "default_base_latency_ms")]
    pub base_latency_ms: u64,

    /// Prompts longer than this many characters pay the long-prompt penalty
    #[serde(default = "default_long_prompt_threshold")]
    pub long_prompt_threshold: usize,

    #[serde(default = "default_long_prompt_penalty_ms")]
    pub long_prompt_penalty_ms: u64,

    /// Added once when the prompt mentions any detail marker (case-insensitive)
    #[serde(default = "default_detail_marker_penalty_ms")]
    pub detail_marker_penalty_ms: u64,

    #[serde(default = "default_detail_markers")]
    pub detail_markers: Vec<String>,

    #[serde(default = "default_success_probability")]
    pub success_probability: f64,

    #[serde(default = "default_min_quality")]
    pub min_quality: f64,

    #[serde(default = "default_max_quality")]
    pub max_quality: f64,

    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            base_latency_ms: default_base_latency_ms(),
            long_prompt_threshold: default_long_prompt_threshold(),
            long_prompt_penalty_ms: default_long_prompt_penalty_ms(),
            detail_marker_penalty_ms: default_detail_marker_penalty_ms(),
            detail_markers: default_detail_markers(),
            success_probability: default_success_probability(),
            min_quality: default_min_quality(),
            max_quality: default_max_quality(),
            seed: None,
        }
    }
}

impl SimulationProfile {
    /// Instant, always-successful profile with a fixed quality score.
    pub fn deterministic(quality: f64) -> Self {
        Self {
            base_latency_ms: 0,
            long_prompt_penalty_ms: 0,
            detail_marker_penalty_ms: 0,
            success_probability: 1.0,
            min_quality: quality,
            max_quality: quality,
            seed: Some(0),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.success_probability) {
            return Err(format!(
                "Simulation success_probability must be within [0, 1], got {}",
                self.success_probability
            ));
        }
        if !(0.0..=1.0).contains(&self.min_quality) || !(0.0..=1.0).contains(&self.max_quality) {
            return Err("Simulation quality bounds must be within [0, 1]".to_string());
        }
        if self.min_quality > self.max_quality {
            return Err(format!(
                "Simulation min_quality {} exceeds max_quality {}",
                self.min_quality, self.max_quality
            ));
        }
        Ok(())
    }

    /// Latency the simulator will spend on `prompt`.
    pub fn latency_for(&self, prompt: &str) -> Duration {
        let mut millis = self.base_latency_ms;
        if prompt.chars().count() > self.long_prompt_threshold {
            millis += self.long_prompt_penalty_ms;
        }
        let lowered = prompt.to_lowercase();
        if self
            .detail_markers
            .iter()
            .any(|marker| lowered.contains(&marker.to_lowercase()))
        {
            millis += self.detail_marker_penalty_ms;
        }
        Duration::from_millis(millis)
    }
}

pub struct SimulatedBackend {
    profile: SimulationProfile,
    chaos: ChaosPolicy,
    sequence: AtomicU64,
}

impl SimulatedBackend {
    pub fn new(profile: SimulationProfile) -> Self {
        let failure_rate = 1.0 - profile.success_probability.clamp(0.0, 1.0);
        let chaos = ChaosPolicy::new(failure_rate, profile.seed);
        Self {
            profile,
            chaos,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn profile(&self) -> &SimulationProfile {
        &self.profile
    }
}

#[async_trait]
impl GenerationBackend for SimulatedBackend {
    async fn generate(&self, task: &GenerationTask) -> Result<BackendOutput, GenerationError> {
        let latency = self.profile.latency_for(&task.prompt);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.chaos.trip() {
            debug!(task_id = %task.id, "Simulated generation failure");
            return Err(GenerationError::Backend(
                "simulated generation failure".to_string(),
            ));
        }

        let quality = self
            .chaos
            .uniform(self.profile.min_quality, self.profile.max_quality);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let content = CacheKey::for_task(task);

        Ok(BackendOutput {
            artifact_url: format!(
                "https://sim.genpool.local/artifacts/{}-{}.png",
                content.short(),
                sequence
            ),
            thumbnail_url: Some(format!(
                "https://sim.genpool.local/thumbnails/{}-{}.png",
                content.short(),
                sequence
            )),
            quality_score: Some(quality),
        })
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
