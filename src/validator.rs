//! Result validation
//!
//! Post-generation acceptance check. A successful result is reclassified as failed
//! when it has no artifact URL, when its quality score is not a number in `[0, 1]`
//! or is below the floor, or when the moderation chaos policy trips. Failed results
//! pass through untouched.

use crate::chaos::ChaosPolicy;
use crate::types::GenerationResult;
use serde::{Deserialize, Serialize};

pub const DEFAULT_QUALITY_FLOOR: f64 = 0.6;
pub const DEFAULT_INJECTED_FAILURE_RATE: f64 = 0.05;

fn default_quality_floor() -> f64 {
    DEFAULT_QUALITY_FLOOR
}

fn default_injected_failure_rate() -> f64 {
    DEFAULT_INJECTED_FAILURE_RATE
}

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_quality_floor")]
    pub quality_floor: f64,

    /// Probability of a simulated moderation rejection
    #[serde(default = "default_injected_failure_rate")]
    pub injected_failure_rate: f64,

    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            quality_floor: default_quality_floor(),
            injected_failure_rate: default_injected_failure_rate(),
            seed: None,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.quality_floor) {
            return Err(format!(
                "Quality floor must be within [0, 1], got {}",
                self.quality_floor
            ));
        }
        if !(0.0..=1.0).contains(&self.injected_failure_rate) {
            return Err(format!(
                "Injected failure rate must be within [0, 1], got {}",
                self.injected_failure_rate
            ));
        }
        Ok(())
    }
}

/// Why a result was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    MissingArtifact,
    /// Score outside `[0, 1]` or not a finite number
    InvalidQuality { score: f64 },
    QualityBelowFloor { score: f64, floor: f64 },
    Moderation,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::MissingArtifact => write!(f, "Validation failed: missing artifact URL"),
            Rejection::InvalidQuality { score } => {
                write!(f, "Validation failed: quality score {} outside [0, 1]", score)
            }
            Rejection::QualityBelowFloor { score, floor } => write!(
                f,
                "Validation failed: quality score {:.2} below floor {:.2}",
                score, floor
            ),
            Rejection::Moderation => {
                write!(f, "Validation failed: rejected by content moderation")
            }
        }
    }
}

#[derive(Debug)]
pub struct ResultValidator {
    quality_floor: f64,
    chaos: ChaosPolicy,
}

impl Default for ResultValidator {
    fn default() -> Self {
        Self::strict(DEFAULT_QUALITY_FLOOR)
    }
}

impl ResultValidator {
    pub fn new(quality_floor: f64, chaos: ChaosPolicy) -> Self {
        Self {
            quality_floor,
            chaos,
        }
    }

    /// Floor check only; no injected rejections.
    pub fn strict(quality_floor: f64) -> Self {
        Self::new(quality_floor, ChaosPolicy::disabled())
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(
            config.quality_floor,
            ChaosPolicy::new(config.injected_failure_rate, config.seed),
        )
    }

    pub fn quality_floor(&self) -> f64 {
        self.quality_floor
    }

    /// Acceptance check without side effects on the result.
    pub fn check(&self, result: &GenerationResult) -> Result<(), Rejection> {
        if !result.has_artifact() {
            return Err(Rejection::MissingArtifact);
        }
        let score = result.quality_score.unwrap_or(0.0);
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(Rejection::InvalidQuality { score });
        }
        if score < self.quality_floor {
            return Err(Rejection::QualityBelowFloor {
                score,
                floor: self.quality_floor,
            });
        }
        if self.chaos.trip() {
            return Err(Rejection::Moderation);
        }
        Ok(())
    }

    /// Returns the result unchanged when accepted, reclassified as failed otherwise.
    pub fn validate(&self, result: GenerationResult) -> GenerationResult {
        if !result.success {
            return result;
        }
        match self.check(&result) {
            Ok(()) => result,
            Err(rejection) => result.rejected(rejection.to_string()),
        }
    }
}
