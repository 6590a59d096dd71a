//! Post-batch analytics
//!
//! Pure functions over a finished batch: every report here can be recomputed
//! from the result list, the statistics snapshot and the labelling metadata.

pub mod consistency;
pub mod efficiency;
pub mod mapping;
pub mod quality;

pub use consistency::{CharacterConsistency, ConsistencyAnalysis};
pub use efficiency::{CacheEfficiency, CacheUtilization, ParallelEfficiency};
pub use mapping::{PageMappingReport, PageSummary};
pub use quality::{QualityAnalysis, QualityDistribution, RetryStatistics};

use crate::executor::BatchOutcome;
use crate::types::AnalysisMetadata;
use serde::{Deserialize, Serialize};

/// Every report for one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalysis {
    pub quality: QualityAnalysis,
    pub consistency: ConsistencyAnalysis,
    pub parallel_efficiency: ParallelEfficiency,
    pub cache_utilization: CacheUtilization,
    pub page_mapping: PageMappingReport,
}

impl BatchAnalysis {
    pub fn compute(outcome: &BatchOutcome, metadata: &AnalysisMetadata) -> Self {
        Self {
            quality: QualityAnalysis::analyze(&outcome.results),
            consistency: ConsistencyAnalysis::analyze(&outcome.results, metadata),
            parallel_efficiency: ParallelEfficiency::from_outcome(outcome),
            cache_utilization: CacheUtilization::from_statistics(&outcome.statistics),
            page_mapping: PageMappingReport::build(&outcome.results, metadata),
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; 0 for fewer than two values.
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64
}
