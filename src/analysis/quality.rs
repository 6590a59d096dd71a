//! Quality analyzer

use super::mean;
use crate::types::GenerationResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const HIGH_QUALITY_THRESHOLD: f64 = 0.8;
pub const MEDIUM_QUALITY_THRESHOLD: f64 = 0.6;

const SUCCESS_RATE_TARGET: f64 = 0.8;
const AVG_QUALITY_TARGET: f64 = 0.75;
const MULTIPLE_RETRY_SHARE_LIMIT: f64 = 0.2;
const SLOW_GENERATION_MS: f64 = 30_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityDistribution {
    /// score >= 0.8
    pub high: usize,
    /// 0.6 <= score < 0.8
    pub medium: usize,
    pub low: usize,
}

impl QualityDistribution {
    fn record(&mut self, score: f64) {
        if score >= HIGH_QUALITY_THRESHOLD {
            self.high += 1;
        } else if score >= MEDIUM_QUALITY_THRESHOLD {
            self.medium += 1;
        } else {
            self.low += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryStatistics {
    pub no_retry: usize,
    pub single_retry: usize,
    pub multiple_retry: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAnalysis {
    pub total_tasks: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    /// Over successful results that carry a score
    pub avg_quality_score: f64,
    /// Over successful results
    pub avg_generation_time_ms: f64,
    pub quality_distribution: QualityDistribution,
    /// Over every result
    pub retry_statistics: RetryStatistics,
    /// Error message to occurrence count
    pub failure_analysis: BTreeMap<String, usize>,
    pub recommendations: Vec<String>,
}

impl QualityAnalysis {
    pub fn analyze(results: &[GenerationResult]) -> Self {
        let total_tasks = results.len();
        let successes: Vec<&GenerationResult> = results.iter().filter(|r| r.success).collect();
        let successful = successes.len();
        let failed = total_tasks - successful;
        let success_rate = if total_tasks == 0 {
            0.0
        } else {
            successful as f64 / total_tasks as f64
        };

        let scores: Vec<f64> = successes.iter().filter_map(|r| r.quality_score).collect();
        let times: Vec<f64> = successes
            .iter()
            .map(|r| r.generation_time_ms as f64)
            .collect();

        let mut quality_distribution = QualityDistribution::default();
        for score in &scores {
            quality_distribution.record(*score);
        }

        let mut retry_statistics = RetryStatistics::default();
        for result in results {
            match result.retry_count {
                0 => retry_statistics.no_retry += 1,
                1 => retry_statistics.single_retry += 1,
                _ => retry_statistics.multiple_retry += 1,
            }
        }

        let mut failure_analysis = BTreeMap::new();
        for result in results.iter().filter(|r| !r.success) {
            let message = result
                .error_message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            *failure_analysis.entry(message).or_insert(0) += 1;
        }

        let mut analysis = Self {
            total_tasks,
            successful,
            failed,
            success_rate,
            avg_quality_score: mean(&scores),
            avg_generation_time_ms: mean(&times),
            quality_distribution,
            retry_statistics,
            failure_analysis,
            recommendations: Vec::new(),
        };
        analysis.recommendations = analysis.recommend();
        analysis
    }

    fn recommend(&self) -> Vec<String> {
        if self.total_tasks == 0 {
            return Vec::new();
        }

        let mut recommendations = Vec::new();
        if self.success_rate < SUCCESS_RATE_TARGET {
            recommendations.push(format!(
                "Success rate is {:.0}%: optimize prompts and simplify style parameters",
                self.success_rate * 100.0
            ));
        }
        if self.successful > 0 && self.avg_quality_score < AVG_QUALITY_TARGET {
            recommendations.push(format!(
                "Average quality is {:.2}: raise the quality level or add detail to prompts",
                self.avg_quality_score
            ));
        }
        let multiple_share = self.retry_statistics.multiple_retry as f64 / self.total_tasks as f64;
        if multiple_share > MULTIPLE_RETRY_SHARE_LIMIT {
            recommendations.push(
                "Many tasks needed multiple retries: check backend stability or lower concurrency"
                    .to_string(),
            );
        }
        if self.avg_generation_time_ms > SLOW_GENERATION_MS {
            recommendations.push(
                "Generations are slow: shorten prompts or reduce requested detail".to_string(),
            );
        }
        if let Some((message, count)) = self
            .failure_analysis
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        {
            if *count > 1 {
                recommendations.push(format!(
                    "Most common failure ({} occurrences): {}",
                    count, message
                ));
            }
        }
        recommendations
    }
}
