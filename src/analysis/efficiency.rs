//! Parallel efficiency and cache utilization.

use crate::executor::BatchOutcome;
use crate::stats::StatisticsSnapshot;
use crate::types::GenerationResult;
use serde::{Deserialize, Serialize};

const MEDIUM_HIT_RATE: f64 = 0.1;
const HIGH_HIT_RATE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelEfficiency {
    pub task_count: usize,
    pub concurrency: usize,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
    /// Sum of task latencies: the wall clock of a one-at-a-time run
    pub sequential_estimate_ms: u64,
    pub wall_clock_ms: u64,
    /// `sequential_estimate_ms / wall_clock_ms`
    pub speedup: f64,
    /// `(1 - max / (N * avg)) * min(1, C / N)`, in [0, 1]
    pub score: f64,
}

impl ParallelEfficiency {
    pub fn compute(results: &[GenerationResult], concurrency: usize, wall_clock_ms: u64) -> Self {
        let task_count = results.len();
        let sequential_estimate_ms: u64 = results.iter().map(|r| r.generation_time_ms).sum();
        let max_latency_ms = results
            .iter()
            .map(|r| r.generation_time_ms)
            .max()
            .unwrap_or(0);
        let avg_latency_ms = if task_count == 0 {
            0.0
        } else {
            sequential_estimate_ms as f64 / task_count as f64
        };

        let score = if task_count == 0 || avg_latency_ms <= 0.0 {
            0.0
        } else {
            let n = task_count as f64;
            let overlap = 1.0 - max_latency_ms as f64 / (n * avg_latency_ms);
            let availability = (concurrency as f64 / n).min(1.0);
            (overlap * availability).clamp(0.0, 1.0)
        };

        let speedup = if wall_clock_ms == 0 {
            0.0
        } else {
            sequential_estimate_ms as f64 / wall_clock_ms as f64
        };

        Self {
            task_count,
            concurrency,
            avg_latency_ms,
            max_latency_ms,
            sequential_estimate_ms,
            wall_clock_ms,
            speedup,
            score,
        }
    }

    pub fn from_outcome(outcome: &BatchOutcome) -> Self {
        Self::compute(&outcome.results, outcome.concurrency, outcome.wall_clock_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEfficiency {
    Low,
    Medium,
    High,
}

impl CacheEfficiency {
    pub fn from_hit_rate(hit_rate: f64) -> Self {
        if hit_rate < MEDIUM_HIT_RATE {
            CacheEfficiency::Low
        } else if hit_rate < HIGH_HIT_RATE {
            CacheEfficiency::Medium
        } else {
            CacheEfficiency::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheEfficiency::Low => "low",
            CacheEfficiency::Medium => "medium",
            CacheEfficiency::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheUtilization {
    pub cache_hits: u64,
    pub total_generated: u64,
    pub hit_rate: f64,
    pub efficiency: CacheEfficiency,
}

impl CacheUtilization {
    pub fn from_statistics(stats: &StatisticsSnapshot) -> Self {
        let hit_rate = if stats.total_generated == 0 {
            0.0
        } else {
            stats.cache_hits as f64 / stats.total_generated as f64
        };
        Self {
            cache_hits: stats.cache_hits,
            total_generated: stats.total_generated,
            hit_rate,
            efficiency: CacheEfficiency::from_hit_rate(hit_rate),
        }
    }
}
