//! Generation statistics
//!
//! Running counters shared by every in-flight task. All updates are lock-free
//! atomic increments; readers take a consistent-enough [`StatisticsSnapshot`].
//!
//! Accounting:
//! - `total_generated`: artifacts produced, by the backend or served from cache
//! - `cache_hits`: the subset of `total_generated` served from cache
//! - `successful_generations` / `failed_generations`: final task outcomes, so
//!   their sum equals `tasks_submitted` once a batch completes

use crate::types::GenerationResult;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct GenerationStatistics {
    tasks_submitted: AtomicU64,
    total_generated: AtomicU64,
    successful_generations: AtomicU64,
    failed_generations: AtomicU64,
    cache_hits: AtomicU64,
    retries: AtomicU64,
    validation_rejections: AtomicU64,
    fallback_generations: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub tasks_submitted: u64,
    pub total_generated: u64,
    pub successful_generations: u64,
    pub failed_generations: u64,
    pub cache_hits: u64,
    pub retries: u64,
    pub validation_rejections: u64,
    pub fallback_generations: u64,
}

impl GenerationStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self, count: usize) {
        self.tasks_submitted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// A backend call returned a usable artifact.
    pub fn record_generated(&self) {
        self.total_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.total_generated.fetch_add(1, Ordering::Relaxed);
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallback_generations.fetch_add(1, Ordering::Relaxed);
    }

    /// Final outcome of one task.
    pub fn record_outcome(&self, result: &GenerationResult) {
        if result.success {
            self.successful_generations.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_generations.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Fold a finished batch into these (lifetime) counters.
    pub fn absorb(&self, batch: &StatisticsSnapshot) {
        self.tasks_submitted
            .fetch_add(batch.tasks_submitted, Ordering::Relaxed);
        self.total_generated
            .fetch_add(batch.total_generated, Ordering::Relaxed);
        self.successful_generations
            .fetch_add(batch.successful_generations, Ordering::Relaxed);
        self.failed_generations
            .fetch_add(batch.failed_generations, Ordering::Relaxed);
        self.cache_hits.fetch_add(batch.cache_hits, Ordering::Relaxed);
        self.retries.fetch_add(batch.retries, Ordering::Relaxed);
        self.validation_rejections
            .fetch_add(batch.validation_rejections, Ordering::Relaxed);
        self.fallback_generations
            .fetch_add(batch.fallback_generations, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            total_generated: self.total_generated.load(Ordering::Relaxed),
            successful_generations: self.successful_generations.load(Ordering::Relaxed),
            failed_generations: self.failed_generations.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            fallback_generations: self.fallback_generations.load(Ordering::Relaxed),
        }
    }
}

impl StatisticsSnapshot {
    /// Every submitted task has a final outcome.
    pub fn is_settled(&self) -> bool {
        self.successful_generations + self.failed_generations == self.tasks_submitted
    }
}
