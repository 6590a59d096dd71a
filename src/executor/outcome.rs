//! Batch outcome and timing records.

use crate::stats::StatisticsSnapshot;
use crate::types::{GenerationResult, TaskId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Occupancy window of one dispatched task, in microseconds since batch start.
///
/// `start_us` is taken after the concurrency permit is granted and `end_us`
/// before it is released, so overlapping windows never exceed the limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTiming {
    pub task_id: TaskId,
    /// Position of the task in the submitted batch
    pub index: usize,
    pub start_us: u64,
    pub end_us: u64,
}

impl TaskTiming {
    pub fn duration_ms(&self) -> u64 {
        self.end_us.saturating_sub(self.start_us) / 1000
    }

    pub fn overlaps(&self, other: &TaskTiming) -> bool {
        self.start_us < other.end_us && other.start_us < self.end_us
    }
}

/// Largest number of windows open at the same instant.
pub fn max_overlap(timings: &[TaskTiming]) -> usize {
    let mut edges: Vec<(u64, i32)> = Vec::with_capacity(timings.len() * 2);
    for timing in timings {
        edges.push((timing.start_us, 1));
        edges.push((timing.end_us, -1));
    }
    // Ends sort before starts at the same instant.
    edges.sort();

    let mut open = 0i32;
    let mut peak = 0i32;
    for (_, delta) in edges {
        open += delta;
        peak = peak.max(open);
    }
    peak.max(0) as usize
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_id: String,
    /// One result per submitted task, in submission order
    pub results: Vec<GenerationResult>,
    /// Dispatched tasks only, in dispatch order
    pub timings: Vec<TaskTiming>,
    pub statistics: StatisticsSnapshot,
    pub concurrency: usize,
    pub wall_clock_ms: u64,
    pub peak_in_flight: usize,
}

impl BatchOutcome {
    pub fn successful(&self) -> impl Iterator<Item = &GenerationResult> {
        self.results.iter().filter(|result| result.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &GenerationResult> {
        self.results.iter().filter(|result| !result.success)
    }

    pub fn result_for(&self, task_id: &str) -> Option<&GenerationResult> {
        self.results.iter().find(|result| result.task_id == task_id)
    }

    pub fn timing_for(&self, task_id: &str) -> Option<&TaskTiming> {
        self.timings.iter().find(|timing| timing.task_id == task_id)
    }
}

/// Tracks tasks currently holding a permit and the peak seen.
#[derive(Debug, Default)]
pub(crate) struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    pub(crate) fn enter(self: &Arc<Self>) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            gauge: Arc::clone(self),
        }
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Leaves the gauge on drop, including during unwinding.
pub(crate) struct InFlightGuard {
    gauge: Arc<InFlightGauge>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}
