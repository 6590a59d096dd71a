//! Priority scheduler
//!
//! Orders a batch by descending priority before dispatch. Equal priorities keep
//! their input order. Each scheduled entry remembers its input index so results
//! can be returned in the caller's original order.

use crate::error::ApiError;
use crate::types::GenerationTask;
use std::cmp::Reverse;
use std::collections::HashSet;

/// A task paired with its position in the submitted batch
#[derive(Debug, Clone, Copy)]
pub struct ScheduledTask<'a> {
    pub index: usize,
    pub task: &'a GenerationTask,
}

/// Reject malformed batches: invalid tasks or duplicate ids.
pub fn validate_batch(tasks: &[GenerationTask]) -> Result<(), ApiError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        task.validate()?;
        if !seen.insert(task.id.as_str()) {
            return Err(ApiError::DuplicateTask(task.id.clone()));
        }
    }
    Ok(())
}

/// Dispatch order: priority descending, stable on ties. O(N log N), no side effects.
pub fn prioritize(tasks: &[GenerationTask]) -> Vec<ScheduledTask<'_>> {
    let mut scheduled: Vec<ScheduledTask<'_>> = tasks
        .iter()
        .enumerate()
        .map(|(index, task)| ScheduledTask { index, task })
        .collect();
    // sort_by_key is a stable merge sort.
    scheduled.sort_by_key(|entry| Reverse(entry.task.priority));
    scheduled
}
