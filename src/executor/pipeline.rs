//! Per-task pipeline: cache lookup, retried generation, validation, cache commit.

use crate::adapter::GenerationAdapter;
use crate::cache::CacheKey;
use crate::retry::RetryPolicy;
use crate::stats::GenerationStatistics;
use crate::telemetry::{EventEmitter, TaskEventData};
use crate::types::{GenerationResult, GenerationTask};
use crate::validator::ResultValidator;
use std::time::Duration;
use tracing::{debug, info, warn};

pub(crate) struct TaskPipeline {
    pub(crate) adapter: GenerationAdapter,
    pub(crate) validator: ResultValidator,
    pub(crate) retry_base_delay: Duration,
}

impl TaskPipeline {
    pub(crate) async fn run(
        &self,
        task: &GenerationTask,
        stats: &GenerationStatistics,
        events: &EventEmitter,
    ) -> GenerationResult {
        let key = self
            .adapter
            .cache_enabled()
            .then(|| CacheKey::for_task(task));

        if let Some(key) = &key {
            if let Some(entry) = self.adapter.lookup(key) {
                stats.record_cache_hit();
                debug!(task_id = %task.id, key = %key.short(), "Cache hit");
                events.emit("task_cache_hit", &TaskEventData::new(task.id.clone(), task.priority));
                return entry.to_result(task.id.clone());
            }
        }

        let policy = RetryPolicy::new(task.max_retries, self.retry_base_delay);
        let result = policy
            .run(
                &task.id,
                |attempt| self.adapter.attempt(task, attempt, stats, events),
                |next_attempt, error, delay| {
                    stats.record_retry();
                    warn!(
                        task_id = %task.id,
                        attempt = next_attempt.saturating_add(1),
                        max_attempts = task.max_retries.saturating_add(1),
                        backoff_ms = delay.as_millis() as u64,
                        error = %error,
                        "Generation attempt failed, retrying"
                    );
                    events.emit(
                        "task_retrying",
                        &TaskEventData {
                            attempt: Some(next_attempt.saturating_add(1)),
                            backoff_ms: Some(delay.as_millis() as u64),
                            error: Some(error.to_string()),
                            ..TaskEventData::new(task.id.clone(), task.priority)
                        },
                    );
                },
            )
            .await;

        if !result.success {
            return result;
        }

        let result = self.validator.validate(result);
        if !result.success {
            stats.record_rejection();
            info!(
                task_id = %task.id,
                reason = result.error_message.as_deref().unwrap_or_default(),
                "Generation rejected by validation"
            );
            events.emit(
                "task_rejected",
                &TaskEventData {
                    error: result.error_message.clone(),
                    ..TaskEventData::new(task.id.clone(), task.priority)
                },
            );
            return result;
        }

        if let Some(key) = key {
            self.adapter.commit(key, &result);
        }
        result
    }
}
