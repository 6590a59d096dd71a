//! Concurrency controller
//!
//! Runs a batch of generation tasks under a fixed concurrency limit. Permits are
//! handed out from a tokio [`Semaphore`] in priority order (highest first, ties in
//! submission order); each dispatched task keeps its permit for its whole
//! lifetime, retries and backoff included. Every submitted task ends with exactly
//! one [`GenerationResult`], returned in submission order.
//!
//! An optional batch deadline stops the dispatch loop: tasks that never got a
//! permit before it passed are reported as failed without touching the backend.

mod outcome;
mod pipeline;

pub use outcome::{max_overlap, BatchOutcome, TaskTiming};

use crate::adapter::GenerationAdapter;
use crate::backend::{BackendFactory, GenerationBackend};
use crate::cache::GenerationCache;
use crate::config::GenpoolConfig;
use crate::error::ApiError;
use crate::retry::panic_message;
use crate::scheduler;
use crate::stats::{GenerationStatistics, StatisticsSnapshot};
use crate::telemetry::{
    new_batch_id, BatchEventData, BatchStatsEventData, EventEmitter, EventSink, TaskEventData,
};
use crate::types::{GenerationResult, GenerationTask, DEFAULT_MAX_RETRIES};
use crate::validator::ResultValidator;
use outcome::InFlightGauge;
use pipeline::TaskPipeline;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

fn default_max_concurrent_generations() -> usize {
    3
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum tasks holding a permit at once
    #[serde(default = "default_max_concurrent_generations")]
    pub max_concurrent_generations: usize,

    /// Retry budget filled in when a task file entry omits `max_retries`.
    ///
    /// Applied while loading task files, not by `run_batch`: a
    /// [`GenerationTask`] built in code already carries its own budget.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,

    /// Backoff time unit; the k-th retry waits `retry_base_delay_ms * 2^(k-1)`
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Per-attempt timeout
    #[serde(default)]
    pub attempt_timeout_ms: Option<u64>,

    /// Overall deadline for dispatching a batch
    #[serde(default)]
    pub batch_deadline_ms: Option<u64>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_generations: default_max_concurrent_generations(),
            default_max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            attempt_timeout_ms: None,
            batch_deadline_ms: None,
        }
    }
}

impl ExecutorConfig {
    pub fn with_concurrency(mut self, max_concurrent_generations: usize) -> Self {
        self.max_concurrent_generations = max_concurrent_generations;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_generations == 0 {
            return Err("max_concurrent_generations must be at least 1".to_string());
        }
        if self.attempt_timeout_ms == Some(0) {
            return Err("attempt_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }

    pub fn batch_deadline(&self) -> Option<Duration> {
        self.batch_deadline_ms.map(Duration::from_millis)
    }
}

/// Builder for [`GenerationExecutor`]
pub struct ExecutorBuilder {
    config: ExecutorConfig,
    primary: Arc<dyn GenerationBackend>,
    fallback: Option<Arc<dyn GenerationBackend>>,
    cache: Option<Arc<GenerationCache>>,
    validator: ResultValidator,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl ExecutorBuilder {
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fallback(mut self, fallback: Arc<dyn GenerationBackend>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Share a cache (possibly across executors).
    pub fn cache(mut self, cache: Arc<GenerationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn validator(mut self, validator: ResultValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn build(self) -> GenerationExecutor {
        let adapter = GenerationAdapter::new(self.primary)
            .with_fallback(self.fallback)
            .with_cache(self.cache)
            .with_attempt_timeout(self.config.attempt_timeout());
        let pipeline = TaskPipeline {
            adapter,
            validator: self.validator,
            retry_base_delay: self.config.retry_base_delay(),
        };
        GenerationExecutor {
            config: self.config,
            pipeline: Arc::new(pipeline),
            lifetime: GenerationStatistics::new(),
            event_sink: self.event_sink,
        }
    }
}

pub struct GenerationExecutor {
    config: ExecutorConfig,
    pipeline: Arc<TaskPipeline>,
    lifetime: GenerationStatistics,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl GenerationExecutor {
    /// Default configuration with an unbounded cache and a floor-only validator.
    pub fn builder(backend: Arc<dyn GenerationBackend>) -> ExecutorBuilder {
        ExecutorBuilder {
            config: ExecutorConfig::default(),
            primary: backend,
            fallback: None,
            cache: Some(Arc::new(GenerationCache::unbounded())),
            validator: ResultValidator::default(),
            event_sink: None,
        }
    }

    pub fn new(backend: Arc<dyn GenerationBackend>, config: ExecutorConfig) -> Self {
        Self::builder(backend).config(config).build()
    }

    /// Wire backends, cache and validator from a loaded configuration.
    pub fn from_config(config: &GenpoolConfig) -> Result<ExecutorBuilder, ApiError> {
        config.executor.validate().map_err(ApiError::ConfigError)?;
        config
            .validation
            .validate()
            .map_err(ApiError::ConfigError)?;

        let backends = BackendFactory::create(&config.backend)?;
        let mut builder = Self::builder(backends.primary)
            .config(config.executor.clone())
            .validator(ResultValidator::from_config(&config.validation));
        if let Some(fallback) = backends.fallback {
            builder = builder.fallback(fallback);
        }
        builder = if config.cache.enabled {
            builder.cache(Arc::new(GenerationCache::with_limit(config.cache.max_entries)))
        } else {
            builder.without_cache()
        };
        Ok(builder)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Arc<GenerationCache>> {
        self.pipeline.adapter.cache()
    }

    /// Counters accumulated over every finished batch.
    pub fn lifetime_statistics(&self) -> StatisticsSnapshot {
        self.lifetime.snapshot()
    }

    /// Run a batch using the configured deadline, if any.
    pub async fn run_batch(&self, tasks: Vec<GenerationTask>) -> Result<BatchOutcome, ApiError> {
        let deadline = self
            .config
            .batch_deadline()
            .map(|budget| Instant::now() + budget);
        self.run_batch_until(tasks, deadline).await
    }

    /// Run a batch; no permit is granted after `deadline`.
    pub async fn run_batch_until(
        &self,
        tasks: Vec<GenerationTask>,
        deadline: Option<Instant>,
    ) -> Result<BatchOutcome, ApiError> {
        scheduler::validate_batch(&tasks)?;

        let batch_id = new_batch_id();
        let events = EventEmitter::new(batch_id.clone(), self.event_sink.clone());
        let concurrency = self.config.max_concurrent_generations.max(1);
        let task_count = tasks.len();
        let stats = Arc::new(GenerationStatistics::new());
        stats.record_submitted(task_count);

        info!(
            batch_id = %batch_id,
            tasks = task_count,
            concurrency,
            "Generation batch started"
        );
        events.emit(
            "batch_started",
            &BatchEventData {
                task_count,
                concurrency,
                wall_clock_ms: None,
            },
        );

        let order: Vec<usize> = scheduler::prioritize(&tasks)
            .into_iter()
            .map(|scheduled| scheduled.index)
            .collect();
        let tasks: Vec<Arc<GenerationTask>> = tasks.into_iter().map(Arc::new).collect();

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let gauge = Arc::new(InFlightGauge::default());
        let batch_start = Instant::now();

        let mut results: Vec<Option<GenerationResult>> = vec![None; task_count];
        let mut handles = Vec::with_capacity(task_count);
        let mut expired = false;

        for index in order {
            let task = Arc::clone(&tasks[index]);

            let permit = if expired {
                None
            } else {
                acquire_permit(&semaphore, deadline).await?
            };
            let Some(permit) = permit else {
                expired = true;
                results[index] = Some(expire(&task, &events));
                continue;
            };

            debug!(task_id = %task.id, priority = task.priority, "Task dispatched");
            events.emit("task_dispatched", &TaskEventData::new(task.id.clone(), task.priority));

            let pipeline = Arc::clone(&self.pipeline);
            let stats = Arc::clone(&stats);
            let gauge = Arc::clone(&gauge);
            let task_events = events.clone();
            let spawned = Arc::clone(&task);
            let handle = tokio::spawn(async move {
                let _permit: OwnedSemaphorePermit = permit;
                let in_flight = gauge.enter();
                let start_us = batch_start.elapsed().as_micros() as u64;
                let result = pipeline.run(&spawned, &stats, &task_events).await;
                let end_us = batch_start.elapsed().as_micros() as u64;
                drop(in_flight);
                report_completion(&spawned, &result, &task_events);
                (result, start_us, end_us)
            });
            handles.push((index, task, handle));
        }

        let mut timings = Vec::with_capacity(handles.len());
        for (index, task, handle) in handles {
            let result = match handle.await {
                Ok((result, start_us, end_us)) => {
                    timings.push(TaskTiming {
                        task_id: task.id.clone(),
                        index,
                        start_us,
                        end_us,
                    });
                    result
                }
                Err(join_error) => {
                    let reason = if join_error.is_panic() {
                        panic_message(join_error.into_panic().as_ref())
                    } else {
                        "task cancelled".to_string()
                    };
                    error!(task_id = %task.id, error = %reason, "Generation task aborted");
                    let result = GenerationResult::failed(task.id.clone(), reason, 0, 0);
                    report_completion(&task, &result, &events);
                    result
                }
            };
            results[index] = Some(result);
        }

        let results: Vec<GenerationResult> = results
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    GenerationResult::failed(tasks[index].id.clone(), "task produced no result", 0, 0)
                })
            })
            .collect();
        for result in &results {
            stats.record_outcome(result);
        }

        let statistics = stats.snapshot();
        self.lifetime.absorb(&statistics);
        let wall_clock_ms = batch_start.elapsed().as_millis() as u64;
        let peak_in_flight = gauge.peak();

        info!(
            batch_id = %batch_id,
            succeeded = statistics.successful_generations,
            failed = statistics.failed_generations,
            cache_hits = statistics.cache_hits,
            retries = statistics.retries,
            wall_clock_ms,
            peak_in_flight,
            "Generation batch completed"
        );
        events.emit(
            "batch_completed",
            &BatchStatsEventData {
                tasks_submitted: statistics.tasks_submitted,
                successful_generations: statistics.successful_generations,
                failed_generations: statistics.failed_generations,
                cache_hits: statistics.cache_hits,
                retries: statistics.retries,
            },
        );

        Ok(BatchOutcome {
            batch_id,
            results,
            timings,
            statistics,
            concurrency,
            wall_clock_ms,
            peak_in_flight,
        })
    }
}

/// `Ok(None)` once the deadline has passed.
async fn acquire_permit(
    semaphore: &Arc<Semaphore>,
    deadline: Option<Instant>,
) -> Result<Option<OwnedSemaphorePermit>, ApiError> {
    let acquire = Arc::clone(semaphore).acquire_owned();
    let permit = match deadline {
        None => acquire.await,
        Some(deadline) => {
            if Instant::now() >= deadline {
                return Ok(None);
            }
            match tokio::time::timeout_at(deadline, acquire).await {
                Ok(permit) => permit,
                Err(_) => return Ok(None),
            }
        }
    };
    permit
        .map(Some)
        .map_err(|_| ApiError::Scheduling("concurrency limiter closed".to_string()))
}

fn expire(task: &GenerationTask, events: &EventEmitter) -> GenerationResult {
    warn!(task_id = %task.id, "Batch deadline passed before dispatch");
    events.emit("task_expired", &TaskEventData::new(task.id.clone(), task.priority));
    GenerationResult::failed(
        task.id.clone(),
        "batch deadline exceeded before dispatch",
        0,
        0,
    )
}

fn report_completion(task: &GenerationTask, result: &GenerationResult, events: &EventEmitter) {
    let data = TaskEventData {
        retry_count: Some(result.retry_count),
        duration_ms: Some(result.generation_time_ms),
        error: result.error_message.clone(),
        ..TaskEventData::new(task.id.clone(), task.priority)
    };
    if result.success {
        debug!(
            task_id = %task.id,
            retries = result.retry_count,
            duration_ms = result.generation_time_ms,
            "Task completed"
        );
        events.emit("task_completed", &data);
    } else {
        warn!(
            task_id = %task.id,
            retries = result.retry_count,
            error = result.error_message.as_deref().unwrap_or_default(),
            "Task failed"
        );
        events.emit("task_failed", &data);
    }
}
