//! Generation adapter
//!
//! Wraps exactly one call to the generation backend per attempt and owns the
//! cache reads and writes around it. Backend failures come back as
//! [`GenerationError`]s for the retry policy to inspect; nothing is thrown.
//!
//! When a fallback backend is configured, an attempt whose primary call could not
//! reach the service at all is answered by the fallback instead.

use crate::backend::{BackendOutput, BackendSet, GenerationBackend};
use crate::cache::{CacheEntry, CacheKey, GenerationCache};
use crate::error::GenerationError;
use crate::stats::GenerationStatistics;
use crate::telemetry::{EventEmitter, TaskEventData};
use crate::types::{GenerationResult, GenerationTask};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct GenerationAdapter {
    primary: Arc<dyn GenerationBackend>,
    fallback: Option<Arc<dyn GenerationBackend>>,
    cache: Option<Arc<GenerationCache>>,
    attempt_timeout: Option<Duration>,
}

impl GenerationAdapter {
    pub fn new(primary: Arc<dyn GenerationBackend>) -> Self {
        Self {
            primary,
            fallback: None,
            cache: None,
            attempt_timeout: None,
        }
    }

    pub fn from_backends(backends: BackendSet) -> Self {
        Self {
            primary: backends.primary,
            fallback: backends.fallback,
            cache: None,
            attempt_timeout: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Option<Arc<dyn GenerationBackend>>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_cache(mut self, cache: Option<Arc<GenerationCache>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Option<Duration>) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn cache(&self) -> Option<&Arc<GenerationCache>> {
        self.cache.as_ref()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.cache.as_ref()?.lookup(key)
    }

    /// Store an accepted result. Failed results are ignored.
    pub fn commit(&self, key: CacheKey, result: &GenerationResult) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Some(entry) = CacheEntry::from_result(result) {
            debug!(task_id = %result.task_id, key = %key.short(), "Cached generation result");
            cache.store(key, entry);
        }
    }

    /// One generation attempt.
    pub async fn attempt(
        &self,
        task: &GenerationTask,
        attempt: u32,
        stats: &GenerationStatistics,
        events: &EventEmitter,
    ) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        debug!(
            task_id = %task.id,
            backend = %self.primary.name(),
            attempt = attempt.saturating_add(1),
            "Backend request sent"
        );

        let output = match self.call(self.primary.as_ref(), task).await {
            Err(err) if err.is_unreachable() && self.fallback.is_some() => {
                let fallback = self.fallback.as_ref().map(Arc::clone);
                let Some(fallback) = fallback else {
                    return Err(err);
                };
                warn!(
                    task_id = %task.id,
                    primary = %self.primary.name(),
                    fallback = %fallback.name(),
                    error = %err,
                    "Primary backend unreachable, using fallback backend"
                );
                stats.record_fallback();
                events.emit(
                    "task_fallback",
                    &TaskEventData {
                        attempt: Some(attempt.saturating_add(1)),
                        error: Some(err.to_string()),
                        ..TaskEventData::new(task.id.clone(), task.priority)
                    },
                );
                self.call(fallback.as_ref(), task).await
            }
            other => other,
        }?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if !output.artifact_url.trim().is_empty() {
            stats.record_generated();
        }
        debug!(
            task_id = %task.id,
            attempt = attempt.saturating_add(1),
            duration_ms = elapsed_ms,
            quality_score = ?output.quality_score,
            "Backend response received"
        );

        Ok(GenerationResult::succeeded(
            task.id.clone(),
            output.artifact_url,
            output.thumbnail_url,
            output.quality_score,
            elapsed_ms,
        ))
    }

    async fn call(
        &self,
        backend: &dyn GenerationBackend,
        task: &GenerationTask,
    ) -> Result<BackendOutput, GenerationError> {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, backend.generate(task))
                .await
                .map_err(|_| GenerationError::Timeout(limit))?,
            None => backend.generate(task).await,
        }
    }
}
