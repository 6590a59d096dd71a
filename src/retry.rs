//! Retry policy with exponential backoff
//!
//! Runs up to `max_retries + 1` attempts. Between attempt `k` and `k + 1`
//! (0-based) the policy sleeps `base_delay * 2^k`. Retrying is driven by
//! matching on [`GenerationError`]; a panic inside an attempt is caught and
//! handled like an [`GenerationError::Unexpected`] error. Nothing escapes: the
//! outcome is always a [`GenerationResult`].

use crate::error::GenerationError;
use crate::types::GenerationResult;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Largest backoff exponent; keeps the delay finite for large retry budgets
const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// One backoff time unit
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay slept after failed attempt `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let multiplier = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(multiplier)
    }

    /// Drive `attempt` to a final result.
    ///
    /// `attempt` receives the 0-based attempt number. `on_retry` is called before
    /// each backoff sleep with the upcoming attempt number, the error that caused
    /// it and the delay. On success `retry_count` is the number of failed attempts
    /// before it; on exhaustion it equals `max_retries`.
    pub async fn run<F, Fut, R>(&self, task_id: &str, mut attempt: F, mut on_retry: R) -> GenerationResult
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<GenerationResult, GenerationError>>,
        R: FnMut(u32, &GenerationError, Duration),
    {
        let started = Instant::now();
        let mut attempt_number: u32 = 0;

        loop {
            let outcome = match AssertUnwindSafe(attempt(attempt_number))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(payload) => Err(GenerationError::Unexpected(panic_message(payload.as_ref()))),
            };

            let error = match outcome {
                Ok(result) => return result.with_retry_count(attempt_number),
                Err(error) => error,
            };

            if !error.is_retryable() || attempt_number >= self.max_retries {
                return GenerationResult::failed(
                    task_id,
                    error.to_string(),
                    started.elapsed().as_millis() as u64,
                    attempt_number,
                );
            }

            let delay = self.backoff_delay(attempt_number);
            on_retry(attempt_number + 1, &error, delay);
            if !delay.is_zero() {
                sleep(delay).await;
            }
            attempt_number += 1;
        }
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("panic: {}", text)
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("panic: {}", text)
    } else {
        "panic: unknown payload".to_string()
    }
}
