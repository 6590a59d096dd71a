//! Retry, backoff, fault containment and fallback.

use crate::integration::test_utils::{fast_config, task, FlakyBackend, PanickingBackend, TrackingBackend};
use genpool::backend::{SimulatedBackend, SimulationProfile};
use genpool::telemetry::MemorySink;
use genpool::{ExecutorConfig, GenerationError, GenerationExecutor};
use std::sync::Arc;
use std::time::Duration;

fn transport() -> GenerationError {
    GenerationError::Transport("connection reset".into())
}

#[tokio::test]
async fn exhausted_retries_report_max_retries() {
    let backend = Arc::new(FlakyBackend::always_failing(GenerationError::Backend(
        "content filter".into(),
    )));
    let sink = Arc::new(MemorySink::new());
    let executor = GenerationExecutor::builder(backend.clone())
        .config(fast_config(1))
        .event_sink(sink.clone())
        .build();

    let outcome = executor
        .run_batch(vec![task("stubborn").with_max_retries(3)])
        .await
        .unwrap();

    let result = outcome.result_for("stubborn").unwrap();
    assert!(!result.success);
    assert_eq!(result.retry_count, 3);
    assert_eq!(
        result.error_message.as_deref(),
        Some("Backend reported failure: content filter")
    );
    assert_eq!(backend.calls_for("stubborn"), 4);
    assert_eq!(outcome.statistics.retries, 3);

    let attempts: Vec<u64> = sink
        .events_of_type("task_retrying")
        .iter()
        .filter_map(|event| event.data.get("attempt").and_then(|v| v.as_u64()))
        .collect();
    assert_eq!(attempts, vec![2, 3, 4]);
}

#[tokio::test]
async fn success_after_two_failures_counts_two_retries() {
    let backend = Arc::new(FlakyBackend::new(2, transport()));
    let executor = GenerationExecutor::builder(backend.clone())
        .config(fast_config(1))
        .build();

    let outcome = executor
        .run_batch(vec![task("eventually").with_max_retries(3)])
        .await
        .unwrap();

    let result = outcome.result_for("eventually").unwrap();
    assert!(result.success);
    assert_eq!(result.retry_count, 2);
    assert_eq!(backend.calls_for("eventually"), 3);
    assert_eq!(outcome.statistics.total_generated, 1);
}

#[tokio::test]
async fn maximal_retry_budget_logs_without_overflow() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let backend = Arc::new(FlakyBackend::new(1, GenerationError::Backend("warming up".into())));
    let executor = GenerationExecutor::builder(backend.clone())
        .config(fast_config(1))
        .build();

    let outcome = executor
        .run_batch(vec![task("unbounded").with_max_retries(u32::MAX)])
        .await
        .unwrap();

    let result = outcome.result_for("unbounded").unwrap();
    assert!(result.success, "{:?}", result.error_message);
    assert_eq!(result.retry_count, 1);
    assert_eq!(backend.calls_for("unbounded"), 2);
}

#[tokio::test]
async fn retry_budget_bounds_the_attempts() {
    let backend = Arc::new(FlakyBackend::new(2, transport()));
    let executor = GenerationExecutor::builder(backend.clone())
        .config(fast_config(1))
        .build();

    let outcome = executor
        .run_batch(vec![task("short-budget").with_max_retries(1), task("no-budget").with_max_retries(0)])
        .await
        .unwrap();

    let short = outcome.result_for("short-budget").unwrap();
    assert!(!short.success);
    assert_eq!(short.retry_count, 1);
    assert_eq!(backend.calls_for("short-budget"), 2);

    let none = outcome.result_for("no-budget").unwrap();
    assert!(!none.success);
    assert_eq!(none.retry_count, 0);
    assert_eq!(backend.calls_for("no-budget"), 1);
}

#[tokio::test]
async fn terminal_errors_are_not_retried() {
    let backend = Arc::new(FlakyBackend::always_failing(GenerationError::AuthFailed(
        "invalid key".into(),
    )));
    let executor = GenerationExecutor::builder(backend.clone())
        .config(fast_config(1))
        .build();

    let outcome = executor
        .run_batch(vec![task("denied").with_max_retries(5)])
        .await
        .unwrap();

    let result = outcome.result_for("denied").unwrap();
    assert!(!result.success);
    assert_eq!(result.retry_count, 0);
    assert_eq!(backend.calls_for("denied"), 1);
    assert_eq!(outcome.statistics.retries, 0);
}

#[tokio::test]
async fn panics_inside_an_attempt_are_retried() {
    let executor = GenerationExecutor::builder(Arc::new(PanickingBackend::new(1)))
        .config(fast_config(1))
        .build();
    let outcome = executor.run_batch(vec![task("fragile")]).await.unwrap();
    let result = outcome.result_for("fragile").unwrap();
    assert!(result.success);
    assert_eq!(result.retry_count, 1);

    let executor = GenerationExecutor::builder(Arc::new(PanickingBackend::new(usize::MAX)))
        .config(fast_config(2))
        .build();
    let outcome = executor
        .run_batch(vec![task("broken").with_max_retries(1), task("also-broken").with_max_retries(0)])
        .await
        .unwrap();
    for result in &outcome.results {
        assert!(!result.success);
        assert!(result.error_message.as_deref().unwrap().contains("backend exploded"));
    }
    assert!(outcome.statistics.is_settled());
}

#[tokio::test]
async fn slow_attempts_time_out() {
    let backend = Arc::new(TrackingBackend::new(Duration::from_millis(300), 0.9));
    let config = ExecutorConfig {
        attempt_timeout_ms: Some(20),
        ..fast_config(1)
    };
    let executor = GenerationExecutor::builder(backend.clone())
        .config(config)
        .build();

    let outcome = executor
        .run_batch(vec![task("sluggish").with_max_retries(1)])
        .await
        .unwrap();

    let result = outcome.result_for("sluggish").unwrap();
    assert!(!result.success);
    assert_eq!(result.retry_count, 1);
    assert!(result.error_message.as_deref().unwrap().contains("timed out"));
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn backoff_doubles_between_attempts() {
    let backend = Arc::new(FlakyBackend::new(2, transport()));
    let config = ExecutorConfig::default()
        .with_concurrency(1)
        .with_retry_base_delay(Duration::from_millis(25));
    let executor = GenerationExecutor::builder(backend).config(config).build();

    let started = std::time::Instant::now();
    let outcome = executor
        .run_batch(vec![task("patient").with_max_retries(2)])
        .await
        .unwrap();

    assert!(outcome.result_for("patient").unwrap().success);
    assert!(
        started.elapsed() >= Duration::from_millis(75),
        "expected 25ms + 50ms of backoff, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn permit_is_held_through_backoff() {
    let backend = Arc::new(FlakyBackend::new(2, transport()));
    let config = ExecutorConfig::default()
        .with_concurrency(1)
        .with_retry_base_delay(Duration::from_millis(10));
    let executor = GenerationExecutor::builder(backend).config(config).build();

    let outcome = executor
        .run_batch(vec![
            task("first").with_priority(9),
            task("second").with_priority(2),
        ])
        .await
        .unwrap();

    let first = outcome.timing_for("first").unwrap();
    let second = outcome.timing_for("second").unwrap();
    assert!(second.start_us >= first.end_us);
    assert!(first.duration_ms() >= 30);
}

#[tokio::test]
async fn unreachable_primary_uses_configured_fallback() {
    let primary = Arc::new(FlakyBackend::always_failing(transport()));
    let fallback = Arc::new(SimulatedBackend::new(SimulationProfile::deterministic(0.8)));
    let sink = Arc::new(MemorySink::new());
    let executor = GenerationExecutor::builder(primary.clone())
        .config(fast_config(1))
        .fallback(fallback)
        .event_sink(sink.clone())
        .build();

    let outcome = executor.run_batch(vec![task("rescued")]).await.unwrap();

    let result = outcome.result_for("rescued").unwrap();
    assert!(result.success);
    assert_eq!(result.retry_count, 0);
    assert_eq!(result.quality_score, Some(0.8));
    assert!(result
        .artifact_url
        .as_deref()
        .unwrap()
        .starts_with("https://sim.genpool.local/"));
    assert_eq!(outcome.statistics.fallback_generations, 1);
    assert_eq!(sink.events_of_type("task_fallback").len(), 1);
}

#[tokio::test]
async fn no_fallback_without_configuration() {
    let primary = Arc::new(FlakyBackend::always_failing(transport()));
    let executor = GenerationExecutor::builder(primary.clone())
        .config(fast_config(1))
        .build();

    let outcome = executor
        .run_batch(vec![task("stranded").with_max_retries(1)])
        .await
        .unwrap();

    let result = outcome.result_for("stranded").unwrap();
    assert!(!result.success);
    assert!(result.error_message.as_deref().unwrap().contains("unreachable"));
    assert_eq!(outcome.statistics.fallback_generations, 0);
}

#[tokio::test]
async fn backend_failures_do_not_trigger_fallback() {
    let primary = Arc::new(FlakyBackend::always_failing(GenerationError::Backend(
        "prompt refused".into(),
    )));
    let fallback = Arc::new(SimulatedBackend::new(SimulationProfile::deterministic(0.8)));
    let executor = GenerationExecutor::builder(primary)
        .config(fast_config(1))
        .fallback(fallback)
        .build();

    let outcome = executor
        .run_batch(vec![task("refused").with_max_retries(0)])
        .await
        .unwrap();
    assert!(!outcome.result_for("refused").unwrap().success);
    assert_eq!(outcome.statistics.fallback_generations, 0);
}
