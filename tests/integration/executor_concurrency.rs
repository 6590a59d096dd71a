//! Dispatch, concurrency bound and result completeness.

use crate::integration::test_utils::{fast_config, task, ScriptedBackend, TrackingBackend};
use genpool::cache::{CacheEntry, CacheKey, GenerationCache};
use genpool::executor::max_overlap;
use genpool::telemetry::{EventSink, ExecutionEvent, MemorySink};
use genpool::{ApiError, GenerationExecutor, GenerationResult, GenerationTask};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_work_never_exceeds_the_limit() {
    for concurrency in [1usize, 2, 3, 5] {
        let backend = Arc::new(TrackingBackend::new(Duration::from_millis(20), 0.9));
        let executor = GenerationExecutor::builder(backend.clone())
            .config(fast_config(concurrency))
            .without_cache()
            .build();

        let tasks: Vec<_> = (0..12).map(|i| task(&format!("t{}", i))).collect();
        let outcome = executor.run_batch(tasks).await.unwrap();

        assert_eq!(outcome.results.len(), 12);
        assert_eq!(backend.calls(), 12);
        assert_eq!(outcome.concurrency, concurrency);
        assert!(
            backend.peak() <= concurrency,
            "backend saw {} concurrent calls with limit {}",
            backend.peak(),
            concurrency
        );
        assert!(outcome.peak_in_flight <= concurrency);
        assert!(max_overlap(&outcome.timings) <= concurrency);
        assert_eq!(backend.peak(), concurrency, "limit {} should be saturated", concurrency);
    }
}

#[tokio::test]
async fn higher_priority_tasks_are_dispatched_first() {
    let backend = Arc::new(TrackingBackend::new(Duration::from_millis(30), 0.9));
    let sink = Arc::new(MemorySink::new());
    let executor = GenerationExecutor::builder(backend.clone())
        .config(fast_config(2))
        .event_sink(sink.clone())
        .build();

    let tasks: Vec<_> = [9u8, 1, 5, 3, 7]
        .iter()
        .map(|priority| task(&format!("p{}", priority)).with_priority(*priority))
        .collect();
    let outcome = executor.run_batch(tasks).await.unwrap();

    let dispatched: Vec<String> = sink
        .events_of_type("task_dispatched")
        .iter()
        .filter_map(|event| event.task_id().map(str::to_string))
        .collect();
    assert_eq!(dispatched, vec!["p9", "p7", "p5", "p3", "p1"]);

    let first_two: HashSet<_> = backend.call_order().into_iter().take(2).collect();
    assert_eq!(first_two, HashSet::from(["p9".to_string(), "p7".to_string()]));

    let start = |id: &str| outcome.timing_for(id).unwrap().start_us;
    assert!(start("p9") <= start("p5"));
    assert!(start("p7") <= start("p5"));

    let ids: Vec<_> = outcome.results.iter().map(|r| r.task_id.as_str()).collect();
    assert_eq!(ids, vec!["p9", "p1", "p5", "p3", "p7"]);
}

#[tokio::test]
async fn every_task_gets_exactly_one_result() {
    let backend = Arc::new(ScriptedBackend::new(&[("a", 0.9), ("c", 0.7), ("e", 0.95)]));
    let executor = GenerationExecutor::builder(backend)
        .config(fast_config(2))
        .build();

    let tasks: Vec<GenerationTask> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|id| task(id).with_max_retries(1))
        .collect();
    let outcome = executor.run_batch(tasks).await.unwrap();

    let ids: Vec<_> = outcome.results.iter().map(|r| r.task_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
    assert_eq!(outcome.successful().count(), 3);
    assert_eq!(outcome.failed().count(), 2);
    for failed in outcome.failed() {
        assert_eq!(failed.retry_count, 1);
        assert!(failed.error_message.as_deref().unwrap().contains("no script"));
    }
    assert!(outcome.statistics.is_settled());
    assert_eq!(outcome.statistics.tasks_submitted, 5);
}

#[tokio::test]
async fn invalid_priority_fails_the_whole_batch() {
    let backend = Arc::new(ScriptedBackend::new(&[("a", 0.9)]));
    let executor = GenerationExecutor::builder(backend.clone()).build();
    let result = executor
        .run_batch(vec![task("a"), task("b").with_priority(11)])
        .await;
    assert!(matches!(result, Err(ApiError::InvalidTask(_))));
    assert_eq!(backend.calls(), 0, "nothing runs when validation fails");
}

#[tokio::test]
async fn deadline_expires_tasks_still_waiting_for_a_permit() {
    let backend = Arc::new(TrackingBackend::new(Duration::from_millis(150), 0.9));
    let sink = Arc::new(MemorySink::new());
    let executor = GenerationExecutor::builder(backend.clone())
        .config(fast_config(1))
        .event_sink(sink.clone())
        .build();

    let tasks = vec![
        task("first").with_priority(10),
        task("second").with_priority(5),
        task("third").with_priority(1),
    ];
    let deadline = Instant::now() + Duration::from_millis(40);
    let outcome = executor.run_batch_until(tasks, Some(deadline)).await.unwrap();

    assert!(outcome.result_for("first").unwrap().success);
    for id in ["second", "third"] {
        let result = outcome.result_for(id).unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("batch deadline exceeded before dispatch")
        );
        assert_eq!(result.generation_time_ms, 0);
    }
    assert_eq!(backend.calls(), 1);
    assert_eq!(sink.events_of_type("task_expired").len(), 2);
    assert!(outcome.statistics.is_settled());
}

struct ExplodingSink {
    inner: MemorySink,
}

impl EventSink for ExplodingSink {
    fn record(&self, event: ExecutionEvent) {
        if event.event_type == "task_cache_hit" {
            panic!("sink failure");
        }
        self.inner.record(event);
    }
}

#[tokio::test]
async fn fault_outside_the_retry_loop_becomes_a_failed_result() {
    let cache = Arc::new(GenerationCache::unbounded());
    let cached_task = task("cached");
    let seeded = GenerationResult::succeeded("seed", "https://cdn.test/seed.png", None, Some(0.9), 10);
    cache.store(
        CacheKey::for_task(&cached_task),
        CacheEntry::from_result(&seeded).unwrap(),
    );

    let sink = Arc::new(ExplodingSink {
        inner: MemorySink::new(),
    });
    let backend = Arc::new(ScriptedBackend::new(&[("fresh", 0.9)]));
    let executor = GenerationExecutor::builder(backend)
        .config(fast_config(2))
        .cache(cache)
        .event_sink(sink.clone())
        .build();

    let outcome = executor
        .run_batch(vec![cached_task, task("fresh")])
        .await
        .unwrap();

    let broken = outcome.result_for("cached").unwrap();
    assert!(!broken.success);
    assert!(broken.error_message.as_deref().unwrap().contains("sink failure"));
    assert!(outcome.result_for("fresh").unwrap().success);
    assert_eq!(sink.inner.events_of_type("task_failed").len(), 1);
    assert_eq!(sink.inner.events_of_type("batch_completed").len(), 1);
}
