//! Shared backends and helpers for integration tests.

use async_trait::async_trait;
use genpool::backend::{BackendOutput, GenerationBackend};
use genpool::{ExecutorConfig, GenerationError, GenerationTask};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

/// Serializes tests that touch process-wide environment variables.
pub fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Executor config with a 1 ms backoff unit so retry tests stay fast.
pub fn fast_config(concurrency: usize) -> ExecutorConfig {
    ExecutorConfig::default()
        .with_concurrency(concurrency)
        .with_retry_base_delay(Duration::from_millis(1))
}

pub fn task(id: &str) -> GenerationTask {
    GenerationTask::new(id, format!("prompt for {}", id))
}

pub fn output(url: &str, quality: f64) -> BackendOutput {
    BackendOutput {
        artifact_url: url.to_string(),
        thumbnail_url: None,
        quality_score: Some(quality),
    }
}

/// Sleeps for a fixed latency and records how many calls overlap.
pub struct TrackingBackend {
    latency: Duration,
    quality: f64,
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    order: Mutex<Vec<String>>,
}

impl TrackingBackend {
    pub fn new(latency: Duration, quality: f64) -> Self {
        Self {
            latency,
            quality,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            order: Mutex::new(Vec::new()),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Task ids in the order their first call started.
    pub fn call_order(&self) -> Vec<String> {
        self.order.lock().clone()
    }
}

#[async_trait]
impl GenerationBackend for TrackingBackend {
    async fn generate(&self, task: &GenerationTask) -> Result<BackendOutput, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.order.lock().push(task.id.clone());
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(output(
            &format!("https://cdn.test/{}.png", task.id),
            self.quality,
        ))
    }

    fn name(&self) -> &str {
        "tracking"
    }
}

/// Fails the first `failures` calls for every task id, then succeeds.
pub struct FlakyBackend {
    failures: u32,
    error: GenerationError,
    seen: Mutex<HashMap<String, u32>>,
}

impl FlakyBackend {
    pub fn new(failures: u32, error: GenerationError) -> Self {
        Self {
            failures,
            error,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn always_failing(error: GenerationError) -> Self {
        Self::new(u32::MAX, error)
    }

    pub fn calls_for(&self, task_id: &str) -> u32 {
        self.seen.lock().get(task_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl GenerationBackend for FlakyBackend {
    async fn generate(&self, task: &GenerationTask) -> Result<BackendOutput, GenerationError> {
        let call = {
            let mut seen = self.seen.lock();
            let count = seen.entry(task.id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if call <= self.failures {
            return Err(self.error.clone());
        }
        Ok(output(&format!("https://cdn.test/{}.png", task.id), 0.9))
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Panics on the first `panics` calls, then succeeds.
pub struct PanickingBackend {
    panics: usize,
    calls: AtomicUsize,
}

impl PanickingBackend {
    pub fn new(panics: usize) -> Self {
        Self {
            panics,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GenerationBackend for PanickingBackend {
    async fn generate(&self, task: &GenerationTask) -> Result<BackendOutput, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.panics {
            panic!("backend exploded on call {}", call);
        }
        Ok(output(&format!("https://cdn.test/{}.png", task.id), 0.85))
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// Answers with a fixed quality score per task id; unknown ids fail.
pub struct ScriptedBackend {
    quality: HashMap<String, f64>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(quality: &[(&str, f64)]) -> Self {
        Self {
            quality: quality
                .iter()
                .map(|(id, score)| (id.to_string(), *score))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, task: &GenerationTask) -> Result<BackendOutput, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.quality.get(&task.id) {
            Some(score) => Ok(output(
                &format!("https://cdn.test/{}.png", task.id),
                *score,
            )),
            None => Err(GenerationError::Backend(format!(
                "no script for {}",
                task.id
            ))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
