//! Event schema for execution telemetry.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub ts: String,
    pub batch: String,
    pub seq: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub ts: String,
    pub batch: String,
    pub event_type: String,
    pub data: Value,
}

impl EventEnvelope {
    pub fn with_now(batch: impl Into<String>, event_type: impl Into<String>, data: Value) -> Self {
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            batch: batch.into(),
            event_type: event_type.into(),
            data,
        }
    }
}

impl ExecutionEvent {
    pub fn from_envelope(envelope: EventEnvelope, seq: u64) -> Self {
        Self {
            ts: envelope.ts,
            batch: envelope.batch,
            seq,
            event_type: envelope.event_type,
            data: envelope.data,
        }
    }

    /// `task_id` field of the payload, when present.
    pub fn task_id(&self) -> Option<&str> {
        self.data.get("task_id").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEventData {
    pub task_count: usize,
    pub concurrency: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_clock_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskEventData {
    pub task_id: String,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskEventData {
    pub fn new(task_id: impl Into<String>, priority: u8) -> Self {
        Self {
            task_id: task_id.into(),
            priority,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatsEventData {
    pub tasks_submitted: u64,
    pub successful_generations: u64,
    pub failed_generations: u64,
    pub cache_hits: u64,
    pub retries: u64,
}
