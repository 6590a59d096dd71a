//! Event sinks and the per-batch emitter.

use super::events::{EventEnvelope, ExecutionEvent};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Destination for execution events
pub trait EventSink: Send + Sync {
    fn record(&self, event: ExecutionEvent);
}

/// Writes every event to the tracing subscriber at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: ExecutionEvent) {
        debug!(
            batch = %event.batch,
            seq = event.seq,
            event_type = %event.event_type,
            data = %event.data,
            "Execution event"
        );
    }
}

/// Keeps events in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<ExecutionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: ExecutionEvent) {
        self.events.lock().push(event);
    }
}

/// Stamps events for one batch with a monotonically increasing sequence number.
#[derive(Clone)]
pub struct EventEmitter {
    batch_id: String,
    seq: Arc<AtomicU64>,
    sink: Option<Arc<dyn EventSink>>,
}

impl EventEmitter {
    pub fn new(batch_id: impl Into<String>, sink: Option<Arc<dyn EventSink>>) -> Self {
        Self {
            batch_id: batch_id.into(),
            seq: Arc::new(AtomicU64::new(1)),
            sink,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Best effort: a payload that fails to serialize is logged and dropped.
    pub fn emit<T: Serialize>(&self, event_type: &str, payload: &T) {
        let Some(sink) = &self.sink else {
            return;
        };
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(err) => {
                warn!(event_type, error = %err, "Dropping unserializable execution event");
                return;
            }
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope::with_now(self.batch_id.clone(), event_type, data);
        sink.record(ExecutionEvent::from_envelope(envelope, seq));
    }
}
