//! Telemetry domain: execution events, sinks, and batch identifiers.

mod types;

pub mod events;
pub mod sink;

pub use events::{
    BatchEventData, BatchStatsEventData, EventEnvelope, ExecutionEvent, TaskEventData,
};
pub use sink::{EventEmitter, EventSink, MemorySink, TracingSink};
pub use types::{new_batch_id, now_millis};
