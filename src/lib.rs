//! genpool: Bounded-Concurrency Generation Executor
//!
//! Turns a batch of independent generation tasks into a batch of results under a
//! fixed concurrency ceiling, with content-addressed caching, retry with
//! exponential backoff, post-generation validation and batch analytics.
//!
//! Entry point is [`executor::GenerationExecutor`].

pub mod adapter;
pub mod analysis;
pub mod backend;
pub mod cache;
pub mod chaos;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod retry;
pub mod scheduler;
pub mod stats;
pub mod telemetry;
pub mod types;
pub mod validator;

pub use error::{ApiError, GenerationError};
pub use executor::{BatchOutcome, ExecutorConfig, GenerationExecutor};
pub use types::{AnalysisMetadata, GenerationResult, GenerationTask, StyleParameters};
