//! Task and metadata files read by the CLI.

use crate::error::ApiError;
use crate::types::{
    AnalysisMetadata, GenerationTask, StyleParameters, TaskId, DEFAULT_PRIORITY,
};
use serde::Deserialize;
use std::path::Path;

/// Task as written in a tasks file; omitted knobs take configured defaults.
#[derive(Debug, Deserialize)]
struct TaskEntry {
    id: TaskId,
    prompt: String,
    #[serde(default)]
    negative_prompt: String,
    #[serde(default)]
    style: StyleParameters,
    #[serde(default)]
    priority: Option<u8>,
    #[serde(default)]
    max_retries: Option<u32>,
}

impl TaskEntry {
    fn into_task(self, default_max_retries: u32) -> GenerationTask {
        GenerationTask::new(self.id, self.prompt)
            .with_negative_prompt(self.negative_prompt)
            .with_style(self.style)
            .with_priority(self.priority.unwrap_or(DEFAULT_PRIORITY))
            .with_max_retries(self.max_retries.unwrap_or(default_max_retries))
    }
}

pub fn parse_tasks(json: &str, default_max_retries: u32) -> Result<Vec<GenerationTask>, ApiError> {
    let entries: Vec<TaskEntry> = serde_json::from_str(json)?;
    Ok(entries
        .into_iter()
        .map(|entry| entry.into_task(default_max_retries))
        .collect())
}

pub fn load_tasks(path: &Path, default_max_retries: u32) -> Result<Vec<GenerationTask>, ApiError> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        ApiError::InvalidTask(format!("Failed to read tasks file {}: {}", path.display(), e))
    })?;
    parse_tasks(&json, default_max_retries)
}

pub fn load_metadata(path: Option<&Path>) -> Result<AnalysisMetadata, ApiError> {
    let Some(path) = path else {
        return Ok(AnalysisMetadata::default());
    };
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
