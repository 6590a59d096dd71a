//! Core data model: generation tasks, style parameters and generation results.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Task identifier, unique within a batch
pub type TaskId = String;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;
pub const DEFAULT_PRIORITY: u8 = 5;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArtStyle {
    #[default]
    Manga,
    Manhwa,
    Comic,
    Webtoon,
    Realistic,
}

impl ArtStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtStyle::Manga => "manga",
            ArtStyle::Manhwa => "manhwa",
            ArtStyle::Comic => "comic",
            ArtStyle::Webtoon => "webtoon",
            ArtStyle::Realistic => "realistic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Draft,
    #[default]
    Standard,
    High,
    Ultra,
}

impl QualityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityLevel::Draft => "draft",
            QualityLevel::Standard => "standard",
            QualityLevel::High => "high",
            QualityLevel::Ultra => "ultra",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    #[default]
    Color,
    Monochrome,
    Sepia,
}

impl ColorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Color => "color",
            ColorMode::Monochrome => "monochrome",
            ColorMode::Sepia => "sepia",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    #[default]
    Character,
    Action,
    Background,
    Dialogue,
    Emotion,
}

impl Emphasis {
    pub fn as_str(self) -> &'static str {
        match self {
            Emphasis::Character => "character",
            Emphasis::Action => "action",
            Emphasis::Background => "background",
            Emphasis::Dialogue => "dialogue",
            Emphasis::Emotion => "emotion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl DetailLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Low => "low",
            DetailLevel::Medium => "medium",
            DetailLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Energy {
    Calm,
    Moderate,
    Intense,
}

impl Energy {
    pub fn as_str(self) -> &'static str {
        match self {
            Energy::Calm => "calm",
            Energy::Moderate => "moderate",
            Energy::Intense => "intense",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineWeight {
    Thin,
    Medium,
    Bold,
}

impl LineWeight {
    pub fn as_str(self) -> &'static str {
        match self {
            LineWeight::Thin => "thin",
            LineWeight::Medium => "medium",
            LineWeight::Bold => "bold",
        }
    }
}

/// Flat bundle of enumerated style knobs.
///
/// Opaque to the executor: it only feeds the cache key and is forwarded to the
/// generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct StyleParameters {
    #[serde(default)]
    pub art_style: ArtStyle,
    #[serde(default)]
    pub quality: QualityLevel,
    #[serde(default)]
    pub color_mode: ColorMode,
    #[serde(default)]
    pub emphasis: Emphasis,
    #[serde(default)]
    pub detail_level: DetailLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<Energy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_weight: Option<LineWeight>,
}

impl StyleParameters {
    /// Sorted field map; absent optional knobs are omitted.
    pub fn canonical_fields(&self) -> BTreeMap<&'static str, &'static str> {
        let mut fields = BTreeMap::new();
        fields.insert("art_style", self.art_style.as_str());
        fields.insert("quality", self.quality.as_str());
        fields.insert("color_mode", self.color_mode.as_str());
        fields.insert("emphasis", self.emphasis.as_str());
        fields.insert("detail_level", self.detail_level.as_str());
        if let Some(energy) = self.energy {
            fields.insert("energy", energy.as_str());
        }
        if let Some(line_weight) = self.line_weight {
            fields.insert("line_weight", line_weight.as_str());
        }
        fields
    }
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// One unit of requested generation work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTask {
    pub id: TaskId,
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    #[serde(default)]
    pub style: StyleParameters,
    /// 1 (lowest) to 10 (highest)
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl GenerationTask {
    pub fn new(id: impl Into<TaskId>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            negative_prompt: String::new(),
            style: StyleParameters::default(),
            priority: DEFAULT_PRIORITY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = negative_prompt.into();
        self
    }

    pub fn with_style(mut self, style: StyleParameters) -> Self {
        self.style = style;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.id.trim().is_empty() {
            return Err(ApiError::InvalidTask("task id cannot be empty".to_string()));
        }
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&self.priority) {
            return Err(ApiError::InvalidTask(format!(
                "task '{}' has priority {} outside {}..={}",
                self.id, self.priority, MIN_PRIORITY, MAX_PRIORITY
            )));
        }
        Ok(())
    }
}

/// Outcome of one task. Produced exactly once per task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub task_id: TaskId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    pub generation_time_ms: u64,
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl GenerationResult {
    pub fn succeeded(
        task_id: impl Into<TaskId>,
        artifact_url: impl Into<String>,
        thumbnail_url: Option<String>,
        quality_score: Option<f64>,
        generation_time_ms: u64,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            artifact_url: Some(artifact_url.into()),
            thumbnail_url,
            quality_score,
            generation_time_ms,
            retry_count: 0,
            error_message: None,
        }
    }

    pub fn failed(
        task_id: impl Into<TaskId>,
        error_message: impl Into<String>,
        generation_time_ms: u64,
        retry_count: u32,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            artifact_url: None,
            thumbnail_url: None,
            quality_score: None,
            generation_time_ms,
            retry_count,
            error_message: Some(error_message.into()),
        }
    }

    /// Result served from the cache: no generation time, no retries.
    pub fn from_cache(
        task_id: impl Into<TaskId>,
        artifact_url: impl Into<String>,
        thumbnail_url: Option<String>,
        quality_score: Option<f64>,
    ) -> Self {
        Self::succeeded(task_id, artifact_url, thumbnail_url, quality_score, 0)
    }

    /// Reclassify as failed, keeping timing, retry count and payload for diagnostics.
    pub fn rejected(mut self, reason: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(reason.into());
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_generation_time_ms(mut self, generation_time_ms: u64) -> Self {
        self.generation_time_ms = generation_time_ms;
        self
    }

    pub fn has_artifact(&self) -> bool {
        self.artifact_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Labels supplied by the task producer for the consistency and mapping reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Character name to the tasks depicting that character
    #[serde(default)]
    pub characters: BTreeMap<String, Vec<TaskId>>,
    /// Page (or scene) label to the tasks that make it up
    #[serde(default)]
    pub pages: BTreeMap<String, Vec<TaskId>>,
}

impl AnalysisMetadata {
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.pages.is_empty()
    }
}
