//! Style and character consistency scores derived from quality-score spread.

use super::{mean, variance};
use crate::types::{AnalysisMetadata, GenerationResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const CHARACTER_WEIGHT: f64 = 0.4;
const STYLE_WEIGHT: f64 = 0.35;
const RANGE_WEIGHT: f64 = 0.25;
const MAX_CHARACTER_VARIANCE_PENALTY: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterConsistency {
    pub character: String,
    pub task_count: usize,
    pub successful: usize,
    pub avg_quality: f64,
    pub variance: f64,
    /// None when no task of this character succeeded with a score
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyAnalysis {
    /// `max(0, 1 - 2 * variance)` over successful scores
    pub style_consistency: f64,
    /// Mean of the per-character scores; None without character labels
    pub character_consistency: Option<f64>,
    pub characters: Vec<CharacterConsistency>,
    /// `1 - (max - min)` over successful scores
    pub quality_range_score: f64,
    pub overall_score: f64,
}

impl ConsistencyAnalysis {
    pub fn analyze(results: &[GenerationResult], metadata: &AnalysisMetadata) -> Self {
        let by_id: HashMap<&str, &GenerationResult> =
            results.iter().map(|r| (r.task_id.as_str(), r)).collect();
        let scores = successful_scores(results.iter());

        let style_consistency = style_score(&scores);
        let quality_range_score = range_score(&scores);

        let characters: Vec<CharacterConsistency> = metadata
            .characters
            .iter()
            .map(|(name, task_ids)| {
                let labelled = task_ids.iter().filter_map(|id| by_id.get(id.as_str()).copied());
                character_score(name, task_ids.len(), successful_scores(labelled))
            })
            .collect();

        let character_scores: Vec<f64> = characters.iter().filter_map(|c| c.score).collect();
        let character_consistency = if character_scores.is_empty() {
            None
        } else {
            Some(mean(&character_scores))
        };

        // Without character labels the style score stands in for the character term.
        let character_term = character_consistency.unwrap_or(style_consistency);
        let overall_score = (CHARACTER_WEIGHT * character_term
            + STYLE_WEIGHT * style_consistency
            + RANGE_WEIGHT * quality_range_score)
            .clamp(0.0, 1.0);

        Self {
            style_consistency,
            character_consistency,
            characters,
            quality_range_score,
            overall_score,
        }
    }
}

fn successful_scores<'a>(results: impl Iterator<Item = &'a GenerationResult>) -> Vec<f64> {
    results
        .filter(|r| r.success)
        .filter_map(|r| r.quality_score)
        .collect()
}

fn style_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    (1.0 - 2.0 * variance(scores)).max(0.0)
}

fn range_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let max = scores.iter().cloned().fold(f64::MIN, f64::max);
    let min = scores.iter().cloned().fold(f64::MAX, f64::min);
    (1.0 - (max - min)).clamp(0.0, 1.0)
}

fn character_score(name: &str, task_count: usize, scores: Vec<f64>) -> CharacterConsistency {
    let avg_quality = mean(&scores);
    let spread = variance(&scores);
    let score = (!scores.is_empty())
        .then(|| avg_quality * (1.0 - spread.min(MAX_CHARACTER_VARIANCE_PENALTY)));
    CharacterConsistency {
        character: name.to_string(),
        task_count,
        successful: scores.len(),
        avg_quality,
        variance: spread,
        score,
    }
}
