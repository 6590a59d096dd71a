//! Page (scene) mapping report.

use crate::types::{AnalysisMetadata, GenerationResult, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub page: String,
    pub task_ids: Vec<TaskId>,
    pub succeeded: usize,
    pub failed: usize,
    /// Labelled tasks with no result in the batch
    pub missing: Vec<TaskId>,
    /// Artifacts of the successful tasks, in label order
    pub artifact_urls: Vec<String>,
}

impl PageSummary {
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.missing.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMappingReport {
    pub pages: Vec<PageSummary>,
    /// Tasks no page refers to, in result order
    pub unmapped: Vec<TaskId>,
}

impl PageMappingReport {
    pub fn build(results: &[GenerationResult], metadata: &AnalysisMetadata) -> Self {
        let by_id: HashMap<&str, &GenerationResult> =
            results.iter().map(|r| (r.task_id.as_str(), r)).collect();
        let mut mapped: HashSet<&str> = HashSet::new();

        let pages = metadata
            .pages
            .iter()
            .map(|(page, task_ids)| {
                let mut summary = PageSummary {
                    page: page.clone(),
                    task_ids: task_ids.clone(),
                    succeeded: 0,
                    failed: 0,
                    missing: Vec::new(),
                    artifact_urls: Vec::new(),
                };
                for id in task_ids {
                    mapped.insert(id.as_str());
                    match by_id.get(id.as_str()) {
                        Some(result) if result.success => {
                            summary.succeeded += 1;
                            summary.artifact_urls.extend(result.artifact_url.clone());
                        }
                        Some(_) => summary.failed += 1,
                        None => summary.missing.push(id.clone()),
                    }
                }
                summary
            })
            .collect();

        let unmapped = results
            .iter()
            .filter(|r| !mapped.contains(r.task_id.as_str()))
            .map(|r| r.task_id.clone())
            .collect();

        Self { pages, unmapped }
    }

    pub fn complete_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_complete()).count()
    }
}
