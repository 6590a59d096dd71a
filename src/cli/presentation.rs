//! Text and JSON rendering of CLI results.

use crate::analysis::BatchAnalysis;
use crate::cache::CacheKey;
use crate::error::ApiError;
use crate::executor::BatchOutcome;
use crate::scheduler::ScheduledTask;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

#[derive(Serialize)]
struct RunReport<'a> {
    outcome: &'a BatchOutcome,
    analysis: &'a BatchAnalysis,
}

pub fn format_run_json(outcome: &BatchOutcome, analysis: &BatchAnalysis) -> Result<String, ApiError> {
    Ok(serde_json::to_string_pretty(&RunReport { outcome, analysis })?)
}

pub fn format_run_text(outcome: &BatchOutcome, analysis: &BatchAnalysis) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Batch {}", outcome.batch_id))
    ));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Task", "Status", "Quality", "Time (ms)", "Retries", "Artifact / Error"]);
    for result in &outcome.results {
        let status = if result.success {
            format!("{}", "ok".green())
        } else {
            format!("{}", "failed".red())
        };
        let quality = result
            .quality_score
            .map(|q| format!("{:.2}", q))
            .unwrap_or_else(|| "-".to_string());
        let detail = if result.success {
            result.artifact_url.clone().unwrap_or_default()
        } else {
            result.error_message.clone().unwrap_or_default()
        };
        table.add_row(vec![
            result.task_id.clone(),
            status,
            quality,
            result.generation_time_ms.to_string(),
            result.retry_count.to_string(),
            detail,
        ]);
    }
    out.push_str(&format!("{}\n\n", table));

    let stats = &outcome.statistics;
    out.push_str(&format!("{}\n", format_section_heading("Execution")));
    out.push_str(&format!(
        "  Tasks: {} ({} succeeded, {} failed)\n",
        stats.tasks_submitted, stats.successful_generations, stats.failed_generations
    ));
    out.push_str(&format!(
        "  Concurrency: {} (peak in flight {})\n",
        outcome.concurrency, outcome.peak_in_flight
    ));
    out.push_str(&format!(
        "  Retries: {}  Rejections: {}  Fallbacks: {}\n",
        stats.retries, stats.validation_rejections, stats.fallback_generations
    ));
    let efficiency = &analysis.parallel_efficiency;
    out.push_str(&format!(
        "  Wall clock: {} ms (sequential estimate {} ms, speedup {:.2}x, efficiency {:.2})\n\n",
        outcome.wall_clock_ms,
        efficiency.sequential_estimate_ms,
        efficiency.speedup,
        efficiency.score
    ));

    let quality = &analysis.quality;
    out.push_str(&format!("{}\n", format_section_heading("Quality")));
    out.push_str(&format!(
        "  Success rate: {:.1}%  Avg quality: {:.3}  Avg time: {:.0} ms\n",
        quality.success_rate * 100.0,
        quality.avg_quality_score,
        quality.avg_generation_time_ms
    ));
    out.push_str(&format!(
        "  Distribution: high {} / medium {} / low {}\n",
        quality.quality_distribution.high,
        quality.quality_distribution.medium,
        quality.quality_distribution.low
    ));
    out.push_str(&format!(
        "  Retries: none {} / single {} / multiple {}\n",
        quality.retry_statistics.no_retry,
        quality.retry_statistics.single_retry,
        quality.retry_statistics.multiple_retry
    ));
    for (message, count) in &quality.failure_analysis {
        out.push_str(&format!("  {} x{}\n", message.yellow(), count));
    }
    out.push('\n');

    let consistency = &analysis.consistency;
    out.push_str(&format!("{}\n", format_section_heading("Consistency")));
    out.push_str(&format!(
        "  Overall: {:.3}  Style: {:.3}  Range: {:.3}",
        consistency.overall_score, consistency.style_consistency, consistency.quality_range_score
    ));
    if let Some(character) = consistency.character_consistency {
        out.push_str(&format!("  Character: {:.3}", character));
    }
    out.push_str("\n\n");

    let cache = &analysis.cache_utilization;
    out.push_str(&format!("{}\n", format_section_heading("Cache")));
    out.push_str(&format!(
        "  Hits: {} of {} ({:.1}%, {})\n\n",
        cache.cache_hits,
        cache.total_generated,
        cache.hit_rate * 100.0,
        cache.efficiency.as_str()
    ));

    let mapping = &analysis.page_mapping;
    if !mapping.pages.is_empty() {
        out.push_str(&format!("{}\n", format_section_heading("Pages")));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Page", "Tasks", "Succeeded", "Failed", "Missing"]);
        for page in &mapping.pages {
            table.add_row(vec![
                page.page.clone(),
                page.task_ids.len().to_string(),
                page.succeeded.to_string(),
                page.failed.to_string(),
                page.missing.len().to_string(),
            ]);
        }
        out.push_str(&format!("{}\n", table));
        if !mapping.unmapped.is_empty() {
            out.push_str(&format!("  Unmapped: {}\n", mapping.unmapped.join(", ")));
        }
        out.push('\n');
    }

    if !quality.recommendations.is_empty() {
        out.push_str(&format!("{}\n", format_section_heading("Recommendations")));
        for recommendation in &quality.recommendations {
            out.push_str(&format!("  - {}\n", recommendation));
        }
    }

    out.trim_end().to_string()
}

#[derive(Serialize)]
struct PlanRow<'a> {
    order: usize,
    task_id: &'a str,
    priority: u8,
    max_retries: u32,
    cache_key: String,
}

fn plan_rows<'a>(plan: &'a [ScheduledTask<'a>]) -> Vec<PlanRow<'a>> {
    plan.iter()
        .enumerate()
        .map(|(order, scheduled)| PlanRow {
            order: order + 1,
            task_id: &scheduled.task.id,
            priority: scheduled.task.priority,
            max_retries: scheduled.task.max_retries,
            cache_key: CacheKey::for_task(scheduled.task).to_string(),
        })
        .collect()
}

pub fn format_plan(plan: &[ScheduledTask<'_>], format: &str) -> Result<String, ApiError> {
    let rows = plan_rows(plan);
    if format == "json" {
        return Ok(serde_json::to_string_pretty(&rows)?);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Order", "Task", "Priority", "Max retries", "Cache key"]);
    for row in &rows {
        table.add_row(vec![
            row.order.to_string(),
            row.task_id.to_string(),
            row.priority.to_string(),
            row.max_retries.to_string(),
            row.cache_key[..row.cache_key.len().min(16)].to_string(),
        ]);
    }
    Ok(table.to_string())
}
