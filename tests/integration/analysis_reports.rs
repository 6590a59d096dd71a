//! Post-batch analytics over real executor outcomes.

use crate::integration::test_utils::{fast_config, task, FlakyBackend, ScriptedBackend};
use genpool::analysis::{BatchAnalysis, CacheEfficiency};
use genpool::backend::{SimulatedBackend, SimulationProfile};
use genpool::{AnalysisMetadata, GenerationError, GenerationExecutor, GenerationTask};
use std::collections::BTreeMap;
use std::sync::Arc;

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn uniform_quality_batch_scores_perfectly() {
    let profile = SimulationProfile {
        base_latency_ms: 30,
        ..SimulationProfile::deterministic(0.9)
    };
    let executor = GenerationExecutor::builder(Arc::new(SimulatedBackend::new(profile)))
        .config(fast_config(3))
        .build();

    let tasks: Vec<GenerationTask> = (0..10)
        .map(|i| GenerationTask::new(format!("panel-{}", i), format!("panel {} of the chase", i)))
        .collect();
    let outcome = executor.run_batch(tasks).await.unwrap();
    let analysis = BatchAnalysis::compute(&outcome, &AnalysisMetadata::default());

    let quality = &analysis.quality;
    assert_eq!(quality.total_tasks, 10);
    assert!(close(quality.success_rate, 1.0));
    assert!(close(quality.avg_quality_score, 0.9));
    assert_eq!(quality.quality_distribution.high, 10);
    assert_eq!(quality.quality_distribution.medium, 0);
    assert_eq!(quality.retry_statistics.no_retry, 10);
    assert!(quality.failure_analysis.is_empty());
    assert!(quality.recommendations.is_empty());

    let consistency = &analysis.consistency;
    assert!(close(consistency.style_consistency, 1.0));
    assert!(close(consistency.quality_range_score, 1.0));
    assert_eq!(consistency.character_consistency, None);
    assert!(close(consistency.overall_score, 1.0));

    let efficiency = &analysis.parallel_efficiency;
    assert_eq!(efficiency.task_count, 10);
    assert_eq!(efficiency.concurrency, 3);
    assert!(efficiency.score > 0.2 && efficiency.score <= 0.3, "score {}", efficiency.score);
    assert!(efficiency.speedup > 1.5, "speedup {}", efficiency.speedup);

    assert_eq!(analysis.cache_utilization.cache_hits, 0);
    assert_eq!(analysis.cache_utilization.efficiency, CacheEfficiency::Low);
}

#[tokio::test]
async fn repeated_failures_surface_in_recommendations() {
    let backend = Arc::new(FlakyBackend::always_failing(GenerationError::AuthFailed(
        "key revoked".into(),
    )));
    let executor = GenerationExecutor::builder(backend)
        .config(fast_config(2))
        .build();

    let outcome = executor
        .run_batch(vec![task("a"), task("b"), task("c")])
        .await
        .unwrap();
    let analysis = BatchAnalysis::compute(&outcome, &AnalysisMetadata::default());

    assert!(close(analysis.quality.success_rate, 0.0));
    assert_eq!(
        analysis
            .quality
            .failure_analysis
            .get("Backend authentication failed: key revoked"),
        Some(&3)
    );
    assert_eq!(
        analysis.quality.recommendations,
        vec![
            "Success rate is 0%: optimize prompts and simplify style parameters".to_string(),
            "Most common failure (3 occurrences): Backend authentication failed: key revoked"
                .to_string(),
        ]
    );
    assert!(close(analysis.consistency.overall_score, 0.0));
}

#[tokio::test]
async fn metadata_drives_character_and_page_reports() {
    let backend = Arc::new(ScriptedBackend::new(&[
        ("hero-1", 0.9),
        ("hero-2", 0.9),
        ("villain-1", 0.7),
        ("villain-2", 0.9),
        ("crowd", 0.8),
    ]));
    let executor = GenerationExecutor::builder(backend)
        .config(fast_config(2))
        .build();

    let tasks: Vec<GenerationTask> = ["hero-1", "hero-2", "villain-1", "villain-2", "crowd", "lost"]
        .iter()
        .map(|id| task(id).with_max_retries(0))
        .collect();
    let outcome = executor.run_batch(tasks).await.unwrap();

    let metadata = AnalysisMetadata {
        characters: BTreeMap::from([
            ("hero".to_string(), ids(&["hero-1", "hero-2"])),
            ("villain".to_string(), ids(&["villain-1", "villain-2"])),
        ]),
        pages: BTreeMap::from([
            ("page-1".to_string(), ids(&["hero-1", "villain-1"])),
            ("page-2".to_string(), ids(&["hero-2", "lost", "cut-scene"])),
        ]),
    };
    let analysis = BatchAnalysis::compute(&outcome, &metadata);

    let characters = &analysis.consistency.characters;
    assert_eq!(characters.len(), 2);
    let hero = characters.iter().find(|c| c.character == "hero").unwrap();
    assert_eq!(hero.successful, 2);
    assert!(close(hero.variance, 0.0));
    let villain = characters.iter().find(|c| c.character == "villain").unwrap();
    assert!(close(villain.avg_quality, 0.8));
    assert!(villain.variance > 0.0);
    let character_score = analysis.consistency.character_consistency.unwrap();
    let expected = (0.9 + 0.8 * (1.0 - villain.variance)) / 2.0;
    assert!((character_score - expected).abs() < 1e-6, "character score {}", character_score);

    let mapping = &analysis.page_mapping;
    assert_eq!(mapping.pages.len(), 2);
    let page_one = &mapping.pages[0];
    assert_eq!(page_one.page, "page-1");
    assert!(page_one.is_complete());
    assert_eq!(page_one.artifact_urls.len(), 2);
    let page_two = &mapping.pages[1];
    assert_eq!(page_two.succeeded, 1);
    assert_eq!(page_two.failed, 1);
    assert_eq!(page_two.missing, ids(&["cut-scene"]));
    assert!(!page_two.is_complete());
    assert_eq!(mapping.complete_pages(), 1);
    assert_eq!(mapping.unmapped, ids(&["villain-2", "crowd"]));
}
