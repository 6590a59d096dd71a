//! CLI route: single route table and run context.

use crate::analysis::BatchAnalysis;
use crate::backend::BackendKind;
use crate::cli::input::{load_metadata, load_tasks};
use crate::cli::parse::{Commands, ConfigCommands};
use crate::cli::presentation::{format_plan, format_run_json, format_run_text};
use crate::config::{ConfigLoader, GenpoolConfig};
use crate::error::ApiError;
use crate::executor::GenerationExecutor;
use crate::scheduler;
use crate::telemetry::TracingSink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Overrides a `run` invocation applies on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub concurrency: Option<usize>,
    pub simulate: bool,
    pub seed: Option<u64>,
    pub no_cache: bool,
}

impl RunOverrides {
    pub fn apply(&self, config: &mut GenpoolConfig) {
        if let Some(concurrency) = self.concurrency {
            config.executor.max_concurrent_generations = concurrency;
        }
        if self.simulate {
            config.backend.kind = BackendKind::Simulated;
        }
        if let Some(seed) = self.seed {
            config.backend.simulation.seed = Some(seed);
            config.validation.seed = Some(seed);
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
    }
}

/// Runtime context for CLI execution: workspace and the loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: GenpoolConfig,
}

impl RunContext {
    /// Load configuration from `config_path` when given, else from the workspace layers.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn with_config(workspace_root: PathBuf, config: GenpoolConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &GenpoolConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Run {
                tasks,
                metadata,
                concurrency,
                simulate,
                seed,
                no_cache,
                format,
            } => {
                let overrides = RunOverrides {
                    concurrency: *concurrency,
                    simulate: *simulate,
                    seed: *seed,
                    no_cache: *no_cache,
                };
                self.handle_run(tasks, metadata.as_deref(), &overrides, format)
            }
            Commands::Plan { tasks, format } => self.handle_plan(tasks, format),
            Commands::Config { command } => self.handle_config(command),
        }
    }

    fn handle_run(
        &self,
        tasks_path: &Path,
        metadata_path: Option<&Path>,
        overrides: &RunOverrides,
        format: &str,
    ) -> Result<String, ApiError> {
        check_format(format)?;
        let mut config = self.config.clone();
        overrides.apply(&mut config);
        ensure_valid(&config)?;

        let tasks = load_tasks(tasks_path, config.executor.default_max_retries)?;
        let metadata = load_metadata(metadata_path)?;
        let executor = GenerationExecutor::from_config(&config)?
            .event_sink(Arc::new(TracingSink))
            .build();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let outcome = runtime.block_on(executor.run_batch(tasks))?;
        info!(
            batch_id = %outcome.batch_id,
            wall_clock_ms = outcome.wall_clock_ms,
            "Run finished"
        );

        let analysis = BatchAnalysis::compute(&outcome, &metadata);
        if format == "json" {
            format_run_json(&outcome, &analysis)
        } else {
            Ok(format_run_text(&outcome, &analysis))
        }
    }

    fn handle_plan(&self, tasks_path: &Path, format: &str) -> Result<String, ApiError> {
        check_format(format)?;
        let tasks = load_tasks(tasks_path, self.config.executor.default_max_retries)?;
        scheduler::validate_batch(&tasks)?;
        format_plan(&scheduler::prioritize(&tasks), format)
    }

    fn handle_config(&self, command: &ConfigCommands) -> Result<String, ApiError> {
        match command {
            ConfigCommands::Show => toml::to_string_pretty(&self.config)
                .map_err(|e| ApiError::Serialization(e.to_string())),
            ConfigCommands::Validate => {
                ensure_valid(&self.config)?;
                Ok("Configuration is valid".to_string())
            }
        }
    }
}

fn check_format(format: &str) -> Result<(), ApiError> {
    match format {
        "text" | "json" => Ok(()),
        other => Err(ApiError::ConfigError(format!(
            "Invalid output format: {} (must be 'text' or 'json')",
            other
        ))),
    }
}

fn ensure_valid(config: &GenpoolConfig) -> Result<(), ApiError> {
    config.validate().map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        ApiError::ConfigError(format!(
            "Configuration validation failed:\n{}",
            messages.join("\n")
        ))
    })
}
