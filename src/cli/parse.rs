//! CLI parse: clap types for genpool. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// genpool CLI - bounded-concurrency generation executor
#[derive(Parser, Debug)]
#[command(name = "genpool")]
#[command(about = "Run batches of generation tasks under a concurrency limit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (holds config/)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one batch of tasks and print results with analysis
    Run {
        /// JSON array of tasks
        #[arg(long)]
        tasks: PathBuf,

        /// JSON object with character and page labels
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Override the concurrency limit
        #[arg(long)]
        concurrency: Option<usize>,

        /// Force the simulated backend
        #[arg(long)]
        simulate: bool,

        /// Seed for simulation and injected validation failures
        #[arg(long)]
        seed: Option<u64>,

        /// Disable the result cache
        #[arg(long)]
        no_cache: bool,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the dispatch order and cache keys without generating
    Plan {
        /// JSON array of tasks
        #[arg(long)]
        tasks: PathBuf,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Validate the effective configuration
    Validate,
}
