//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only keys whose serde defaults are not enough are set here; everything else
/// falls back to the struct defaults at deserialization time.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("executor.max_concurrent_generations", 3)?
        .set_default("executor.default_max_retries", 2)?
        .set_default("backend.kind", "simulated")?
        .set_default("cache.enabled", true)
}

/// Environment source: `GENPOOL__EXECUTOR__MAX_CONCURRENT_GENERATIONS=8`.
pub fn environment() -> config::Environment {
    config::Environment::with_prefix("GENPOOL")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
