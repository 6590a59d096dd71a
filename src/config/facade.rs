//! Configuration loading entry points.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::GenpoolConfig;
use crate::error::ApiError;
use config::File;
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the global file, then workspace files, then environment.
    pub fn load(workspace_root: &Path) -> Result<GenpoolConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder.add_source(merge_policy::environment()).build()?;

        let loaded: GenpoolConfig = config.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(loaded)
    }

    /// One explicit file over defaults, then environment.
    pub fn load_from_file(path: &Path) -> Result<GenpoolConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .add_source(merge_policy::environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Defaults only; no files, no environment.
    pub fn defaults() -> Result<GenpoolConfig, ApiError> {
        let config = merge_policy::builder_with_defaults()?.build()?;
        Ok(config.try_deserialize()?)
    }
}
