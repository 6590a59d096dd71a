//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::ConfigError(_) => format!("{}\nRun `genpool config validate` for details.", e),
        ApiError::InvalidTask(_) | ApiError::DuplicateTask(_) => {
            format!("{}\nFix the tasks file and retry.", e)
        }
        _ => e.to_string(),
    }
}
