//! Layered configuration loading: defaults, workspace files, environment.

use crate::integration::test_utils::env_lock;
use genpool::config::{BackendKind, ConfigLoader, GenpoolConfig, ValidationError};
use genpool::{ApiError, GenerationExecutor};
use std::fs;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

/// Restores (or removes) an environment variable when dropped.
struct EnvGuard {
    key: &'static str,
    previous: Option<String>,
}

impl EnvGuard {
    fn set(key: &'static str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value);
        Self { key, previous }
    }

    fn unset(key: &'static str) -> Self {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        Self { key, previous }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(value) => std::env::set_var(self.key, value),
            None => std::env::remove_var(self.key),
        }
    }
}

/// Point the global config lookup at an empty directory.
fn isolated_home() -> (TempDir, EnvGuard) {
    let home = TempDir::new().unwrap();
    let guard = EnvGuard::set("XDG_CONFIG_HOME", home.path());
    (home, guard)
}

fn write_workspace_file(root: &Path, name: &str, contents: &str) {
    let dir = root.join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn defaults_match_struct_defaults() {
    let config = ConfigLoader::defaults().unwrap();
    assert_eq!(config, GenpoolConfig::default());
}

#[test]
fn empty_workspace_loads_defaults() {
    let _lock = env_lock().lock();
    let (_home, _xdg) = isolated_home();
    let _env = EnvGuard::unset("GENPOOL_ENV");
    let workspace = TempDir::new().unwrap();

    let config = ConfigLoader::load(workspace.path()).unwrap();
    assert_eq!(config.executor.max_concurrent_generations, 3);
    assert_eq!(config.backend.kind, BackendKind::Simulated);
    assert!(config.cache.enabled);
}

#[test]
fn workspace_file_overrides_defaults() {
    let _lock = env_lock().lock();
    let (_home, _xdg) = isolated_home();
    let _env = EnvGuard::unset("GENPOOL_ENV");
    let workspace = TempDir::new().unwrap();
    write_workspace_file(
        workspace.path(),
        "config.toml",
        r#"
[executor]
max_concurrent_generations = 5
retry_base_delay_ms = 10

[cache]
max_entries = 100

[backend.simulation]
base_latency_ms = 0
success_probability = 1.0
"#,
    );

    let config = ConfigLoader::load(workspace.path()).unwrap();
    assert_eq!(config.executor.max_concurrent_generations, 5);
    assert_eq!(config.executor.retry_base_delay_ms, 10);
    assert_eq!(config.executor.default_max_retries, 2);
    assert_eq!(config.cache.max_entries, Some(100));
    assert_eq!(config.backend.simulation.base_latency_ms, 0);
    assert_eq!(config.backend.simulation.success_probability, 1.0);
    assert_eq!(config.backend.simulation.min_quality, 0.7);
    assert!(config.validate().is_ok());
}

#[test]
fn environment_specific_file_layers_on_base_file() {
    let _lock = env_lock().lock();
    let (_home, _xdg) = isolated_home();
    let _env = EnvGuard::set("GENPOOL_ENV", "staging");
    let workspace = TempDir::new().unwrap();
    write_workspace_file(
        workspace.path(),
        "config.toml",
        "[executor]\nmax_concurrent_generations = 5\ndefault_max_retries = 4\n",
    );
    write_workspace_file(
        workspace.path(),
        "staging.toml",
        "[executor]\nmax_concurrent_generations = 9\n",
    );

    let config = ConfigLoader::load(workspace.path()).unwrap();
    assert_eq!(config.executor.max_concurrent_generations, 9);
    assert_eq!(config.executor.default_max_retries, 4);
}

#[test]
fn environment_variables_win_over_files() {
    let _lock = env_lock().lock();
    let (_home, _xdg) = isolated_home();
    let _env = EnvGuard::unset("GENPOOL_ENV");
    let _concurrency = EnvGuard::set("GENPOOL__EXECUTOR__MAX_CONCURRENT_GENERATIONS", "7");
    let workspace = TempDir::new().unwrap();
    write_workspace_file(
        workspace.path(),
        "config.toml",
        "[executor]\nmax_concurrent_generations = 5\n",
    );

    let config = ConfigLoader::load(workspace.path()).unwrap();
    assert_eq!(config.executor.max_concurrent_generations, 7);
}

#[test]
fn global_file_sits_below_workspace_file() {
    let _lock = env_lock().lock();
    let (home, _xdg) = isolated_home();
    let _env = EnvGuard::unset("GENPOOL_ENV");
    let global_dir = home.path().join("genpool");
    fs::create_dir_all(&global_dir).unwrap();
    fs::write(
        global_dir.join("config.toml"),
        "[executor]\nmax_concurrent_generations = 6\ndefault_max_retries = 1\n",
    )
    .unwrap();

    let workspace = TempDir::new().unwrap();
    write_workspace_file(
        workspace.path(),
        "config.toml",
        "[executor]\nmax_concurrent_generations = 4\n",
    );

    let config = ConfigLoader::load(workspace.path()).unwrap();
    assert_eq!(config.executor.max_concurrent_generations, 4);
    assert_eq!(config.executor.default_max_retries, 1);
}

#[test]
fn explicit_file_loads_and_missing_file_errors() {
    let _lock = env_lock().lock();
    let mut file: NamedTempFile = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    std::io::Write::write_all(
        &mut file,
        b"[backend]\nkind = \"remote\"\nendpoint = \"http://localhost:8080\"\nfallback_to_simulator = true\n",
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(file.path()).unwrap();
    assert_eq!(config.backend.kind, BackendKind::Remote);
    assert_eq!(config.backend.endpoint.as_deref(), Some("http://localhost:8080"));
    assert!(config.backend.fallback_to_simulator);

    let missing = file.path().with_file_name("does-not-exist.toml");
    assert!(matches!(
        ConfigLoader::load_from_file(&missing),
        Err(ApiError::ConfigError(_))
    ));
}

#[test]
fn invalid_values_are_all_reported() {
    let mut config = GenpoolConfig::default();
    config.executor.max_concurrent_generations = 0;
    config.cache.max_entries = Some(0);
    config.backend.kind = BackendKind::Remote;

    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], ValidationError::Executor(_)));
    assert!(matches!(errors[1], ValidationError::Backend(_)));
    assert!(matches!(errors[2], ValidationError::Cache(_)));
    assert!(errors[0].to_string().starts_with("Executor: "));

    assert!(matches!(
        GenerationExecutor::from_config(&config),
        Err(ApiError::ConfigError(_))
    ));
}
