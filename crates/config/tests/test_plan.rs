//! Test plan for the `courier-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use courier_config::{load, AppConfig, DatabaseConfig, LoggingConfig, SortOrder};

const ENV_VARS_TO_RESET: &[&str] = &[
    "COURIER_CONFIG",
    "COURIER__DATABASE__URL",
    "COURIER__DATABASE__MAX_CONNECTIONS",
    "COURIER__DATABASE__BUSY_TIMEOUT_MS",
    "COURIER__STORE__DEFAULT_SORT",
    "COURIER__LOGGING__FILTER",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(
        config.database.busy_timeout_ms,
        defaults.database.busy_timeout_ms
    );
    assert_eq!(config.store.default_sort, SortOrder::Desc);
    assert_eq!(config.logging.filter, "info");
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [database]
        max_connections = 4
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/courier.toml",
        r#"
        [database]
        max_connections = 9
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.database.max_connections, 4);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [store]
        default_sort = "asc"

        [database]
        max_connections = 50
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.store.default_sort, SortOrder::Asc);
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.logging.filter, defaults.logging.filter);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [database]
        busy_timeout_ms = 250
        "#,
    );

    ctx.set_var("COURIER__DATABASE__BUSY_TIMEOUT_MS", "9000");
    ctx.set_var("COURIER__LOGGING__FILTER", "courier_database=debug");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.database.busy_timeout_ms, 9000);
    assert_eq!(config.logging.filter, "courier_database=debug");
}

#[test]
#[serial]
fn load_reads_explicit_config_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [database]
        url = "sqlite://elsewhere.db"
        "#,
    );
    let explicit = temp_dir.path().join("elsewhere/custom.toml");
    ctx.set_var("COURIER_CONFIG", explicit.display().to_string());

    let config = load().expect("configuration load should read COURIER_CONFIG");
    assert_eq!(config.database.url, "sqlite://elsewhere.db");
}

#[test]
#[serial]
fn load_raises_zero_connection_pool_to_one() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("COURIER__DATABASE__MAX_CONNECTIONS", "0");

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.database.max_connections, 1);
}

#[test]
#[serial]
fn load_errors_on_unknown_sort_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("COURIER__STORE__DEFAULT_SORT", "sideways");

    let error = load().expect_err("unknown sort order should be rejected");
    assert!(error.to_string().contains("invalid configuration"));
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [database]
        max_connections = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn database_config_defaults_point_at_local_sqlite_file() {
    let defaults = DatabaseConfig::default();
    assert_eq!(defaults.url, "sqlite://courier.db");
    assert_eq!(defaults.max_connections, 10);
    assert_eq!(defaults.busy_timeout_ms, 5_000);
}

#[test]
fn logging_config_defaults_to_info() {
    assert_eq!(LoggingConfig::default().filter, "info");
}

#[test]
fn sort_order_parses_case_insensitively() {
    assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
    assert!("up".parse::<SortOrder>().is_err());
}
