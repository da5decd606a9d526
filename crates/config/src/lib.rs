use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "courier.toml",
    "config/courier.toml",
    "crates/config/courier.toml",
    "../courier.toml",
    "../config/courier.toml",
    "../crates/config/courier.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde(default = "DatabaseConfig::default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    const fn default_busy_timeout() -> u64 {
        5_000
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://courier.db".to_string(),
            max_connections: 10,
            busy_timeout_ms: Self::default_busy_timeout(),
        }
    }
}

/// Direction in which timestamp-ordered listings are returned.
///
/// ```
/// use courier_config::SortOrder;
///
/// assert_eq!(SortOrder::default(), SortOrder::Desc);
/// assert_eq!(SortOrder::Asc.as_sql(), "ASC");
/// assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(anyhow::anyhow!("unknown sort order `{other}`")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub default_sort: SortOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_filter")]
    pub filter: String,
}

impl LoggingConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use courier_config::load;
///
/// std::env::remove_var("COURIER_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.database.url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let busy_timeout = i64::try_from(defaults.database.busy_timeout_ms).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder()
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default("database.busy_timeout_ms", busy_timeout)?
        .set_default("store.default_sort", defaults.store.default_sort.as_str())?
        .set_default("logging.filter", defaults.logging.filter.clone())?;

    let environment_overrides = config::Environment::with_prefix("COURIER").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("COURIER_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via COURIER_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.database.max_connections == 0 {
        config.database.max_connections = 1;
    }

    debug!(?config, "loaded courier configuration");
    Ok(config)
}
