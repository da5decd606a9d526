//! Database connection management

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use courier_config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::fs;
use tracing::info;

/// Prepare and establish a database connection pool.
///
/// Foreign keys, WAL and the busy timeout are connection-level settings in
/// SQLite, so they are applied through the connect options of every pooled
/// connection rather than issued once against the pool.
pub async fn prepare_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    ensure_sqlite_path(&config.url).await?;

    let in_memory = config.url.contains(":memory:");

    let mut options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("invalid database url {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    // Every in-memory connection is a separate database.
    let max_connections = if in_memory { 1 } else { config.max_connections.max(1) };

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if in_memory {
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to database {}", config.url))?;

    info!(url = %config.url, max_connections, "database connection established");
    Ok(pool)
}

/// Ensure the directory holding the SQLite database file exists
async fn ensure_sqlite_path(url: &str) -> Result<()> {
    let Some(sqlite_path) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };

    if sqlite_path.starts_with(":memory:") {
        return Ok(());
    }

    let sqlite_path = sqlite_path.split('?').next().unwrap_or(sqlite_path);
    let path = Path::new(sqlite_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create sqlite directory {}", parent.display())
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_connection_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested/dir/test.db");

        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 2,
            ..DatabaseConfig::default()
        };

        let pool = prepare_database(&config).await.unwrap();
        let (one,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(one, 1);
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let config = DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 8,
            ..DatabaseConfig::default()
        };

        let pool = prepare_database(&config).await.unwrap();
        assert_eq!(pool.options().get_max_connections(), 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled_on_every_connection() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("fk.db").display()),
            max_connections: 3,
            ..DatabaseConfig::default()
        };

        let pool = prepare_database(&config).await.unwrap();
        let mut held = Vec::new();
        for _ in 0..3 {
            let mut conn = pool.acquire().await.unwrap();
            let (enabled,): (bool,) = sqlx::query_as("PRAGMA foreign_keys")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
            assert!(enabled);
            held.push(conn);
        }
    }
}
