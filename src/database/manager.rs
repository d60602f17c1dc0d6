use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Builds and prepares the SQLite connection pool.
pub struct DatabaseManager;

impl DatabaseManager {
    /// Opens a pool for `config.url`.
    ///
    /// In-memory databases are private to one connection, so their pool is
    /// pinned to a single connection that is never recycled.
    pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
        if !config.url.starts_with("sqlite:") {
            return Err(DatabaseError::InvalidDatabaseUrl(config.url.clone()));
        }
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|_| DatabaseError::InvalidDatabaseUrl(config.url.clone()))?
            .foreign_keys(true);

        let pool = if Self::is_memory(&config.url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                .connect_with(
                    options
                        .create_if_missing(true)
                        .journal_mode(SqliteJournalMode::Wal),
                )
                .await?
        };

        info!("Created database pool for: {}", config.url);
        Ok(pool)
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    fn is_memory(url: &str) -> bool {
        url.contains(":memory:") || url.contains("mode=memory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
            seed_on_startup: false,
        }
    }

    #[test]
    fn detects_memory_urls() {
        assert!(DatabaseManager::is_memory("sqlite::memory:"));
        assert!(DatabaseManager::is_memory("sqlite://file:test?mode=memory&cache=shared"));
        assert!(!DatabaseManager::is_memory("sqlite://layered_api.db?mode=rwc"));
    }

    #[tokio::test]
    async fn connects_migrates_and_pings() -> anyhow::Result<()> {
        let pool = DatabaseManager::connect(&memory_config()).await?;
        DatabaseManager::migrate(&pool).await?;
        DatabaseManager::health_check(&pool).await?;

        let (fk,): (i64,) = sqlx::query_as("PRAGMA foreign_keys").fetch_one(&pool).await?;
        assert_eq!(fk, 1);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_malformed_urls() {
        let mut config = memory_config();
        config.url = "postgres://nope".to_string();
        assert!(matches!(
            DatabaseManager::connect(&config).await,
            Err(DatabaseError::InvalidDatabaseUrl(_))
        ));
    }
}
