use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::{SnapshotStore, StoredSnapshot};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed snapshot store
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    /// Open (and create if needed) the snapshot database
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Open a private in-memory database
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        // Every connection to :memory: is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn save(&self, snapshot: &StoredSnapshot) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO history_snapshots (key, snapshot, saved_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                snapshot = excluded.snapshot,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(&snapshot.key)
        .bind(&snapshot.snapshot)
        .bind(snapshot.saved_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(key = %snapshot.key, bytes = snapshot.snapshot.len(), "Snapshot saved");
        Ok(())
    }

    async fn load(&self, key: &str) -> StorageResult<Option<StoredSnapshot>> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT key, snapshot, saved_at
            FROM history_snapshots
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM history_snapshots WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::SnapshotNotFound {
                key: key.to_string(),
            });
        }

        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let keys: Vec<(String,)> =
            sqlx::query_as("SELECT key FROM history_snapshots ORDER BY saved_at DESC, key")
                .fetch_all(&self.pool)
                .await?;

        Ok(keys.into_iter().map(|(key,)| key).collect())
    }
}

// Internal row type for SQLx mapping
#[derive(sqlx::FromRow)]
struct SnapshotRow {
    key: String,
    snapshot: String,
    saved_at: String,
}

impl From<SnapshotRow> for StoredSnapshot {
    fn from(row: SnapshotRow) -> Self {
        let saved_at = parse_saved_at(&row.key, &row.saved_at);
        Self {
            key: row.key,
            snapshot: row.snapshot,
            saved_at,
        }
    }
}

/// Parse a stored timestamp, substituting the current time for corrupt values.
fn parse_saved_at(key: &str, raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            warn!(key = %key, saved_at = %raw, error = %e, "Unparseable snapshot timestamp");
            Utc::now()
        }
    }
}
