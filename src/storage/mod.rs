//! Storage layer for navigation history snapshots.
//!
//! The history itself only produces and consumes snapshot strings. This
//! module keeps those strings across process restarts, keyed by a caller
//! chosen name.

mod sqlite;

pub use sqlite::SqliteSnapshotStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// Key used when the caller does not name a snapshot.
pub const DEFAULT_SNAPSHOT_KEY: &str = "default";

/// A persisted history snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    /// Snapshot key.
    pub key: String,
    /// Snapshot string as produced by `NavigationHistory::serialize`.
    pub snapshot: String,
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
}

impl StoredSnapshot {
    /// Create a snapshot record stamped with the current time.
    pub fn new(key: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            snapshot: snapshot.into(),
            saved_at: Utc::now(),
        }
    }
}

/// Persistence for history snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Write a snapshot, replacing any previous one under the same key.
    async fn save(&self, snapshot: &StoredSnapshot) -> StorageResult<()>;
    /// Read the snapshot stored under `key`.
    async fn load(&self, key: &str) -> StorageResult<Option<StoredSnapshot>>;
    /// Remove the snapshot stored under `key`.
    async fn delete(&self, key: &str) -> StorageResult<()>;
    /// Keys of all stored snapshots, most recently saved first.
    async fn keys(&self) -> StorageResult<Vec<String>>;
}
