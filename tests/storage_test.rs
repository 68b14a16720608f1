//! Integration tests for the SQLite snapshot store
//!
//! Exercises the file-backed store in a temporary directory so persistence
//! across connections can be observed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::Map;
use tempfile::TempDir;

use view_history::bus::{InMemoryFlowScope, RecordingSink};
use view_history::config::DatabaseConfig;
use view_history::error::StorageError;
use view_history::history::{
    FlowTransition, HistoryConfig, HistoryPolicy, NavigationHistory, StateDef,
};
use view_history::storage::{
    SnapshotStore, SqliteSnapshotStore, StoredSnapshot, DEFAULT_SNAPSHOT_KEY,
};

fn database_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        path: dir.path().join("nested").join("history.db"),
        max_connections: 2,
    }
}

async fn open_store(dir: &TempDir) -> SqliteSnapshotStore {
    SqliteSnapshotStore::new(&database_config(dir))
        .await
        .expect("Failed to open snapshot store")
}

fn started_history() -> (NavigationHistory, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let mut history = NavigationHistory::new(
        HistoryConfig::default(),
        Arc::new(InMemoryFlowScope::new()),
        sink.clone(),
    );
    history.start();
    (history, sink)
}

#[cfg(test)]
mod persistence_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let config = database_config(&dir);
        assert!(!config.path.exists());

        let _store = open_store(&dir).await;

        assert!(config.path.exists(), "Database file should be created");
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir).await;
            store
                .save(&StoredSnapshot::new(DEFAULT_SNAPSHOT_KEY, "payload"))
                .await
                .unwrap();
        }

        let store = open_store(&dir).await;
        let loaded = store.load(DEFAULT_SNAPSHOT_KEY).await.unwrap().unwrap();
        assert_eq!(loaded.snapshot, "payload");
    }

    #[tokio::test]
    async fn test_saved_at_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let snapshot = StoredSnapshot::new("k", "s");
        store.save(&snapshot).await.unwrap();

        let loaded = store.load("k").await.unwrap().unwrap();
        assert_eq!(loaded.saved_at, snapshot.saved_at);
    }

    #[tokio::test]
    async fn test_history_restored_from_store() {
        let dir = TempDir::new().unwrap();
        let view = StateDef::view(HistoryPolicy::Default);

        let (mut history, _sink) = started_history();
        history.capture_transition(FlowTransition::new("main", "m1", "home", view.clone()));
        history.capture_transition(FlowTransition::new("main", "m1", "cart", view));
        {
            let store = open_store(&dir).await;
            let snapshot = history.serialize().unwrap();
            store
                .save(&StoredSnapshot::new(DEFAULT_SNAPSHOT_KEY, snapshot))
                .await
                .unwrap();
        }

        let store = open_store(&dir).await;
        let stored = store.load(DEFAULT_SNAPSHOT_KEY).await.unwrap().unwrap();
        let (mut restored, sink) = started_history();
        restored.deserialize(&stored.snapshot).unwrap();

        assert_eq!(restored.len(), 1);
        let request = restored.do_back(Map::new()).unwrap();
        assert_eq!(request.jump[0].node_name, "home");
        assert_eq!(sink.requests().len(), 1);
    }
}

#[cfg(test)]
mod key_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_keys_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let now = Utc::now();

        for (key, age) in [("old", 3), ("newest", 0), ("middle", 1)] {
            let mut snapshot = StoredSnapshot::new(key, "s");
            snapshot.saved_at = now - Duration::minutes(age);
            store.save(&snapshot).await.unwrap();
        }

        assert_eq!(
            store.keys().await.unwrap(),
            vec!["newest".to_string(), "middle".to_string(), "old".to_string()]
        );
    }

    #[tokio::test]
    async fn test_keys_empty() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let err = store.delete("missing").await.unwrap_err();
        match err {
            StorageError::SnapshotNotFound { key } => assert_eq!(key, "missing"),
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_leaves_other_keys() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        store.save(&StoredSnapshot::new("a", "1")).await.unwrap();
        store.save(&StoredSnapshot::new("b", "2")).await.unwrap();

        store.delete("a").await.unwrap();

        assert!(store.load("a").await.unwrap().is_none());
        assert_eq!(store.load("b").await.unwrap().unwrap().snapshot, "2");
    }
}
