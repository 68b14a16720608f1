//! Server module for driving navigation history over stdio.
//!
//! This module provides:
//! - JSON-RPC 2.0 line protocol over stdin/stdout
//! - Method handlers feeding flow engine events into the history
//! - Shared application state management

mod handlers;
mod rpc;

pub use handlers::*;
pub use rpc::*;

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::bus::{ChannelSink, InMemoryFlowScope};
use crate::config::Config;
use crate::history::{NavigateRequest, NavigationHistory};
use crate::storage::SnapshotStore;

/// Application state shared across handlers.
///
/// The history sits behind a single lock so that events are applied one at
/// a time, in arrival order.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The navigation history.
    pub history: Mutex<NavigationHistory>,
    /// Live model registry consulted by the history.
    pub scope: Arc<InMemoryFlowScope>,
    /// Snapshot persistence.
    pub store: Arc<dyn SnapshotStore>,
}

impl AppState {
    /// Create application state and the receiving end of the navigate channel.
    pub fn new(
        config: Config,
        store: Arc<dyn SnapshotStore>,
    ) -> (Self, mpsc::UnboundedReceiver<NavigateRequest>) {
        let scope = Arc::new(InMemoryFlowScope::new());
        let (sink, navigations) = ChannelSink::channel();

        let mut history =
            NavigationHistory::new(config.history.clone(), scope.clone(), Arc::new(sink));
        if config.autostart {
            history.start();
        }

        tracing::info!(
            back_event = %config.history.back_event,
            max_size = ?config.history.max_size,
            autostart = config.autostart,
            "AppState initializing navigation history"
        );

        let state = Self {
            config,
            history: Mutex::new(history),
            scope,
            store,
        };
        (state, navigations)
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Capacity;
    use crate::storage::SqliteSnapshotStore;

    async fn create_test_state(autostart: bool) -> AppState {
        let store = SqliteSnapshotStore::new_in_memory().await.unwrap();
        let mut config = Config::default();
        config.autostart = autostart;
        config.history.max_size = Capacity::Limited(4);
        let (state, _rx) = AppState::new(config, Arc::new(store));
        state
    }

    #[tokio::test]
    async fn test_app_state_autostart() {
        let state = create_test_state(true).await;
        assert!(state.history.lock().await.is_listening());
    }

    #[tokio::test]
    async fn test_app_state_without_autostart() {
        let state = create_test_state(false).await;
        let history = state.history.lock().await;
        assert!(!history.is_listening());
        assert_eq!(history.capacity(), Capacity::Limited(4));
    }
}
