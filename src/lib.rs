//! # View History
//!
//! Back-navigation history for nested, possibly modal, application flows.
//!
//! A flow engine reports every transition between views, actions and
//! subflows, and every flow that ends. The history keeps a bounded stack of
//! navigable entries and, on a back event, rebuilds the chain of jumps that
//! re-enters each ancestor flow with its state, even for flows that have
//! already ended.
//!
//! ## Features
//!
//! - **Remember policy**: per-node `always` / `never` / default history attributes
//! - **Bounded history**: oldest entries are evicted past the configured size
//! - **Forget on end**: modal and never-remembered subflows vanish from history when they finish
//! - **Flow scope capture**: state of ended flows is kept for later rehydration
//! - **Snapshots**: versioned, lossless serialization with SQLite persistence
//!
//! ## Architecture
//!
//! ```text
//! Flow engine → JSON-RPC (stdio) → NavigationHistory → navigate notifications
//!                                        ↓
//!                                  SQLite (snapshots)
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::Map;
//! use view_history::bus::{InMemoryFlowScope, RecordingSink};
//! use view_history::history::{FlowTransition, HistoryConfig, HistoryPolicy, NavigationHistory, StateDef};
//!
//! let scope = Arc::new(InMemoryFlowScope::new());
//! let sink = Arc::new(RecordingSink::new());
//! let mut history = NavigationHistory::new(HistoryConfig::default(), scope, sink.clone());
//! history.start();
//!
//! let view = StateDef::view(HistoryPolicy::Default);
//! history.capture_transition(FlowTransition::new("main", "main-1", "home", view.clone()));
//! history.capture_transition(FlowTransition::new("main", "main-1", "cart", view));
//!
//! let request = history.do_back(Map::new()).unwrap();
//! assert_eq!(request.jump[0].node_name, "home");
//! assert_eq!(sink.requests().len(), 1);
//! ```

#![warn(missing_docs)]

/// Collaborator traits for model lookup and navigation output.
pub mod bus;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Navigation history core.
pub mod history;
/// JSON-RPC server over stdio.
pub mod server;
/// SQLite storage layer for history snapshots.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use history::{HistoryConfig, NavigationHistory};
pub use server::{AppState, HistoryServer, SharedState};
