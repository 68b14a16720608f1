//! Collaborators of the navigation history.
//!
//! The history never reaches for a global event bus. It is handed a
//! [`FlowScope`] to look up live flow state and a [`NavigationSink`] to
//! publish navigate requests, so hosts and tests can inject their own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use tokio::sync::mpsc;
use tracing::warn;

use crate::history::NavigateRequest;

/// Lookup of live flow and view models.
#[cfg_attr(test, mockall::automock)]
pub trait FlowScope: Send + Sync {
    /// Serialized state of a live flow or view instance, or `None` once it is out of scope.
    fn serialized_state(&self, id: &str) -> Option<String>;

    /// Whether the flow engine is currently inside a modal flow.
    fn in_modal(&self) -> bool {
        false
    }
}

/// Receiver of navigate requests.
#[cfg_attr(test, mockall::automock)]
pub trait NavigationSink: Send + Sync {
    /// Publish a navigate request to the flow engine.
    fn navigate(&self, request: NavigateRequest);
}

/// In-memory model registry.
///
/// Thread-safe storage of live model states keyed by instance id, plus the
/// ambient modal flag.
#[derive(Debug, Default)]
pub struct InMemoryFlowScope {
    models: RwLock<HashMap<String, String>>,
    modal: AtomicBool,
}

impl InMemoryFlowScope {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the serialized state of a live instance.
    pub fn put(&self, id: impl Into<String>, state: impl Into<String>) {
        self.models
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.into(), state.into());
    }

    /// Drop an instance that went out of scope. Returns whether it was live.
    pub fn remove(&self, id: &str) -> bool {
        self.models
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .is_some()
    }

    /// Set the ambient modal flag.
    pub fn set_modal(&self, modal: bool) {
        self.modal.store(modal, Ordering::SeqCst);
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.models.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no instance is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FlowScope for InMemoryFlowScope {
    fn serialized_state(&self, id: &str) -> Option<String> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    fn in_modal(&self) -> bool {
        self.modal.load(Ordering::SeqCst)
    }
}

/// Sink that forwards requests over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<NavigateRequest>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NavigateRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NavigationSink for ChannelSink {
    fn navigate(&self, request: NavigateRequest) {
        if self.tx.send(request).is_err() {
            warn!("Navigate request dropped, receiver closed");
        }
    }
}

/// Sink that keeps every request in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    requests: Mutex<Vec<NavigateRequest>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<NavigateRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Remove and return the requests received so far.
    pub fn take(&self) -> Vec<NavigateRequest> {
        std::mem::take(&mut *self.requests.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl NavigationSink for RecordingSink {
    fn navigate(&self, request: NavigateRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
    }
}
