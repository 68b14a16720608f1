//! Versioned snapshot of navigation history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TransitionRecord;
use crate::error::{HistoryError, HistoryResult};

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted form of the history state.
///
/// Forget-on-end anchors are not persisted; they only refer to flows in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version.
    pub version: u32,
    /// Captured state of flows that have ended, by flow instance id.
    #[serde(default)]
    pub flow_scope_map: BTreeMap<String, String>,
    /// Committed history, oldest first.
    #[serde(default)]
    pub history: Vec<TransitionRecord>,
    /// Pending transition not yet committed.
    #[serde(default)]
    pub current_transition: Option<TransitionRecord>,
}

impl Snapshot {
    /// Encode to the snapshot string.
    pub fn encode(&self) -> HistoryResult<String> {
        serde_json::to_string(self).map_err(|e| HistoryError::Encode {
            message: e.to_string(),
        })
    }

    /// Decode a snapshot string.
    ///
    /// The version is checked before the body is parsed so that a newer
    /// snapshot is reported as such rather than as malformed.
    pub fn decode(raw: &str) -> HistoryResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| HistoryError::MalformedSnapshot {
                message: e.to_string(),
            })?;

        let version = value
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| HistoryError::MalformedSnapshot {
                message: "missing snapshot version".to_string(),
            })?;

        if version != u64::from(SNAPSHOT_VERSION) {
            return Err(HistoryError::UnsupportedSnapshotVersion {
                found: version,
                expected: SNAPSHOT_VERSION,
            });
        }

        serde_json::from_value(value).map_err(|e| HistoryError::MalformedSnapshot {
            message: e.to_string(),
        })
    }
}
