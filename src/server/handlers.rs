//! Method handlers for the history protocol.
//!
//! Each handler parses its params, applies them to the shared state and
//! returns the JSON result body.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::AppState;
use crate::error::{AppResult, ServerError, StorageError};
use crate::history::{FlowEnd, FlowTransition, HistoryEvent};
use crate::storage::{StoredSnapshot, DEFAULT_SNAPSHOT_KEY};

/// Parameters for `history/stop`.
#[derive(Debug, Default, Deserialize)]
pub struct StopParams {
    /// Clear history before stopping.
    #[serde(default)]
    pub clear: bool,
}

/// Parameters for `history/deserialize`.
#[derive(Debug, Deserialize)]
pub struct DeserializeParams {
    /// Snapshot string.
    pub snapshot: String,
}

/// Parameters for `history/save`, `history/restore` and `history/delete`.
#[derive(Debug, Default, Deserialize)]
pub struct SnapshotKeyParams {
    /// Snapshot key; the default key when absent.
    #[serde(default)]
    pub key: Option<String>,
}

impl SnapshotKeyParams {
    fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_SNAPSHOT_KEY)
    }
}

/// Parameters for `event`.
#[derive(Debug, Deserialize)]
pub struct EventParams {
    /// Event name.
    pub name: String,
    /// Event payload.
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Parameters for `model/put` and `model/remove`.
#[derive(Debug, Deserialize)]
pub struct ModelParams {
    /// Model instance id.
    pub id: String,
    /// Serialized model state.
    #[serde(default)]
    pub state: Option<String>,
}

/// Parameters for `model/modal`.
#[derive(Debug, Deserialize)]
pub struct ModalParams {
    /// Whether a modal flow is active.
    pub active: bool,
}

/// Result of `history/state`.
#[derive(Debug, Serialize)]
pub struct HistoryStateResult {
    /// Committed entries.
    pub length: usize,
    /// Whether events are captured.
    pub listening: bool,
    /// Pending transition.
    pub current: Option<FlowTransition>,
    /// Flow instance ids with captured scope.
    pub captured_flows: Vec<String>,
}

/// Dispatch a protocol method.
///
/// Returns `None` when the method is not part of the history protocol.
pub async fn handle_method(
    state: &AppState,
    method: &str,
    params: Option<Value>,
) -> Option<AppResult<Value>> {
    let result = match method {
        "history/start" => handle_start(state).await,
        "history/stop" => handle_stop(state, params).await,
        "history/clear" => handle_clear(state).await,
        "history/pop" => handle_pop(state).await,
        "history/state" => handle_state(state).await,
        "history/serialize" => handle_serialize(state).await,
        "history/deserialize" => handle_deserialize(state, params).await,
        "history/save" => handle_save(state, params).await,
        "history/restore" => handle_restore(state, params).await,
        "history/keys" => handle_keys(state).await,
        "history/delete" => handle_delete(state, params).await,
        "flow/transition" => handle_transition(state, params).await,
        "flow/end" => handle_flow_end(state, params).await,
        "event" => handle_event(state, params).await,
        "model/put" => handle_model_put(state, params),
        "model/remove" => handle_model_remove(state, params),
        "model/modal" => handle_model_modal(state, params),
        _ => return None,
    };
    Some(result)
}

fn parse_params<T: DeserializeOwned>(method: &str, params: Option<Value>) -> AppResult<T> {
    let params = params.unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(params).map_err(|e| {
        ServerError::InvalidParams {
            method: method.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

async fn handle_start(state: &AppState) -> AppResult<Value> {
    state.history.lock().await.start();
    Ok(json!({ "listening": true }))
}

async fn handle_stop(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let params: StopParams = parse_params("history/stop", params)?;
    state.history.lock().await.stop(params.clear);
    Ok(json!({ "listening": false, "cleared": params.clear }))
}

async fn handle_clear(state: &AppState) -> AppResult<Value> {
    state.history.lock().await.clear();
    Ok(json!({ "length": 0 }))
}

async fn handle_pop(state: &AppState) -> AppResult<Value> {
    let mut history = state.history.lock().await;
    let popped = history.pop();
    Ok(json!({ "popped": popped, "length": history.len() }))
}

async fn handle_state(state: &AppState) -> AppResult<Value> {
    let history = state.history.lock().await;
    let result = HistoryStateResult {
        length: history.len(),
        listening: history.is_listening(),
        current: history.current_transition().cloned(),
        captured_flows: history.flow_scope_map().keys().cloned().collect(),
    };
    Ok(serde_json::to_value(result).map_err(ServerError::from)?)
}

async fn handle_serialize(state: &AppState) -> AppResult<Value> {
    let snapshot = state.history.lock().await.serialize()?;
    Ok(json!({ "snapshot": snapshot }))
}

async fn handle_deserialize(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let params: DeserializeParams = parse_params("history/deserialize", params)?;
    let mut history = state.history.lock().await;
    history.deserialize(&params.snapshot)?;
    Ok(json!({ "length": history.len() }))
}

async fn handle_save(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let params: SnapshotKeyParams = parse_params("history/save", params)?;
    let snapshot = state.history.lock().await.serialize()?;

    let stored = StoredSnapshot::new(params.key(), snapshot);
    state.store.save(&stored).await?;

    info!(key = %stored.key, "History snapshot saved");
    Ok(json!({ "key": stored.key, "saved_at": stored.saved_at }))
}

async fn handle_restore(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let params: SnapshotKeyParams = parse_params("history/restore", params)?;
    let stored = state
        .store
        .load(params.key())
        .await?
        .ok_or_else(|| StorageError::SnapshotNotFound {
            key: params.key().to_string(),
        })?;

    let mut history = state.history.lock().await;
    history.deserialize(&stored.snapshot)?;

    info!(key = %stored.key, entries = history.len(), "History snapshot restored");
    Ok(json!({ "key": stored.key, "saved_at": stored.saved_at, "length": history.len() }))
}

async fn handle_keys(state: &AppState) -> AppResult<Value> {
    let keys = state.store.keys().await?;
    Ok(json!({ "keys": keys }))
}

async fn handle_delete(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let params: SnapshotKeyParams = parse_params("history/delete", params)?;
    state.store.delete(params.key()).await?;

    info!(key = %params.key(), "History snapshot deleted");
    Ok(json!({ "key": params.key(), "deleted": true }))
}

async fn handle_transition(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let transition: FlowTransition = parse_params("flow/transition", params)?;
    let mut history = state.history.lock().await;
    history.handle(HistoryEvent::Transition(transition));
    Ok(json!({ "length": history.len() }))
}

async fn handle_flow_end(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let end: FlowEnd = parse_params("flow/end", params)?;
    let mut history = state.history.lock().await;
    history.handle(HistoryEvent::FlowEnd(end));
    Ok(json!({ "length": history.len() }))
}

async fn handle_event(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let params: EventParams = parse_params("event", params)?;
    debug!(name = %params.name, "Received named event");

    let mut history = state.history.lock().await;
    let request = history.handle(HistoryEvent::Named {
        name: params.name,
        options: params.options,
    });
    Ok(json!({ "navigated": request.is_some(), "length": history.len() }))
}

fn handle_model_put(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let params: ModelParams = parse_params("model/put", params)?;
    let Some(model_state) = params.state else {
        return Err(ServerError::InvalidParams {
            method: "model/put".to_string(),
            message: "missing field `state`".to_string(),
        }
        .into());
    };
    state.scope.put(params.id, model_state);
    Ok(json!({ "live": state.scope.len() }))
}

fn handle_model_remove(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let params: ModelParams = parse_params("model/remove", params)?;
    let removed = state.scope.remove(&params.id);
    Ok(json!({ "removed": removed, "live": state.scope.len() }))
}

fn handle_model_modal(state: &AppState, params: Option<Value>) -> AppResult<Value> {
    let params: ModalParams = parse_params("model/modal", params)?;
    state.scope.set_modal(params.active);
    Ok(json!({ "modal": params.active }))
}
