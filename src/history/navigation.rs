use std::collections::{BTreeMap, HashMap, VecDeque};
use std::iter;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::policy::should_remember;
use super::snapshot::{Snapshot, SNAPSHOT_VERSION};
use super::{
    FlowEnd, FlowId, FlowTransition, HistoryEvent, HistoryPolicy, Jump, JumpOptions,
    NavigateRequest, StateDef, TransitionRecord,
};
use crate::bus::{FlowScope, NavigationSink};
use crate::error::HistoryResult;

/// Maximum number of committed history entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Capacity {
    /// No limit.
    #[default]
    Unbounded,
    /// At most this many entries. Zero disables history entirely.
    Limited(usize),
}

impl Capacity {
    /// Interpret a raw max-size setting.
    ///
    /// An absent setting means unbounded. Anything present is coerced to an
    /// integer by truncation; values that are not numeric or not positive
    /// disable history rather than lifting the limit.
    pub fn from_setting(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Capacity::Unbounded;
        };

        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() && n >= 1.0 => Capacity::Limited(n.trunc() as usize),
            _ => Capacity::Limited(0),
        }
    }

    /// Whether history capture is switched off.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Capacity::Limited(0))
    }

    /// Whether a history of `len` entries has no room for another.
    pub fn is_full(&self, len: usize) -> bool {
        match self {
            Capacity::Unbounded => false,
            Capacity::Limited(max) => len >= *max,
        }
    }
}

/// Construction parameters for [`NavigationHistory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Name of the event that triggers back navigation.
    pub back_event: String,
    /// History size limit.
    pub max_size: Capacity,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            back_event: "back".to_string(),
            max_size: Capacity::Unbounded,
        }
    }
}

/// Bounded stack of navigable transitions with back-path reconstruction.
///
/// Consumes transition and flow-end notifications from the flow engine and,
/// on a back event, pops the most recent entry and publishes a single
/// navigate request that re-enters every ancestor flow of that entry with
/// its state, live or captured when the flow ended.
///
/// All operations are synchronous and expect serialized delivery; a host
/// sharing an instance across tasks must guard the whole instance with one
/// lock.
pub struct NavigationHistory {
    back_event: String,
    capacity: Capacity,
    listening: bool,
    history: VecDeque<TransitionRecord>,
    flow_scope_map: BTreeMap<String, String>,
    forget_when_done: HashMap<FlowId, usize>,
    current_transition: Option<TransitionRecord>,
    scope: Arc<dyn FlowScope>,
    sink: Arc<dyn NavigationSink>,
}

impl NavigationHistory {
    /// Create a history that is not yet listening.
    pub fn new(
        config: HistoryConfig,
        scope: Arc<dyn FlowScope>,
        sink: Arc<dyn NavigationSink>,
    ) -> Self {
        Self {
            back_event: config.back_event,
            capacity: config.max_size,
            listening: false,
            history: VecDeque::new(),
            flow_scope_map: BTreeMap::new(),
            forget_when_done: HashMap::new(),
            current_transition: None,
            scope,
            sink,
        }
    }

    /// Begin capturing events.
    pub fn start(&mut self) {
        self.listening = true;
        debug!("Navigation history listening");
    }

    /// Stop capturing events, optionally clearing first.
    pub fn stop(&mut self, clear_first: bool) {
        if clear_first {
            self.clear();
        }
        self.listening = false;
        debug!(cleared = clear_first, "Navigation history stopped");
    }

    /// Drop history, the pending transition and captured flow state.
    ///
    /// Forget-on-end anchors and the listening flag are left alone.
    pub fn clear(&mut self) {
        self.current_transition = None;
        self.history.clear();
        self.flow_scope_map.clear();
    }

    /// Remove the most recent history entry without navigating.
    pub fn pop(&mut self) -> Option<TransitionRecord> {
        self.history.pop_back()
    }

    /// Route an engine event to the matching capture operation.
    ///
    /// Returns the navigate request when the event triggered back navigation.
    pub fn handle(&mut self, event: HistoryEvent) -> Option<NavigateRequest> {
        match event {
            HistoryEvent::Transition(transition) => {
                self.capture_transition(transition);
                None
            }
            HistoryEvent::FlowEnd(end) => {
                self.capture_flow_end(&end);
                None
            }
            HistoryEvent::Named { name, options } if name == self.back_event => {
                self.do_back(options)
            }
            HistoryEvent::Named { .. } => None,
        }
    }

    /// Record a transition.
    ///
    /// Commits the previously pending transition, then keeps the new one
    /// pending if its node is navigable. Entering a subflow that must not be
    /// remembered anchors the subflow at the current end of history so its
    /// entries can be purged when it ends.
    pub fn capture_transition(&mut self, mut transition: FlowTransition) {
        if !self.listening || self.capacity.is_disabled() {
            return;
        }

        if transition.modal.is_none() {
            transition.modal = Some(self.scope.in_modal());
        }

        if let Some(current) = self.current_transition.take() {
            self.commit(current);
        }

        let forget_anchor = match &transition.state_def {
            StateDef::Flow {
                flow_ref,
                history,
                modal,
            } if *history == HistoryPolicy::Never || *modal => Some(flow_ref.clone()),
            _ => None,
        };

        let remember = should_remember(&transition.state_def);
        debug!(
            flow = %transition.name,
            node = %transition.node_name(),
            kind = transition.state_def.kind(),
            remember,
            "Captured transition"
        );

        if remember {
            self.current_transition = Some(transition);
        }

        if let Some(flow_ref) = forget_anchor {
            let index = self.history.len();
            debug!(flow = %flow_ref, index, "Flow will be forgotten when it ends");
            self.forget_when_done.insert(flow_ref, index);
        }
    }

    /// Record the end of a flow.
    ///
    /// A flow anchored for forgetting has its entries truncated from history.
    /// Any other flow has its live state captured so a later back navigation
    /// can rehydrate it.
    pub fn capture_flow_end(&mut self, end: &FlowEnd) {
        if !self.listening {
            return;
        }

        if let Some(index) = self.forget_when_done.remove(&end.name) {
            let owned = self
                .history
                .get(index)
                .is_some_and(|record| record.name == end.name);
            if owned {
                let dropped = self.history.len() - index;
                self.history.truncate(index);
                debug!(flow = %end.name, index, dropped, "Forgot finished flow");
            }
            if self
                .current_transition
                .as_ref()
                .is_some_and(|current| current.name == end.name)
            {
                self.current_transition = None;
            }
            return;
        }

        match self.scope.serialized_state(&end.id) {
            Some(state) => {
                debug!(flow = %end.name, flow_id = %end.id, "Captured flow scope");
                self.flow_scope_map.insert(end.id.clone(), state);
            }
            None => {
                warn!(
                    flow = %end.name,
                    flow_id = %end.id,
                    "No live flow scope found for ended flow"
                );
            }
        }
    }

    /// Navigate back to the most recent history entry.
    ///
    /// Discards the pending transition, pops the last entry and publishes one
    /// navigate request holding a jump per ancestor flow followed by the
    /// entry itself. Returns `None` on an empty history.
    ///
    /// A caller option named `jump` is replaced by the reconstructed jumps.
    pub fn do_back(&mut self, mut options: Map<String, Value>) -> Option<NavigateRequest> {
        if !self.listening || self.history.is_empty() {
            return None;
        }

        self.current_transition = None;
        let record = self.history.pop_back()?;

        let jump: Vec<Jump> = record
            .path()
            .iter()
            .map(|step| {
                Jump::new(
                    step.node_name.clone(),
                    self.input_state(&step.target_id),
                    JumpOptions {
                        modal: step.modal,
                        force_flow_id: Some(step.target_id.clone()),
                    },
                )
            })
            .chain(iter::once(Jump::new(
                record.node_name(),
                self.input_state(&record.id),
                JumpOptions {
                    modal: record.is_modal(),
                    force_flow_id: Some(record.id.clone()),
                },
            )))
            .collect();

        info!(
            flow = %record.name,
            node = %record.node_name(),
            jumps = jump.len(),
            remaining = self.history.len(),
            "Navigating back"
        );

        if options.remove("jump").is_some() {
            warn!("Back event option `jump` overridden by reconstructed jumps");
        }
        let request = NavigateRequest { options, jump };
        self.sink.navigate(request.clone());
        Some(request)
    }

    /// Encode history, pending transition and captured flow state.
    pub fn serialize(&self) -> HistoryResult<String> {
        Snapshot {
            version: SNAPSHOT_VERSION,
            flow_scope_map: self.flow_scope_map.clone(),
            history: self.history.iter().cloned().collect(),
            current_transition: self.current_transition.clone(),
        }
        .encode()
    }

    /// Restore state produced by [`serialize`](Self::serialize).
    ///
    /// State is untouched when decoding fails. A restored history longer than
    /// the configured limit keeps only its most recent entries. Forget-on-end
    /// anchors index the replaced history, so they are dropped.
    pub fn deserialize(&mut self, raw: &str) -> HistoryResult<()> {
        let snapshot = Snapshot::decode(raw)?;

        let mut history: VecDeque<TransitionRecord> = snapshot.history.into();
        if let Capacity::Limited(max) = self.capacity {
            if max > 0 && history.len() > max {
                warn!(
                    restored = history.len(),
                    max, "Restored history exceeds limit, dropping oldest entries"
                );
                let excess = history.len() - max;
                history.drain(..excess);
            }
        }

        self.history = history;
        self.flow_scope_map = snapshot.flow_scope_map;
        self.current_transition = snapshot.current_transition;
        if !self.forget_when_done.is_empty() {
            debug!(
                anchors = self.forget_when_done.len(),
                "Dropping forget anchors of replaced history"
            );
            self.forget_when_done.clear();
        }
        info!(entries = self.history.len(), "Navigation history restored");
        Ok(())
    }

    /// Whether events are being captured.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Configured size limit.
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Name of the back event.
    pub fn back_event(&self) -> &str {
        &self.back_event
    }

    /// Committed entries, oldest first.
    pub fn history(&self) -> &VecDeque<TransitionRecord> {
        &self.history
    }

    /// Number of committed entries.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether no entry is committed.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Pending transition, if any.
    pub fn current_transition(&self) -> Option<&TransitionRecord> {
        self.current_transition.as_ref()
    }

    /// Captured state of ended flows.
    pub fn flow_scope_map(&self) -> &BTreeMap<String, String> {
        &self.flow_scope_map
    }

    /// Forget-on-end anchors by flow.
    pub fn forget_when_done(&self) -> &HashMap<FlowId, usize> {
        &self.forget_when_done
    }

    fn commit(&mut self, record: TransitionRecord) {
        if self.capacity.is_full(self.history.len()) {
            self.evict_oldest();
        }
        self.history.push_back(record);
    }

    fn evict_oldest(&mut self) {
        self.history.pop_front();
        // Anchors shift with the history; one that reaches the head can no
        // longer be resolved.
        self.forget_when_done.retain(|flow, index| {
            if *index <= 1 {
                debug!(flow = %flow, "Forget anchor evicted");
                false
            } else {
                *index -= 1;
                true
            }
        });
    }

    fn input_state(&self, id: &str) -> Option<String> {
        self.scope
            .serialized_state(id)
            .or_else(|| self.flow_scope_map.get(id).cloned())
    }
}
