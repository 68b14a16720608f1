//! Back-navigation history for nested flows.
//!
//! This module provides:
//! - The transition and jump data model exchanged with the flow engine
//! - The remember-state policy deciding which nodes are navigable
//! - [`NavigationHistory`], the bounded history stack and back-path reconstruction
//! - The versioned snapshot format used to persist history between sessions

mod navigation;
mod policy;
mod snapshot;


pub use navigation::*;
pub use policy::should_remember;
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a flow definition.
///
/// Flow-type nodes reference the flow they start by this identifier, and the
/// flow's own transitions and end event carry it as their `name`. Both sides
/// of the forget-on-end bookkeeping key on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(String);

impl FlowId {
    /// Create a flow identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FlowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Per-node history attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Always keep the node in history.
    Always,
    /// Never keep the node in history.
    Never,
    /// No explicit attribute; node type decides.
    #[default]
    Default,
}

impl HistoryPolicy {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPolicy::Always => "always",
            HistoryPolicy::Never => "never",
            HistoryPolicy::Default => "default",
        }
    }
}

impl std::fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HistoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(HistoryPolicy::Always),
            "never" => Ok(HistoryPolicy::Never),
            "default" | "" => Ok(HistoryPolicy::Default),
            _ => Err(format!("Unknown history policy: {}", s)),
        }
    }
}

/// Definition of the node a transition entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateDef {
    /// A rendered view.
    View {
        /// History attribute.
        #[serde(default)]
        history: HistoryPolicy,
    },
    /// A non-visual action node.
    Action {
        /// History attribute.
        #[serde(default)]
        history: HistoryPolicy,
    },
    /// A node that starts a subflow.
    Flow {
        /// The subflow this node starts.
        #[serde(rename = "ref")]
        flow_ref: FlowId,
        /// History attribute.
        #[serde(default)]
        history: HistoryPolicy,
        /// Whether the subflow is presented modally.
        #[serde(default)]
        modal: bool,
    },
    /// An end state of the current flow.
    End,
}

impl StateDef {
    /// A view with the given history policy.
    pub fn view(history: HistoryPolicy) -> Self {
        StateDef::View { history }
    }

    /// An action with the given history policy.
    pub fn action(history: HistoryPolicy) -> Self {
        StateDef::Action { history }
    }

    /// A subflow node.
    pub fn flow(flow_ref: impl Into<FlowId>, history: HistoryPolicy, modal: bool) -> Self {
        StateDef::Flow {
            flow_ref: flow_ref.into(),
            history,
            modal,
        }
    }

    /// The node's history attribute (`Default` for end states).
    pub fn history(&self) -> HistoryPolicy {
        match self {
            StateDef::View { history }
            | StateDef::Action { history }
            | StateDef::Flow { history, .. } => *history,
            StateDef::End => HistoryPolicy::Default,
        }
    }

    /// Node type name.
    pub fn kind(&self) -> &'static str {
        match self {
            StateDef::View { .. } => "view",
            StateDef::Action { .. } => "action",
            StateDef::Flow { .. } => "flow",
            StateDef::End => "end",
        }
    }
}

/// One ancestor flow that must be re-entered to reach a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpStep {
    /// Flow or view instance identifier.
    pub target_id: String,
    /// Node to enter within that flow.
    pub node_name: String,
    /// Whether the flow was presented modally.
    #[serde(default)]
    pub modal: bool,
}

impl JumpStep {
    /// Create a non-modal jump step.
    pub fn new(target_id: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            node_name: node_name.into(),
            modal: false,
        }
    }

    /// Mark the step as modal.
    pub fn with_modal(mut self, modal: bool) -> Self {
        self.modal = modal;
        self
    }
}

/// Routing metadata attached to a transition or flow end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Node the flow is in.
    pub node_name: String,
    /// Ancestor flows, outermost first.
    #[serde(default)]
    pub path: Vec<JumpStep>,
}

/// Transition notification published by the flow engine.
///
/// Captured transitions are stored as-is, so this is also the history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTransition {
    /// Flow definition owning the transition.
    pub name: FlowId,
    /// Flow instance identifier.
    pub id: String,
    /// Node that was entered.
    pub state_def: StateDef,
    /// Node name and ancestor path.
    pub meta_data: NodeMeta,
    /// Whether the transition happened inside a modal flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal: Option<bool>,
}

/// A navigable point in history.
pub type TransitionRecord = FlowTransition;

impl FlowTransition {
    /// Create a transition with an empty ancestor path.
    pub fn new(
        name: impl Into<FlowId>,
        id: impl Into<String>,
        node_name: impl Into<String>,
        state_def: StateDef,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            state_def,
            meta_data: NodeMeta {
                node_name: node_name.into(),
                path: Vec::new(),
            },
            modal: None,
        }
    }

    /// Set the ancestor path.
    pub fn with_path(mut self, path: Vec<JumpStep>) -> Self {
        self.meta_data.path = path;
        self
    }

    /// Set the modal flag explicitly.
    pub fn with_modal(mut self, modal: bool) -> Self {
        self.modal = Some(modal);
        self
    }

    /// Node name the transition entered.
    pub fn node_name(&self) -> &str {
        &self.meta_data.node_name
    }

    /// Ancestor path, outermost first.
    pub fn path(&self) -> &[JumpStep] {
        &self.meta_data.path
    }

    /// Whether the transition is modal (unset counts as not modal).
    pub fn is_modal(&self) -> bool {
        self.modal.unwrap_or(false)
    }
}

/// Flow end notification published by the flow engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEnd {
    /// Flow definition that ended.
    pub name: FlowId,
    /// Flow instance identifier.
    pub id: String,
    /// Node the flow ended in.
    #[serde(default)]
    pub meta_data: NodeMeta,
}

impl FlowEnd {
    /// Create an end notification.
    pub fn new(name: impl Into<FlowId>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            meta_data: NodeMeta::default(),
        }
    }
}

/// Options for constructing a [`Jump`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpOptions {
    /// Re-enter the node modally.
    pub modal: bool,
    /// Reuse this flow instance id instead of allocating a new one.
    pub force_flow_id: Option<String>,
}

/// Instruction to re-enter a node with given input state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jump {
    /// Node to enter.
    pub node_name: String,
    /// Serialized input state, if any was available.
    pub input: Option<String>,
    /// Re-enter modally.
    #[serde(default)]
    pub modal: bool,
    /// Flow instance id to reuse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_flow_id: Option<String>,
}

impl Jump {
    /// Create a jump.
    pub fn new(node_name: impl Into<String>, input: Option<String>, options: JumpOptions) -> Self {
        Self {
            node_name: node_name.into(),
            input,
            modal: options.modal,
            force_flow_id: options.force_flow_id,
        }
    }
}

/// Outbound request asking the flow engine to replay a jump path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigateRequest {
    /// Caller-supplied options from the back event.
    #[serde(flatten)]
    pub options: Map<String, Value>,
    /// Jumps, outermost flow first.
    pub jump: Vec<Jump>,
}

/// Event delivered to [`NavigationHistory::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    /// A flow transitioned to a new node.
    Transition(FlowTransition),
    /// A flow finished.
    FlowEnd(FlowEnd),
    /// Any other named event; triggers back navigation when it matches the back event.
    Named {
        /// Event name.
        name: String,
        /// Event payload.
        options: Map<String, Value>,
    },
}
