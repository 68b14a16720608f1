//! Remember-state policy.

use super::{HistoryPolicy, StateDef};

/// Decide whether a node entered by a transition is kept in history.
///
/// | node   | always   | never | default  |
/// |--------|----------|-------|----------|
/// | view   | remember | skip  | remember |
/// | action | remember | skip  | skip     |
/// | other  | skip     | skip  | skip     |
pub fn should_remember(state_def: &StateDef) -> bool {
    match state_def {
        StateDef::View { history } => *history != HistoryPolicy::Never,
        StateDef::Action { history } => *history == HistoryPolicy::Always,
        StateDef::Flow { .. } | StateDef::End => false,
    }
}
