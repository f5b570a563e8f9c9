//! List shaping for hosts that present actions in a menu.

use crate::CodeAction;

/// Replace every inlinable group with its children. Groups that are not
/// inlinable stay as they are, whatever their size.
pub fn inline_actions(actions: Vec<CodeAction>) -> Vec<CodeAction> {
    let mut result = Vec::with_capacity(actions.len());
    for action in actions {
        if action.is_inlinable() {
            result.extend(action.nested_actions().iter().cloned());
        } else {
            result.push(action);
        }
    }
    result
}

/// Keep the first action of every equivalence class. Un-keyed actions are
/// never equivalent to anything and are all kept.
pub fn dedupe_equivalent(actions: Vec<CodeAction>) -> Vec<CodeAction> {
    let mut result: Vec<CodeAction> = Vec::with_capacity(actions.len());
    for action in actions {
        if !result.iter().any(|kept| kept.is_equivalent_to(&action)) {
            result.push(action);
        }
    }
    result
}

/// Stable sort, highest priority first.
pub fn sort_by_priority(actions: &mut [CodeAction]) {
    actions.sort_by(|a, b| b.priority().cmp(&a.priority()));
}
