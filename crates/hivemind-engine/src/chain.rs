//! Structural chain checks over the flat hierarchy.
//!
//! The tree engine cannot produce a broken chain, but flat state from
//! legacy documents can. "Chain intact" is the expected common case.

use hivemind_core::FlatHierarchy;

/// Messages describing levels declared without their parent level set.
/// Empty when the hierarchy is internally consistent.
pub fn detect_chain_breaks(hierarchy: &FlatHierarchy) -> Vec<String> {
    let mut breaks = Vec::new();
    if !hierarchy.action.is_empty() && hierarchy.tactic.is_empty() {
        breaks.push("action declared without a tactic".to_string());
    }
    if !hierarchy.tactic.is_empty() && hierarchy.trajectory.is_empty() {
        breaks.push("tactic declared without a trajectory".to_string());
    }
    breaks
}
