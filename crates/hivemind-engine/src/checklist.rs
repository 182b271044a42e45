//! Pre-stop checklist rendered as a `<system-reminder>` block.
//!
//! Items are added in priority order until the char budget is hit;
//! later items are dropped, never truncated mid-line.

use hivemind_core::BrainState;

/// Render checklist items into a reminder block bounded by `max_chars`.
/// Empty input renders nothing.
pub fn build_checklist(items: &[String], max_chars: usize) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        "<system-reminder>".to_string(),
        "CHECKLIST BEFORE STOPPING:".to_string(),
    ];
    for item in items {
        let mut candidate = lines.clone();
        candidate.push(format!("- [ ] {item}"));
        candidate.push("</system-reminder>".to_string());
        if candidate.join("\n").len() > max_chars {
            break;
        }
        lines.push(format!("- [ ] {item}"));
    }
    lines.push("</system-reminder>".to_string());
    lines.join("\n")
}

/// Checklist items derived from session state, priority order.
pub fn checklist_items(state: &BrainState) -> Vec<String> {
    let mut items = Vec::new();
    if state.hierarchy.action.is_empty() {
        items.push("Action-level focus is missing (call hivemind_session update)".to_string());
    }
    if state.metrics.context_updates == 0 {
        items.push("No focus updates yet in this session".to_string());
    }
    if state.pending_failure_ack {
        items.push("Acknowledge pending subagent failure".to_string());
    }
    if !state.metrics.files_touched.is_empty() {
        items.push("Create a git commit for touched files".to_string());
    }
    items
}
