//! Pure advisory functions: which governance tool is most relevant
//! right now, and whether a commit checkpoint is due.

use crate::drift::DRIFT_WARN;
use hivemind_core::BrainState;

/// Drift below this (plus a few turns of history) triggers a re-focus
/// hint. Sits between the reporting tiers on purpose: hint before the
/// score reads "significant".
const DRIFT_HINT_THRESHOLD: u8 = DRIFT_WARN + 10;
const DRIFT_HINT_MIN_TURNS: u32 = 5;
const LONG_SESSION_TURNS: u32 = 15;
/// Turns between repeated commit suggestions.
const COMMIT_SUGGESTION_COOLDOWN: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HintPriority {
    High,
    Medium,
    Low,
}

#[derive(Clone, Debug)]
pub struct ToolHint {
    pub tool: &'static str,
    pub reason: String,
    pub priority: HintPriority,
}

/// The single most relevant hint, or nothing. Priority order: locked
/// session, drift, long session, empty hierarchy.
pub fn tool_activation(state: &BrainState) -> Option<ToolHint> {
    if !state.is_open() {
        return Some(ToolHint {
            tool: "hivemind_session start",
            reason: "Session is LOCKED. Declare your intent to start working.".into(),
            priority: HintPriority::High,
        });
    }

    if state.metrics.drift_score < DRIFT_HINT_THRESHOLD
        && state.metrics.turn_count >= DRIFT_HINT_MIN_TURNS
    {
        return Some(ToolHint {
            tool: "hivemind_session update",
            reason: "Drift detected. Update your focus to stay on track.".into(),
            priority: HintPriority::High,
        });
    }

    if state.metrics.turn_count >= LONG_SESSION_TURNS {
        return Some(ToolHint {
            tool: "hivemind_session close",
            reason: "Long session detected. Consider archiving and resetting.".into(),
            priority: HintPriority::Medium,
        });
    }

    if state.hierarchy.is_empty() {
        return Some(ToolHint {
            tool: "hivemind_session update",
            reason: "No hierarchy set. Define your trajectory for better tracking.".into(),
            priority: HintPriority::Medium,
        });
    }

    None
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSuggestion {
    pub reason: String,
    pub files: usize,
}

/// Suggest a commit once enough files are touched, with a turn-based
/// cooldown so the suggestion does not nag every turn.
pub fn commit_suggestion(state: &BrainState, file_threshold: usize) -> Option<CommitSuggestion> {
    let files = state.metrics.files_touched.len();
    if files < file_threshold {
        return None;
    }

    let since_last = state
        .metrics
        .turn_count
        .saturating_sub(state.last_commit_suggestion_turn);
    if state.last_commit_suggestion_turn > 0 && since_last < COMMIT_SUGGESTION_COOLDOWN {
        return None;
    }

    Some(CommitSuggestion {
        reason: format!("{files} files touched, consider committing your work."),
        files,
    })
}
