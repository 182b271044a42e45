//! Detection engine tests that drive a whole simulated session through
//! signals, drift scoring, advisory hints, and throttling together.

use hivemind_core::{BrainState, SessionMode, ToastConfig};
use hivemind_engine::drift::DriftTier;
use hivemind_engine::{
    advisor, build_checklist, calculate_drift_score, checklist_items, detect_chain_breaks,
    record_tool_call, record_turn, KeywordScanner, ToastThrottle, ToolCallSignal,
};

fn open_session() -> BrainState {
    let mut state = BrainState::new("sess-e2e", SessionMode::PlanDriven, 0);
    state.unlock();
    state.hierarchy.trajectory = "Build auth system".into();
    state.hierarchy.tactic = "JWT validation".into();
    state.hierarchy.action = "Write middleware".into();
    state
}

fn failing_bash(text: &str) -> ToolCallSignal<'_> {
    ToolCallSignal {
        tool_name: "bash",
        failed: true,
        write_target: None,
        text,
    }
}

// ===========================================================================
// A session that goes off the rails
// ===========================================================================

#[test]
fn a_struggling_session_decays_through_every_tier() {
    let scanner = KeywordScanner::new();
    let mut state = open_session();
    state.metrics.context_updates = 1;

    state.metrics.drift_score = calculate_drift_score(&state);
    assert_eq!(
        DriftTier::classify(state.metrics.drift_score, false),
        DriftTier::OnTrack
    );

    // Fifteen turns of repeated failures with no refocus.
    for turn in 0..15 {
        record_turn(&mut state, turn * 1_000);
        record_tool_call(&mut state, &scanner, &failing_bash("ugh, still failing"));
    }
    assert_eq!(state.metrics.consecutive_failures, 15);
    state.metrics.drift_score = calculate_drift_score(&state);
    let tier = DriftTier::classify(state.metrics.drift_score, false);
    assert_eq!(tier, DriftTier::SomeDrift);

    // Failures reset on success but the unfocused-turn debt remains.
    record_tool_call(
        &mut state,
        &scanner,
        &ToolCallSignal {
            tool_name: "bash",
            failed: false,
            write_target: None,
            text: "",
        },
    );
    assert_eq!(state.metrics.consecutive_failures, 0);
    let recovered = calculate_drift_score(&state);
    assert!(recovered > state.metrics.drift_score);
    assert!(recovered < 100);
}

#[test]
fn keyword_flags_accumulate_once_per_tag() {
    let scanner = KeywordScanner::new();
    let mut state = open_session();

    record_tool_call(&mut state, &scanner, &failing_bash("wtf, still broken AGAIN"));
    record_tool_call(&mut state, &scanner, &failing_bash("stuck at a dead end"));
    record_tool_call(&mut state, &scanner, &failing_bash("still broken"));

    let mut flags = state.metrics.keyword_flags.clone();
    flags.sort();
    assert_eq!(flags, vec!["blocked", "frustration", "repetition"]);
}

// ===========================================================================
// Advisor escalation against live metrics
// ===========================================================================

#[test]
fn advisor_escalates_as_the_session_degrades() {
    let mut state = open_session();
    assert!(advisor::tool_activation(&state).is_none());

    state.metrics.turn_count = 6;
    state.metrics.drift_score = 45;
    let hint = advisor::tool_activation(&state).unwrap();
    assert_eq!(hint.tool, "hivemind_session update");

    // A lock overrides even heavy drift.
    state.lock();
    let hint = advisor::tool_activation(&state).unwrap();
    assert_eq!(hint.tool, "hivemind_session start");
}

#[test]
fn commit_advisor_follows_files_not_drift() {
    let mut state = open_session();
    state.metrics.drift_score = 10;
    assert!(advisor::commit_suggestion(&state, 5).is_none());

    for i in 0..6 {
        state.add_file_touched(format!("src/mod{i}.rs"));
    }
    state.metrics.turn_count = 8;
    let suggestion = advisor::commit_suggestion(&state, 5).unwrap();
    assert_eq!(suggestion.files, 6);
}

// ===========================================================================
// Chain integrity against projections
// ===========================================================================

#[test]
fn chain_breaks_surface_in_tier_classification() {
    let mut state = open_session();
    state.hierarchy.tactic.clear();

    let breaks = detect_chain_breaks(&state.hierarchy);
    assert_eq!(breaks.len(), 1);

    let score = calculate_drift_score(&state);
    assert_eq!(DriftTier::classify(score, !breaks.is_empty()), DriftTier::SomeDrift);
}

// ===========================================================================
// Checklist injection stays within budget
// ===========================================================================

#[test]
fn checklist_reflects_state_and_respects_the_budget() {
    let mut state = open_session();
    state.hierarchy.action.clear();
    state.add_file_touched("src/auth.rs");

    let items = checklist_items(&state);
    assert!(items.iter().any(|i| i.contains("Action-level focus")));
    assert!(items.iter().any(|i| i.contains("git commit")));

    let block = build_checklist(&items, 300);
    assert!(block.len() <= 300 + "</system-reminder>".len() + 1);
    assert!(block.starts_with("<system-reminder>"));

    state.hierarchy.action = "Write middleware".into();
    state.metrics.context_updates = 3;
    state.metrics.files_touched.clear();
    assert_eq!(build_checklist(&checklist_items(&state), 300), "");
}

// ===========================================================================
// Toast throttling under configured limits
// ===========================================================================

#[test]
fn throttle_honors_custom_config() {
    let config = ToastConfig {
        cooldown_ms: 10_000,
        max_per_session: 2,
    };
    let mut throttle = ToastThrottle::new(config, 0);

    assert!(throttle.check_and_record("drift", "warn", 0));
    assert!(!throttle.check_and_record("drift", "warn", 5_000));
    assert!(throttle.check_and_record("drift", "warn", 11_000));
    // Quota of two now spent for this key; other keys unaffected.
    assert!(!throttle.check_and_record("drift", "warn", 30_000));
    assert!(throttle.check_and_record("drift", "critical", 30_000));
}
