//! Drift scoring.
//!
//! The score starts at 100 and decays as the session accumulates
//! unfocused turns, violations, failures, and repetition. Each penalty
//! is individually capped so no single signal can zero the score alone.
//! The 70/40 tier thresholds live here and nowhere else; every
//! inspection surface consumes them from this module.

use hivemind_core::BrainState;

/// At or above this (with an intact chain): on track.
pub const DRIFT_GOOD: u8 = 70;
/// Below this: significant drift.
pub const DRIFT_WARN: u8 = 40;

/// Turns one context update "covers" before turns count as unfocused.
const TURNS_PER_UPDATE: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriftTier {
    OnTrack,
    SomeDrift,
    SignificantDrift,
}

impl DriftTier {
    /// Tier for a score plus chain health. Chain breaks disqualify
    /// "on track" regardless of score.
    pub fn classify(score: u8, has_chain_breaks: bool) -> Self {
        if score >= DRIFT_GOOD && !has_chain_breaks {
            Self::OnTrack
        } else if score >= DRIFT_WARN {
            Self::SomeDrift
        } else {
            Self::SignificantDrift
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::OnTrack => "on track",
            Self::SomeDrift => "some drift, suggest re-focus",
            Self::SignificantDrift => "significant drift, suggest reset",
        }
    }
}

/// Weighted drift score in 0..=100. Total over well-formed state; a
/// fresh session scores exactly 100.
pub fn calculate_drift_score(state: &BrainState) -> u8 {
    let m = &state.metrics;
    let mut penalty: u32 = 0;

    // Turns not "covered" by a context update.
    let covered = m.context_updates.saturating_mul(TURNS_PER_UPDATE);
    let unfocused = m.turn_count.saturating_sub(covered);
    penalty += unfocused.saturating_mul(2).min(40);

    penalty += m.violation_count.saturating_mul(10).min(30);
    penalty += m.consecutive_failures.saturating_mul(5).min(15);
    penalty += m.consecutive_same_section.saturating_mul(3).min(10);
    penalty += (m.keyword_flags.len() as u32).saturating_mul(2).min(10);

    // Working blind: several turns in and still no action-level focus.
    if m.turn_count >= 5 && state.hierarchy.action.is_empty() {
        penalty += 5;
    }

    100u32.saturating_sub(penalty).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivemind_core::SessionMode;

    fn fresh() -> BrainState {
        BrainState::new("sess-t", SessionMode::PlanDriven, 0)
    }

    #[test]
    fn fresh_session_scores_100() {
        assert_eq!(calculate_drift_score(&fresh()), 100);
    }

    #[test]
    fn violations_never_increase_score() {
        let mut state = fresh();
        let mut prev = calculate_drift_score(&state);
        for v in 1..=10 {
            state.metrics.violation_count = v;
            let score = calculate_drift_score(&state);
            assert!(score <= prev, "violations {v}: {score} > {prev}");
            prev = score;
        }
    }

    #[test]
    fn long_unfocused_sessions_decay() {
        let mut state = fresh();
        state.metrics.turn_count = 20;
        let unfocused = calculate_drift_score(&state);
        state.metrics.context_updates = 4;
        let focused = calculate_drift_score(&state);
        assert!(focused > unfocused);
    }

    #[test]
    fn score_clamps_at_zero() {
        let mut state = fresh();
        state.metrics.turn_count = 100;
        state.metrics.violation_count = 50;
        state.metrics.consecutive_failures = 50;
        state.metrics.consecutive_same_section = 50;
        state.metrics.keyword_flags = (0..20).map(|i| format!("k{i}")).collect();
        assert_eq!(calculate_drift_score(&state), 0);
    }

    #[test]
    fn extreme_metric_values_never_panic() {
        let mut state = fresh();
        state.metrics.turn_count = u32::MAX;
        state.metrics.violation_count = u32::MAX;
        state.metrics.consecutive_failures = u32::MAX;
        state.metrics.consecutive_same_section = u32::MAX;
        state.metrics.keyword_flags = (0..1_000).map(|i| format!("k{i}")).collect();
        assert_eq!(calculate_drift_score(&state), 0);
    }

    #[test]
    fn missing_action_after_five_turns_costs_points() {
        let mut state = fresh();
        state.metrics.turn_count = 5;
        state.metrics.context_updates = 1;
        let without_action = calculate_drift_score(&state);
        state.hierarchy.action = "write the test".into();
        let with_action = calculate_drift_score(&state);
        assert_eq!(with_action, without_action + 5);
    }

    #[test]
    fn tiers_use_central_thresholds() {
        assert_eq!(DriftTier::classify(100, false), DriftTier::OnTrack);
        assert_eq!(DriftTier::classify(70, false), DriftTier::OnTrack);
        assert_eq!(DriftTier::classify(70, true), DriftTier::SomeDrift);
        assert_eq!(DriftTier::classify(69, false), DriftTier::SomeDrift);
        assert_eq!(DriftTier::classify(40, false), DriftTier::SomeDrift);
        assert_eq!(DriftTier::classify(39, false), DriftTier::SignificantDrift);
    }
}
