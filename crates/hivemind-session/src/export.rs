//! Session export snapshots, written on close. Best-effort: an export
//! failure never fails the close.

use hivemind_core::{BrainState, FlatHierarchy, SelfRating};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionExportData {
    pub id: String,
    pub mode: String,
    pub date: String,
    /// Reserved for downstream cataloging; empty by default.
    #[serde(default)]
    pub meta_key: String,
    #[serde(default)]
    pub role: String,
    pub by_ai: bool,
    pub turns: u32,
    pub drift_score: u8,
    pub files_touched: Vec<String>,
    pub hierarchy: FlatHierarchy,
    pub summary: String,
    pub ratings: Vec<SelfRating>,
}

pub fn export_data(state: &BrainState, summary: &str) -> SessionExportData {
    SessionExportData {
        id: state.session.id.clone(),
        mode: state.session.mode.as_str().to_string(),
        date: state.session.date.clone(),
        meta_key: String::new(),
        role: String::new(),
        by_ai: true,
        turns: state.metrics.turn_count,
        drift_score: state.metrics.drift_score,
        files_touched: state.metrics.files_touched.clone(),
        hierarchy: state.hierarchy.clone(),
        summary: summary.to_string(),
        ratings: state.self_ratings.clone(),
    }
}

pub fn json_export(data: &SessionExportData) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

pub fn markdown_export(data: &SessionExportData, session_body: &str) -> String {
    let mut lines = vec![
        format!("# Session Export: {}", data.id),
        String::new(),
        "## Metadata".to_string(),
        format!("- **Mode**: {}", data.mode),
        format!("- **Date**: {}", data.date),
        format!("- **By AI**: {}", data.by_ai),
        String::new(),
        "## Metrics".to_string(),
        format!("- **Turns**: {}", data.turns),
        format!("- **Drift**: {}/100", data.drift_score),
        format!("- **Files touched**: {}", data.files_touched.len()),
        String::new(),
        "## Hierarchy".to_string(),
    ];
    if !data.hierarchy.trajectory.is_empty() {
        lines.push(format!("- **Trajectory**: {}", data.hierarchy.trajectory));
    }
    if !data.hierarchy.tactic.is_empty() {
        lines.push(format!("- **Tactic**: {}", data.hierarchy.tactic));
    }
    if !data.hierarchy.action.is_empty() {
        lines.push(format!("- **Action**: {}", data.hierarchy.action));
    }
    if !data.files_touched.is_empty() {
        lines.push(String::new());
        lines.push("## Files Touched".to_string());
        for file in &data.files_touched {
            lines.push(format!("- {file}"));
        }
    }
    if !data.ratings.is_empty() {
        lines.push(String::new());
        lines.push("## Self-Ratings".to_string());
        for rating in &data.ratings {
            lines.push(format!("- {}/10: {}", rating.score, rating.reason));
        }
    }
    lines.push(String::new());
    lines.push("## Summary".to_string());
    lines.push(data.summary.clone());
    lines.push(String::new());
    lines.push("## Session Content".to_string());
    lines.push(session_body.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivemind_core::SessionMode;

    fn state() -> BrainState {
        let mut state = BrainState::new("sess-exp", SessionMode::PlanDriven, 1_700_000_000_000);
        state.hierarchy = FlatHierarchy {
            trajectory: "Build auth system".into(),
            tactic: "JWT validation".into(),
            action: "Write middleware".into(),
        };
        state.add_file_touched("src/auth.rs");
        state.add_file_touched("src/middleware.rs");
        state.add_self_rating(8, "Good progress");
        state.metrics.turn_count = 12;
        state
    }

    #[test]
    fn export_data_mirrors_session() {
        let data = export_data(&state(), "Completed auth system");
        assert_eq!(data.id, "sess-exp");
        assert_eq!(data.mode, "plan_driven");
        assert_eq!(data.date, "2023-11-14");
        assert!(data.by_ai);
        assert_eq!(data.turns, 12);
        assert_eq!(data.files_touched.len(), 2);
        assert_eq!(data.hierarchy.trajectory, "Build auth system");
        assert_eq!(data.summary, "Completed auth system");
        assert_eq!(data.ratings.len(), 1);
        assert_eq!(data.ratings[0].score, 8);
    }

    #[test]
    fn json_export_parses_back() {
        let data = export_data(&state(), "JSON export test");
        let parsed: SessionExportData = serde_json::from_str(&json_export(&data)).unwrap();
        assert_eq!(parsed.id, "sess-exp");
        assert_eq!(parsed.hierarchy.tactic, "JWT validation");
    }

    #[test]
    fn markdown_export_has_expected_sections() {
        let data = export_data(&state(), "Markdown export test");
        let md = markdown_export(&data, "## Some session body content");
        assert!(md.contains("# Session Export: sess-exp"));
        assert!(md.contains("## Metadata"));
        assert!(md.contains("## Metrics"));
        assert!(md.contains("**Trajectory**: Build auth system"));
        assert!(md.contains("## Files Touched"));
        assert!(md.contains("src/auth.rs"));
        assert!(md.contains("8/10: Good progress"));
        assert!(md.contains("Markdown export test"));
        assert!(md.contains("## Some session body content"));
    }
}
