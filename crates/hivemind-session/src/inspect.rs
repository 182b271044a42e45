//! Inspection surfaces: scan (snapshot), deep (context refresh), and
//! drift (alignment check). Reads only, never mutates.

use crate::outcome::Outcome;
use hivemind_core::{now_ms, GovernanceConfig, Result};
use hivemind_engine::{chain, drift, drift::DriftTier};
use hivemind_hierarchy::{persist, render};
use hivemind_state::{AnchorsState, HivemindPaths, MemsState, StateManager};
use serde_json::json;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InspectAction {
    Scan,
    Deep,
    Drift,
}

impl InspectAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scan" => Some(Self::Scan),
            "deep" => Some(Self::Deep),
            "drift" => Some(Self::Drift),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Deep => "deep",
            Self::Drift => "drift",
        }
    }
}

pub async fn inspect(
    project_root: &Path,
    action: InspectAction,
    json: bool,
) -> Result<String> {
    let paths = HivemindPaths::new(project_root);
    let config = GovernanceConfig::load(&paths.config);
    let now = now_ms();

    let Some(state) = StateManager::new(project_root).load().await else {
        return Ok(if json {
            Outcome::rejected(
                action.name(),
                json!({"error": "no session", "active": false}),
                now,
            )
            .to_json()
        } else {
            "ERROR: No active session. Call hivemind_session start to begin.".to_string()
        });
    };

    match action {
        InspectAction::Scan => scan(&paths, &state, json, now).await,
        InspectAction::Deep => deep(&paths, &config, &state, json, now).await,
        InspectAction::Drift => drift_report(&paths, &state, json, now).await,
    }
}

async fn scan(
    paths: &HivemindPaths,
    state: &hivemind_core::BrainState,
    json: bool,
    now: i64,
) -> Result<String> {
    let anchors = AnchorsState::load(paths).await;
    let mems = MemsState::load(paths).await;
    let tree = persist::load_tree(paths).await;
    let stats = tree.stats();

    if json {
        return Ok(Outcome::ok(
            "scan",
            json!({
                "active": true,
                "sessionId": state.session.id,
                "governanceStatus": state.session.governance_status.to_string(),
                "mode": state.session.mode.as_str(),
                "hierarchy": {
                    "trajectory": state.hierarchy.trajectory,
                    "tactic": state.hierarchy.tactic,
                    "action": state.hierarchy.action,
                },
                "metrics": {
                    "turnCount": state.metrics.turn_count,
                    "driftScore": state.metrics.drift_score,
                    "filesTouched": state.metrics.files_touched.len(),
                    "contextUpdates": state.metrics.context_updates,
                },
                "treeStats": if tree.is_empty() { json!(null) } else { json!({
                    "totalNodes": stats.total_nodes,
                    "depth": stats.depth,
                    "activeNodes": stats.active_nodes,
                    "completedNodes": stats.completed_nodes,
                }) },
                "anchorCount": anchors.anchors.len(),
                "memCount": mems.mems.len(),
            }),
            now,
        )
        .to_json());
    }

    let mut lines = vec![
        format!(
            "Session: {} | Mode: {}",
            state.session.governance_status, state.session.mode
        ),
        format!("  ID: {}", state.session.id),
        String::new(),
    ];

    if tree.is_empty() {
        lines.push("Hierarchy:".to_string());
        lines.push(format!(
            "  Trajectory: {}",
            not_set(&state.hierarchy.trajectory)
        ));
        lines.push(format!("  Tactic: {}", not_set(&state.hierarchy.tactic)));
        lines.push(format!("  Action: {}", not_set(&state.hierarchy.action)));
    } else {
        lines.push(format!(
            "Hierarchy Tree ({} nodes, depth {}):",
            stats.total_nodes, stats.depth
        ));
        lines.push(render::to_ascii_tree(&tree));
        if stats.completed_nodes > 0 {
            lines.push(format!(
                "  Completed: {} | Active: {} | Pending: {}",
                stats.completed_nodes, stats.active_nodes, stats.pending_nodes
            ));
        }
    }
    lines.push(String::new());
    lines.push("Metrics:".to_string());
    lines.push(format!(
        "  Turns: {} | Drift: {}/100",
        state.metrics.turn_count, state.metrics.drift_score
    ));
    lines.push(format!(
        "  Files: {} | Context updates: {}",
        state.metrics.files_touched.len(),
        state.metrics.context_updates
    ));

    if !anchors.anchors.is_empty() {
        lines.push(String::new());
        lines.push(format!("Anchors ({}):", anchors.anchors.len()));
        for anchor in anchors.anchors.iter().take(5) {
            let preview: String = anchor.value.chars().take(60).collect();
            lines.push(format!("  [{}]: {}", anchor.key, preview));
        }
        if anchors.anchors.len() > 5 {
            lines.push(format!("  ... and {} more", anchors.anchors.len() - 5));
        }
    }

    if !mems.mems.is_empty() {
        let shelf_info = mems
            .shelf_summary()
            .iter()
            .map(|(shelf, count)| format!("{shelf}({count})"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(String::new());
        lines.push(format!("Memories: {} [{}]", mems.mems.len(), shelf_info));
    }

    lines.push(String::new());
    lines.push(
        "-> Use hivemind_inspect drift for alignment analysis, or deep for full context refresh."
            .to_string(),
    );
    Ok(lines.join("\n"))
}

async fn deep(
    paths: &HivemindPaths,
    config: &GovernanceConfig,
    state: &hivemind_core::BrainState,
    json: bool,
    now: i64,
) -> Result<String> {
    let anchors = AnchorsState::load(paths).await;
    let tree = persist::load_tree(paths).await;
    let chain_breaks = chain::detect_chain_breaks(&state.hierarchy);
    let gaps = tree.detect_gaps(config.stale_gap_ms());
    let stale: Vec<_> = gaps
        .iter()
        .filter(|g| g.severity == hivemind_hierarchy::GapSeverity::Stale)
        .collect();

    if json {
        let cursor = tree.cursor_node();
        let cursor_path: Vec<_> = tree
            .cursor
            .as_deref()
            .map(|id| {
                tree.ancestors(id)
                    .iter()
                    .map(|n| {
                        json!({"level": n.level.as_str(), "content": n.content, "stamp": n.stamp})
                    })
                    .collect()
            })
            .unwrap_or_default();

        return Ok(Outcome::ok(
            "deep",
            json!({
                "active": true,
                "sessionId": state.session.id,
                "mode": state.session.mode.as_str(),
                "hierarchy": {
                    "trajectory": state.hierarchy.trajectory,
                    "tactic": state.hierarchy.tactic,
                    "action": state.hierarchy.action,
                },
                "cursor": cursor.map(|n| json!({
                    "id": n.id, "level": n.level.as_str(),
                    "content": n.content, "status": n.status,
                })),
                "cursorPath": cursor_path,
                "metrics": {
                    "turnCount": state.metrics.turn_count,
                    "driftScore": state.metrics.drift_score,
                    "filesTouched": state.metrics.files_touched.len(),
                    "contextUpdates": state.metrics.context_updates,
                },
                "chainBreaks": chain_breaks,
                "staleGaps": stale.iter().map(|g| json!({
                    "from": g.from, "to": g.to,
                    "gapHours": (g.gap_ms as f64 / 3_600_000.0 * 10.0).round() / 10.0,
                    "relationship": g.relationship,
                })).collect::<Vec<_>>(),
                "anchors": anchors.anchors.iter()
                    .map(|a| json!({"key": a.key, "value": a.value}))
                    .collect::<Vec<_>>(),
                "filesTouched": state.metrics.files_touched.iter().take(10).collect::<Vec<_>>(),
            }),
            now,
        )
        .to_json());
    }

    let mut lines = vec![
        "=== DEEP INSPECT: Context Refresh ===".to_string(),
        String::new(),
        "## Where You Are".to_string(),
        format!("Mode: {}", state.session.mode),
    ];

    if !tree.is_empty() {
        lines.push(String::new());
        lines.push("Hierarchy Tree:".to_string());
        lines.push(render::to_ascii_tree(&tree));

        if let Some(cursor) = tree.cursor_node() {
            let ancestors = tree.ancestors(&cursor.id);
            if ancestors.len() > 1 {
                lines.push(String::new());
                lines.push("Cursor path:".to_string());
                for node in ancestors {
                    lines.push(format!("  {}: {} ({})", node.level, node.content, node.stamp));
                }
            }
        }

        if !stale.is_empty() {
            lines.push(String::new());
            lines.push("WARN stale gaps detected:".to_string());
            for gap in stale.iter().take(3) {
                let hours = (gap.gap_ms as f64 / 3_600_000.0 * 10.0).round() / 10.0;
                lines.push(format!(
                    "  {} -> {}: {hours}hr ({})",
                    gap.from, gap.to, gap.relationship
                ));
            }
        }
    } else {
        if !state.hierarchy.trajectory.is_empty() {
            lines.push(format!("Trajectory: {}", state.hierarchy.trajectory));
        }
        if !state.hierarchy.tactic.is_empty() {
            lines.push(format!("Tactic: {}", state.hierarchy.tactic));
        }
        if !state.hierarchy.action.is_empty() {
            lines.push(format!("Action: {}", state.hierarchy.action));
        }
    }
    lines.push(String::new());

    lines.push("## Session Health".to_string());
    lines.push(format!(
        "Turns: {} | Drift: {}/100",
        state.metrics.turn_count, state.metrics.drift_score
    ));
    lines.push(format!(
        "Files touched: {}",
        state.metrics.files_touched.len()
    ));
    lines.push(format!(
        "Context updates: {}",
        state.metrics.context_updates
    ));
    if !chain_breaks.is_empty() {
        lines.push("WARN chain breaks:".to_string());
        for b in &chain_breaks {
            lines.push(format!("  - {b}"));
        }
    }
    lines.push(String::new());

    if !anchors.anchors.is_empty() {
        lines.push("## Immutable Anchors".to_string());
        for anchor in anchors.anchors.iter().take(5) {
            lines.push(format!("  [{}]: {}", anchor.key, anchor.value));
        }
        if anchors.anchors.len() > 5 {
            lines.push(format!(
                "  ... and {} more anchors",
                anchors.anchors.len() - 5
            ));
        }
        lines.push(String::new());
    }

    if !state.metrics.files_touched.is_empty() {
        lines.push("## Files Touched".to_string());
        for file in state.metrics.files_touched.iter().take(10) {
            lines.push(format!("  - {file}"));
        }
        if state.metrics.files_touched.len() > 10 {
            lines.push(format!(
                "  ... and {} more",
                state.metrics.files_touched.len() - 10
            ));
        }
        lines.push(String::new());
    }

    lines.push("=== END DEEP INSPECT ===".to_string());
    let mut result = lines.join("\n")
        + "\n-> Use hivemind_session update to change focus, or close to archive.";
    // Context refresh must itself stay small in context.
    if result.len() > 2000 {
        result.truncate(1970);
        result.push_str("\n... (output truncated)");
    }
    Ok(result)
}

async fn drift_report(
    paths: &HivemindPaths,
    state: &hivemind_core::BrainState,
    json: bool,
    now: i64,
) -> Result<String> {
    let anchors = AnchorsState::load(paths).await;
    let chain_breaks = chain::detect_chain_breaks(&state.hierarchy);
    let score = drift::calculate_drift_score(state);
    let tier = DriftTier::classify(score, !chain_breaks.is_empty());

    if json {
        return Ok(Outcome::ok(
            "drift",
            json!({
                "active": true,
                "driftScore": score,
                "healthStatus": match tier {
                    DriftTier::OnTrack => "good",
                    DriftTier::SomeDrift => "warning",
                    DriftTier::SignificantDrift => "critical",
                },
                "hierarchy": {
                    "trajectory": state.hierarchy.trajectory,
                    "tactic": state.hierarchy.tactic,
                    "action": state.hierarchy.action,
                },
                "chainBreaks": chain_breaks,
                "chainIntact": chain_breaks.is_empty(),
                "anchors": anchors.anchors.iter()
                    .map(|a| json!({"key": a.key, "value": a.value}))
                    .collect::<Vec<_>>(),
                "metrics": {
                    "turnCount": state.metrics.turn_count,
                    "filesTouched": state.metrics.files_touched.len(),
                    "contextUpdates": state.metrics.context_updates,
                    "violationCount": state.metrics.violation_count,
                },
                "recommendation": match tier {
                    DriftTier::OnTrack => "on_track",
                    DriftTier::SomeDrift => "some_drift",
                    DriftTier::SignificantDrift => "significant_drift",
                },
            }),
            now,
        )
        .to_json());
    }

    let marker = match tier {
        DriftTier::OnTrack => "OK",
        DriftTier::SomeDrift => "WARN",
        DriftTier::SignificantDrift => "CRIT",
    };
    let mut lines = vec![
        "=== DRIFT REPORT ===".to_string(),
        String::new(),
        format!("[{marker}] Drift Score: {score}/100"),
        String::new(),
        "## Trajectory Alignment".to_string(),
    ];
    if state.hierarchy.trajectory.is_empty() {
        lines.push("WARN no trajectory set. Use hivemind_session start to set your focus.".to_string());
    } else {
        lines.push(format!("Original: {}", state.hierarchy.trajectory));
        if !state.hierarchy.tactic.is_empty() {
            lines.push(format!("Current tactic: {}", state.hierarchy.tactic));
        }
        if !state.hierarchy.action.is_empty() {
            lines.push(format!("Current action: {}", state.hierarchy.action));
        }
    }
    lines.push(String::new());

    lines.push("## Chain Integrity".to_string());
    if chain_breaks.is_empty() {
        lines.push("OK hierarchy chain is intact.".to_string());
    } else {
        for b in &chain_breaks {
            lines.push(format!("BREAK {b}"));
        }
    }
    lines.push(String::new());

    if !anchors.anchors.is_empty() {
        lines.push("## Anchor Compliance".to_string());
        lines.push("Verify your work respects these immutable constraints:".to_string());
        for anchor in &anchors.anchors {
            lines.push(format!("  [ ] [{}]: {}", anchor.key, anchor.value));
        }
        lines.push(String::new());
    }

    lines.push("## Metrics".to_string());
    lines.push(format!("Turns: {}", state.metrics.turn_count));
    lines.push(format!("Files: {}", state.metrics.files_touched.len()));
    lines.push(format!(
        "Context updates: {}",
        state.metrics.context_updates
    ));
    if state.metrics.violation_count > 0 {
        lines.push(format!("WARN violations: {}", state.metrics.violation_count));
    }
    lines.push(String::new());

    lines.push("## Recommendation".to_string());
    lines.push(match tier {
        DriftTier::OnTrack => "OK on track. Continue working.".to_string(),
        DriftTier::SomeDrift => {
            "WARN some drift detected. Consider hivemind_session update to refocus.".to_string()
        }
        DriftTier::SignificantDrift => {
            "CRIT significant drift. Use hivemind_session update to re-focus, or close to reset."
                .to_string()
        }
    });
    lines.push(String::new());
    lines.push("=== END DRIFT REPORT ===".to_string());
    Ok(lines.join("\n"))
}

fn not_set(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}
