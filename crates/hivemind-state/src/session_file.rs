//! Per-session markdown files: YAML frontmatter plus a hierarchy body.
//!
//! Session files are the human-readable face of the state store. They
//! live under `sessions/active/` while open and `sessions/archive/`
//! after close, named `YYYY-MM-DD-<mode>-<slug>.md`.

use crate::manifest::SessionManifest;
use crate::paths::{HivemindPaths, STRUCTURE_VERSION};
use crate::store;
use hivemind_core::{BrainState, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionFrontmatter {
    pub id: String,
    pub session_id: String,
    pub stamp: String,
    /// Always "session"; distinguishes these files from other documents.
    #[serde(rename = "type")]
    pub doc_type: String,
    pub mode: String,
    pub governance: String,
    pub governance_status: String,
    #[serde(default)]
    pub trajectory: String,
    #[serde(default)]
    pub tactic: String,
    #[serde(default)]
    pub action: String,
    pub status: String,
    pub created: String,
    pub last_activity: String,
    #[serde(default)]
    pub turns: u32,
    #[serde(default = "default_drift")]
    pub drift: u8,
    #[serde(default)]
    pub linked_plans: Vec<String>,
}

fn default_drift() -> u8 {
    100
}

fn to_iso(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .unwrap_or_else(chrono::Utc::now)
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

impl SessionFrontmatter {
    pub fn for_new_session(
        state: &BrainState,
        stamp: &str,
        governance_mode: &str,
        trajectory: &str,
        now_ms: i64,
    ) -> Self {
        Self {
            id: state.session.id.clone(),
            session_id: state.session.id.clone(),
            stamp: stamp.to_string(),
            doc_type: "session".to_string(),
            mode: state.session.mode.as_str().to_string(),
            governance: governance_mode.to_string(),
            governance_status: state.session.governance_status.to_string(),
            trajectory: trajectory.to_string(),
            tactic: String::new(),
            action: String::new(),
            status: "active".to_string(),
            created: to_iso(now_ms),
            last_activity: to_iso(now_ms),
            turns: state.metrics.turn_count,
            drift: state.metrics.drift_score,
            linked_plans: Vec::new(),
        }
    }
}

/// Render frontmatter and body into the on-disk document.
pub fn instantiate(frontmatter: &SessionFrontmatter, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(frontmatter)
        .map_err(|e| hivemind_core::Error::persistence(format!("frontmatter: {e}")))?;
    Ok(format!("---\n{}---\n\n{}\n", yaml, body.trim_start()))
}

/// Split a session document into frontmatter and body. Documents with
/// missing or malformed frontmatter come back as `(None, whole_content)`.
pub fn parse(content: &str) -> (Option<SessionFrontmatter>, String) {
    let Some(rest) = content.strip_prefix("---\n") else {
        return (None, content.to_string());
    };
    let Some(end) = rest.find("\n---") else {
        return (None, content.to_string());
    };
    let yaml = &rest[..end];
    let body = rest[end + 4..].trim_start_matches('\n').to_string();
    match serde_yaml::from_str(yaml) {
        Ok(fm) => (Some(fm), body),
        Err(e) => {
            tracing::warn!("unparseable session frontmatter ({e}), keeping body only");
            (None, content.to_string())
        }
    }
}

/// Rewrite the active session file in place: refresh mutable frontmatter
/// fields and replace the body.
pub async fn update_active_file(
    paths: &HivemindPaths,
    file_name: &str,
    state: &BrainState,
    body: &str,
    now_ms: i64,
) -> Result<()> {
    let path = paths.active_dir.join(file_name);
    let existing = tokio::fs::read_to_string(&path).await.unwrap_or_default();
    let (parsed, _) = parse(&existing);
    let mut fm = match parsed {
        Some(fm) => fm,
        None => SessionFrontmatter::for_new_session(
            state,
            &state.session.id,
            "assisted",
            &state.hierarchy.trajectory,
            now_ms,
        ),
    };
    fm.trajectory = state.hierarchy.trajectory.clone();
    fm.tactic = state.hierarchy.tactic.clone();
    fm.action = state.hierarchy.action.clone();
    fm.governance_status = state.session.governance_status.to_string();
    fm.last_activity = to_iso(now_ms);
    fm.turns = state.metrics.turn_count;
    fm.drift = state.metrics.drift_score;

    let content = instantiate(&fm, body)?;
    tokio::fs::write(&path, content).await?;
    Ok(())
}

/// Move the session file from active to archive and flip its status.
pub async fn archive_file(paths: &HivemindPaths, file_name: &str, now_ms: i64) -> Result<()> {
    let source = paths.active_dir.join(file_name);
    if !source.is_file() {
        return Ok(());
    }
    let content = tokio::fs::read_to_string(&source).await?;
    let (parsed, body) = parse(&content);
    let rewritten = match parsed {
        Some(mut fm) => {
            fm.status = "archived".to_string();
            fm.last_activity = to_iso(now_ms);
            instantiate(&fm, &body)?
        }
        None => content,
    };
    tokio::fs::create_dir_all(&paths.archive_dir).await?;
    tokio::fs::write(paths.archive_dir.join(file_name), rewritten).await?;
    tokio::fs::remove_file(&source).await?;
    Ok(())
}

/// Regenerate `.hivemind/index.md` from the current brain and manifest.
/// The index is derived state; it is always safe to rewrite.
pub async fn generate_index(paths: &HivemindPaths, now_ms: i64) -> Result<()> {
    let brain: Option<BrainState> = store::load_json(&paths.brain).await;
    let manifest = SessionManifest::load(paths).await;

    let (mode, status, trajectory, turns, drift) = match &brain {
        Some(b) => (
            b.session.mode.as_str().to_string(),
            b.session.governance_status.to_string(),
            if b.hierarchy.trajectory.is_empty() {
                "(none)".to_string()
            } else {
                b.hierarchy.trajectory.clone()
            },
            b.metrics.turn_count,
            b.metrics.drift_score,
        ),
        None => (
            "(unknown)".to_string(),
            "(unknown)".to_string(),
            "(none)".to_string(),
            0,
            100,
        ),
    };

    let active_stamp = manifest.active_stamp.as_deref().unwrap_or("(none)");
    let content = format!(
        "---\n\
         type: index\n\
         structure_version: \"{STRUCTURE_VERSION}\"\n\
         generated: {}\n\
         ---\n\
         # .hivemind: Context Governance State\n\
         \n\
         ## Current State\n\
         - Mode: {mode} | Status: {status}\n\
         - Trajectory: {trajectory}\n\
         - Turns: {turns} | Drift: {drift}/100\n\
         - Active stamp: {active_stamp}\n\
         \n\
         ## Quick Navigation\n\
         - state/brain.json\n\
         - state/hierarchy.json\n\
         - state/anchors.json\n\
         - sessions/active/\n\
         - sessions/archive/\n\
         - memory/mems.json\n",
        to_iso(now_ms),
    );
    tokio::fs::write(&paths.index, content).await?;
    Ok(())
}
