//! Legacy layout migration.
//!
//! Older releases kept every document flat under `.hivemind/`. This
//! module upgrades a project in place: moves documents into the
//! structured layout, repairs the session manifest, and stamps session
//! files with frontmatter. Moves are journaled so a mid-migration
//! failure rolls the filesystem back to the legacy layout.

use crate::manifest::{SessionManifest, SessionManifestEntry, SessionStatus};
use crate::paths::{
    self, build_session_filename, sanitize_session_filename, HivemindPaths, LegacyPaths,
};
use crate::session_file::{self, SessionFrontmatter};
use crate::store;
use hivemind_core::{BrainState, Result};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct MigrationResult {
    pub migrated: bool,
    pub reason: String,
    pub moved_files: Vec<String>,
    pub errors: Vec<String>,
}

impl MigrationResult {
    fn skipped(reason: &str) -> Self {
        Self {
            migrated: false,
            reason: reason.to_string(),
            moved_files: Vec::new(),
            errors: Vec::new(),
        }
    }
}

struct MoveJournal {
    moves: Vec<(PathBuf, PathBuf)>,
}

impl MoveJournal {
    fn new() -> Self {
        Self { moves: Vec::new() }
    }

    async fn perform(&mut self, from: &Path, to: &Path) -> std::io::Result<bool> {
        if !from.is_file() {
            return Ok(false);
        }
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(from, to).await?;
        self.moves.push((from.to_path_buf(), to.to_path_buf()));
        Ok(true)
    }

    async fn rollback(self) {
        for (from, to) in self.moves.into_iter().rev() {
            if !to.is_file() {
                continue;
            }
            if let Some(parent) = from.parent() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
            if let Err(e) = tokio::fs::rename(&to, &from).await {
                tracing::warn!("rollback of {} failed: {}", to.display(), e);
            }
        }
    }
}

fn is_human_readable(file: &str) -> bool {
    let bytes = file.as_bytes();
    bytes.len() > 11
        && bytes[..10]
            .iter()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { *b == b'-' } else { b.is_ascii_digit() })
        && bytes[10] == b'-'
}

fn choose_filename(entry: &SessionManifestEntry) -> String {
    if let Some(safe) = sanitize_session_filename(&entry.file) {
        if is_human_readable(&safe) {
            return safe;
        }
    }
    let mode = entry.mode.map(|m| m.as_str()).unwrap_or("plan_driven");
    let focus = entry.trajectory.as_deref().unwrap_or("session");
    build_session_filename(entry.created, mode, focus)
}

async fn migrate_sessions(
    legacy: &LegacyPaths,
    new: &HivemindPaths,
    journal: &mut MoveJournal,
    moved: &mut Vec<String>,
) -> Result<SessionManifest> {
    let mut manifest: SessionManifest = store::load_json(&legacy.sessions_manifest)
        .await
        .unwrap_or_default();
    manifest.deduplicate();

    let mut entries = std::mem::take(&mut manifest.sessions);
    for entry in &mut entries {
        let file_name = choose_filename(entry);
        let target_dir = if entry.status == SessionStatus::Active {
            &new.active_dir
        } else {
            &new.archive_dir
        };
        let target = target_dir.join(&file_name);

        let source = sanitize_session_filename(&entry.file)
            .map(|safe| legacy.sessions_dir.join(safe))
            .filter(|p| p.is_file());

        if let Some(source) = source {
            if source != target && journal.perform(&source, &target).await? {
                moved.push(file_name.clone());
            }
            let content = tokio::fs::read_to_string(&target).await?;
            let ensured = ensure_frontmatter(&content, entry, &file_name)?;
            tokio::fs::write(&target, ensured).await?;
        }
        entry.file = file_name;
    }
    manifest.sessions = entries;
    manifest.deduplicate();
    manifest.save(new).await?;
    Ok(manifest)
}

/// Stamp a migrated session file with frontmatter, preserving any it
/// already carries.
fn ensure_frontmatter(
    content: &str,
    entry: &SessionManifestEntry,
    file_name: &str,
) -> Result<String> {
    let (existing, body) = session_file::parse(content);
    if existing.is_some() {
        return Ok(content.to_string());
    }
    let mode = entry.mode.unwrap_or_default();
    let state = BrainState::new(entry.stamp.clone(), mode, entry.created);
    let mut fm = SessionFrontmatter::for_new_session(
        &state,
        &entry.stamp,
        "assisted",
        entry.trajectory.as_deref().unwrap_or(""),
        entry.created,
    );
    fm.status = match entry.status {
        SessionStatus::Active => "active".to_string(),
        SessionStatus::Archived => "archived".to_string(),
    };
    fm.linked_plans = entry.linked_plans.clone();
    tracing::debug!("stamped frontmatter onto {}", file_name);
    session_file::instantiate(&fm, &body)
}

/// Upgrade a legacy flat `.hivemind` directory to the structured layout.
/// No-op (with a reason) when there is nothing to migrate.
pub async fn migrate_if_needed(project_root: &Path, now_ms: i64) -> Result<MigrationResult> {
    if paths::is_new_structure(project_root) {
        return Ok(MigrationResult::skipped("already-new-structure"));
    }
    if !paths::is_legacy_structure(project_root) {
        return Ok(MigrationResult::skipped("not-legacy"));
    }

    let legacy = LegacyPaths::new(project_root);
    let new = HivemindPaths::new(project_root);
    let mut journal = MoveJournal::new();
    let mut moved = Vec::new();

    tracing::info!("legacy .hivemind layout detected, upgrading");

    let outcome = run_migration(&legacy, &new, &mut journal, &mut moved, now_ms).await;
    match outcome {
        Ok(()) => Ok(MigrationResult {
            migrated: true,
            reason: "upgraded".to_string(),
            moved_files: moved,
            errors: Vec::new(),
        }),
        Err(e) => {
            tracing::warn!("migration failed ({e}), rolling back");
            journal.rollback().await;
            Ok(MigrationResult {
                migrated: false,
                reason: "rolled-back".to_string(),
                moved_files: Vec::new(),
                errors: vec![e.to_string()],
            })
        }
    }
}

async fn run_migration(
    legacy: &LegacyPaths,
    new: &HivemindPaths,
    journal: &mut MoveJournal,
    moved: &mut Vec<String>,
    now_ms: i64,
) -> Result<()> {
    new.ensure_directories().await?;

    let known_moves = [
        (legacy.brain.clone(), new.brain.clone()),
        (
            legacy.root.join("brain.json.bak"),
            new.state_dir.join("brain.json.bak"),
        ),
        (legacy.hierarchy.clone(), new.hierarchy.clone()),
        (legacy.anchors.clone(), new.anchors.clone()),
        (legacy.mems.clone(), new.mems.clone()),
    ];
    for (from, to) in &known_moves {
        if journal.perform(from, to).await? {
            moved.push(
                from.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
        }
    }

    migrate_sessions(legacy, new, journal, moved).await?;

    // Loose markdown left in the legacy sessions dir moves to active.
    if legacy.sessions_dir.is_dir() {
        let mut reader = tokio::fs::read_dir(&legacy.sessions_dir).await?;
        while let Some(dirent) = reader.next_entry().await? {
            let name = dirent.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".md") {
                continue;
            }
            let target = new.active_dir.join(&name);
            if journal.perform(&dirent.path(), &target).await? {
                moved.push(name);
            }
        }
    }

    session_file::generate_index(new, now_ms).await?;
    Ok(())
}
