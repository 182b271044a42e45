//! Integration tests over a real `.hivemind` directory: atomic writes,
//! session file lifecycle, and legacy-layout migration end to end.

use hivemind_core::{BrainState, SessionMode};
use hivemind_state::paths::{self, LegacyPaths};
use hivemind_state::session_file::{self, SessionFrontmatter};
use hivemind_state::{
    migrate_if_needed, store, AnchorsState, HivemindPaths, MemsState, NewSessionEntry,
    SessionManifest, SessionStatus, StateManager,
};

async fn layout() -> (tempfile::TempDir, HivemindPaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = HivemindPaths::new(dir.path());
    paths.ensure_directories().await.unwrap();
    (dir, paths)
}

// ===========================================================================
// Store durability
// ===========================================================================

#[tokio::test]
async fn save_keeps_a_backup_of_the_previous_version() {
    let (_dir, paths) = layout().await;

    store::save_json(&paths.brain, &serde_json::json!({"v": 1}))
        .await
        .unwrap();
    store::save_json(&paths.brain, &serde_json::json!({"v": 2}))
        .await
        .unwrap();

    let current: serde_json::Value = store::load_json(&paths.brain).await.unwrap();
    assert_eq!(current["v"], 2);

    let backup = paths.brain.with_extension("json.bak");
    let previous: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&backup).await.unwrap()).unwrap();
    assert_eq!(previous["v"], 1);
}

#[tokio::test]
async fn corrupt_document_degrades_to_none() {
    let (_dir, paths) = layout().await;
    tokio::fs::write(&paths.brain, "{ definitely not json")
        .await
        .unwrap();
    let loaded: Option<BrainState> = store::load_json(&paths.brain).await;
    assert!(loaded.is_none());
}

#[tokio::test]
async fn state_manager_roundtrips_the_brain_document() {
    let dir = tempfile::tempdir().unwrap();
    let manager = StateManager::new(dir.path());

    let mut state = BrainState::new("sess-rt", SessionMode::QuickFix, 1_000);
    state.unlock();
    state.add_file_touched("src/lib.rs");
    manager.save(&state).await.unwrap();

    let loaded = manager.load().await.unwrap();
    assert_eq!(loaded.session.id, "sess-rt");
    assert!(loaded.is_open());
    assert_eq!(loaded.metrics.files_touched, vec!["src/lib.rs"]);
}

// ===========================================================================
// Session files on disk
// ===========================================================================

#[tokio::test]
async fn session_file_roundtrips_frontmatter_and_body() {
    let (_dir, paths) = layout().await;

    let mut state = BrainState::new("sess-f", SessionMode::PlanDriven, 1_700_000_000_000);
    state.unlock();
    let frontmatter = SessionFrontmatter::for_new_session(
        &state,
        "20231114-221320",
        "assisted",
        "Fix login bug",
        1_700_000_000_000,
    );
    let content = session_file::instantiate(&frontmatter, "## Hierarchy\n\nbody here").unwrap();
    let file = paths.active_dir.join("2023-11-14-plan_driven-fix-login-bug.md");
    tokio::fs::write(&file, &content).await.unwrap();

    let raw = tokio::fs::read_to_string(&file).await.unwrap();
    let (parsed, body) = session_file::parse(&raw);
    let parsed = parsed.unwrap();
    assert_eq!(parsed.session_id, "sess-f");
    assert_eq!(parsed.trajectory, "Fix login bug");
    assert_eq!(parsed.governance_status, "OPEN");
    assert!(body.contains("body here"));
}

#[tokio::test]
async fn malformed_frontmatter_preserves_the_body() {
    let (parsed, body) = session_file::parse("no frontmatter here\njust notes");
    assert!(parsed.is_none());
    assert_eq!(body, "no frontmatter here\njust notes");
}

#[tokio::test]
async fn archive_moves_the_file_and_flips_status() {
    let (_dir, paths) = layout().await;

    let state = BrainState::new("sess-a", SessionMode::QuickFix, 1_700_000_000_000);
    let frontmatter = SessionFrontmatter::for_new_session(
        &state,
        "20231114-221320",
        "assisted",
        "archive me",
        1_700_000_000_000,
    );
    let content = session_file::instantiate(&frontmatter, "work log").unwrap();
    let name = "2023-11-14-quick_fix-archive-me.md";
    tokio::fs::write(paths.active_dir.join(name), content)
        .await
        .unwrap();

    session_file::archive_file(&paths, name, 1_700_000_100_000)
        .await
        .unwrap();

    assert!(!paths.active_dir.join(name).exists());
    let raw = tokio::fs::read_to_string(paths.archive_dir.join(name))
        .await
        .unwrap();
    let (parsed, _) = session_file::parse(&raw);
    assert_eq!(parsed.unwrap().status, "archived");
}

// ===========================================================================
// Anchors and mems on disk
// ===========================================================================

#[tokio::test]
async fn anchors_and_mems_survive_reload() {
    let (_dir, paths) = layout().await;

    let mut anchors = AnchorsState::default();
    anchors.upsert("lang", "Rust", "sess-1", 1_000);
    anchors.save(&paths).await.unwrap();

    let mut mems = MemsState::default();
    mems.add("decisions", "use tokio for IO", vec!["async".into()], "sess-1", 1_000);
    mems.save(&paths).await.unwrap();

    let anchors = AnchorsState::load(&paths).await;
    assert_eq!(anchors.find("lang").unwrap().value, "Rust");

    let mems = MemsState::load(&paths).await;
    assert_eq!(mems.search("tokio", Some("decisions")).len(), 1);
}

// ===========================================================================
// Legacy migration
// ===========================================================================

#[tokio::test]
async fn legacy_layout_migrates_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = LegacyPaths::new(dir.path());
    tokio::fs::create_dir_all(&legacy.sessions_dir).await.unwrap();

    let brain = BrainState::new("sess-legacy", SessionMode::PlanDriven, 1_000);
    tokio::fs::write(&legacy.brain, serde_json::to_string(&brain).unwrap())
        .await
        .unwrap();
    tokio::fs::write(&legacy.anchors, r#"{"anchors":[]}"#)
        .await
        .unwrap();
    // A cryptic legacy session file plus a manifest entry for it.
    tokio::fs::write(legacy.sessions_dir.join("20240101-120000.md"), "old notes")
        .await
        .unwrap();
    let manifest = serde_json::json!({
        "sessions": [{
            "stamp": "20240101-120000",
            "file": "20240101-120000.md",
            "status": "active",
            "created": 1_704_110_400_000i64
        }],
        "active_stamp": "20240101-120000"
    });
    tokio::fs::write(&legacy.sessions_manifest, manifest.to_string())
        .await
        .unwrap();

    assert!(paths::is_legacy_structure(dir.path()));

    let result = migrate_if_needed(dir.path(), 1_704_200_000_000).await.unwrap();
    assert!(result.migrated);
    assert!(result.errors.is_empty());
    assert!(!result.moved_files.is_empty());

    let new = HivemindPaths::new(dir.path());
    assert!(paths::is_new_structure(dir.path()));
    assert!(new.brain.is_file());
    assert!(!legacy.brain.exists());

    // The migrated session file got a human-readable name and frontmatter.
    let manifest = SessionManifest::load(&new).await;
    let entry = manifest.find("20240101-120000").unwrap();
    assert!(entry.file.starts_with("2024-01-01-"));
    let raw = tokio::fs::read_to_string(new.active_dir.join(&entry.file))
        .await
        .unwrap();
    let (frontmatter, body) = session_file::parse(&raw);
    assert!(frontmatter.is_some());
    assert!(body.contains("old notes"));
}

#[tokio::test]
async fn migration_skips_a_current_layout() {
    let (dir, _paths) = layout().await;
    let result = migrate_if_needed(dir.path(), 1_000).await.unwrap();
    assert!(!result.migrated);
    assert_eq!(result.reason, "already-new-structure");
}

// ===========================================================================
// Manifest plus register/archive against the store
// ===========================================================================

#[tokio::test]
async fn manifest_register_then_archive_persists() {
    let (_dir, paths) = layout().await;

    let mut manifest = SessionManifest::load(&paths).await;
    manifest.register(NewSessionEntry {
        stamp: "20240101-120000".into(),
        file: "2024-01-01-plan_driven-goal.md".into(),
        created: 1_000,
        mode: Some(SessionMode::PlanDriven),
        trajectory: Some("Goal".into()),
        linked_plans: Vec::new(),
    });
    manifest.save(&paths).await.unwrap();

    let mut manifest = SessionManifest::load(&paths).await;
    assert!(manifest.active_entry().is_some());
    manifest.archive("20240101-120000");
    manifest.save(&paths).await.unwrap();

    let manifest = SessionManifest::load(&paths).await;
    assert!(manifest.active_entry().is_none());
    assert_eq!(
        manifest.find("20240101-120000").unwrap().status,
        SessionStatus::Archived
    );
}
