//! Full-lifecycle integration tests: the session operations and the
//! inspection surfaces working against one real `.hivemind` directory.

use hivemind_core::{HierarchyLevel, SessionMode};
use hivemind_session::{inspect, InspectAction, SessionService};
use hivemind_state::{AnchorsState, HivemindPaths, SessionManifest, StateManager};
use serde_json::Value;

async fn service() -> (tempfile::TempDir, SessionService) {
    let dir = tempfile::tempdir().unwrap();
    let service = SessionService::new(dir.path());
    (dir, service)
}

fn data(out: &str) -> Value {
    let parsed: Value = serde_json::from_str(out).unwrap();
    parsed["data"].clone()
}

// ===========================================================================
// One session, start to finish
// ===========================================================================

#[tokio::test]
async fn a_session_runs_from_start_to_archive() {
    let (dir, service) = service().await;

    let out = service
        .start(SessionMode::PlanDriven, "Build auth system", true)
        .await
        .unwrap();
    assert_eq!(data(&out)["governanceStatus"], "OPEN");

    service
        .update(HierarchyLevel::Tactic, "JWT validation", false)
        .await
        .unwrap();
    let out = service
        .update(HierarchyLevel::Action, "Write middleware", true)
        .await
        .unwrap();
    assert_eq!(data(&out)["trajectory"], "Build auth system");
    assert_eq!(data(&out)["action"], "Write middleware");

    // Scan sees the three-node tree.
    let out = inspect(dir.path(), InspectAction::Scan, true).await.unwrap();
    assert_eq!(data(&out)["treeStats"]["totalNodes"], 3);
    assert_eq!(data(&out)["treeStats"]["depth"], 3);

    // The active session file tracks the hierarchy.
    let paths = HivemindPaths::new(dir.path());
    let manifest = SessionManifest::load(&paths).await;
    let file = manifest.active_entry().unwrap().file.clone();
    let raw = tokio::fs::read_to_string(paths.active_dir.join(&file))
        .await
        .unwrap();
    assert!(raw.contains("tactic: JWT validation"));
    assert!(raw.contains("## Hierarchy"));

    let out = service.close(Some("auth shipped"), true).await.unwrap();
    assert_eq!(data(&out)["summary"], "auth shipped");
    assert_eq!(data(&out)["archivesCount"], 1);

    // Post-close: fresh LOCKED state, archived file, exports written.
    let out = service.status(true).await.unwrap();
    assert_eq!(data(&out)["session"]["governanceStatus"], "LOCKED");

    let manifest = SessionManifest::load(&paths).await;
    assert!(manifest.active_entry().is_none());
    assert!(paths.archive_dir.join(&file).is_file());
}

#[tokio::test]
async fn close_export_snapshots_the_session() {
    let (dir, service) = service().await;
    service
        .start(SessionMode::QuickFix, "Fix login bug", false)
        .await
        .unwrap();
    service
        .update(HierarchyLevel::Tactic, "Add validation", false)
        .await
        .unwrap();
    service.close(Some("validated"), false).await.unwrap();

    let paths = HivemindPaths::new(dir.path());
    let mut reader = tokio::fs::read_dir(&paths.exports_dir).await.unwrap();
    let mut md = None;
    let mut json = None;
    while let Some(entry) = reader.next_entry().await.unwrap() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".md") {
            md = Some(entry.path());
        } else if name.ends_with(".json") {
            json = Some(entry.path());
        }
    }

    let md = tokio::fs::read_to_string(md.unwrap()).await.unwrap();
    assert!(md.contains("## Metadata"));
    assert!(md.contains("**Tactic**: Add validation"));
    assert!(md.contains("validated"));

    let json = tokio::fs::read_to_string(json.unwrap()).await.unwrap();
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["mode"], "quick_fix");
    assert_eq!(parsed["summary"], "validated");
    assert_eq!(parsed["hierarchy"]["tactic"], "Add validation");
}

// ===========================================================================
// Inspection surfaces with anchors in play
// ===========================================================================

#[tokio::test]
async fn drift_report_lists_anchor_compliance() {
    let (dir, service) = service().await;
    service
        .start(SessionMode::PlanDriven, "Build auth system", false)
        .await
        .unwrap();

    let paths = HivemindPaths::new(dir.path());
    let state = StateManager::new(dir.path()).load().await.unwrap();
    let mut anchors = AnchorsState::load(&paths).await;
    anchors.upsert("no-deps", "do not add new dependencies", &state.session.id, 1_000);
    anchors.save(&paths).await.unwrap();

    let report = inspect(dir.path(), InspectAction::Drift, false)
        .await
        .unwrap();
    assert!(report.contains("## Anchor Compliance"));
    assert!(report.contains("[ ] [no-deps]: do not add new dependencies"));
    assert!(report.contains("OK hierarchy chain is intact."));

    let out = inspect(dir.path(), InspectAction::Drift, true).await.unwrap();
    assert_eq!(data(&out)["driftScore"], 100);
    assert_eq!(data(&out)["anchors"][0]["key"], "no-deps");
}

#[tokio::test]
async fn deep_report_stays_within_context_budget() {
    let (dir, service) = service().await;
    service
        .start(
            SessionMode::Exploration,
            &"investigate a very long focus statement ".repeat(5),
            false,
        )
        .await
        .unwrap();
    for i in 0..8 {
        service
            .update(
                HierarchyLevel::Tactic,
                &format!("tactic number {i} with plenty of descriptive text attached"),
                false,
            )
            .await
            .unwrap();
    }

    let report = inspect(dir.path(), InspectAction::Deep, false).await.unwrap();
    assert!(report.len() <= 2_001);
    assert!(report.contains("DEEP INSPECT"));
}

// ===========================================================================
// Lifecycle guard rails
// ===========================================================================

#[tokio::test]
async fn operations_without_a_session_return_guidance_not_errors() {
    let (dir, service) = service().await;

    assert!(service
        .update(HierarchyLevel::Tactic, "x", false)
        .await
        .unwrap()
        .contains("No active session"));
    assert!(service.close(None, false).await.unwrap().contains("No active session"));
    assert!(service.prune(false).await.unwrap().contains("No active session"));
    assert!(inspect(dir.path(), InspectAction::Scan, false)
        .await
        .unwrap()
        .contains("No active session"));
}

#[tokio::test]
async fn migrate_via_service_reports_skip_reasons() {
    let (_dir, service) = service().await;
    let out = service.migrate(true).await.unwrap();
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["data"]["migrated"], false);
    assert_eq!(parsed["data"]["reason"], "not-legacy");

    service
        .start(SessionMode::QuickFix, "work", false)
        .await
        .unwrap();
    let out = service.migrate(false).await.unwrap();
    assert!(out.contains("already-new-structure"));
}
