//! The session state machine: `(none) -> OPEN -> ... -> LOCKED(fresh)`.
//!
//! Every operation follows read-modify-write against the state store.
//! Validation and missing-session conditions come back as guidance in
//! the response, never as errors; only primary persistence failures
//! propagate.

use crate::export;
use crate::outcome::Outcome;
use hivemind_core::{
    generate_session_id, generate_stamp, now_ms, BrainState, GovernanceConfig, HierarchyLevel,
    NodeStatus, Result, SessionMode,
};
use hivemind_engine::drift;
use hivemind_hierarchy::{persist, render, tree::HierarchyNode, HierarchyTree};
use hivemind_state::{
    migrate_if_needed, session_file, session_file::SessionFrontmatter, AnchorsState,
    HivemindPaths, NewSessionEntry, SessionManifest, StateManager,
};
use serde_json::json;
use std::path::{Path, PathBuf};

pub struct SessionService {
    root: PathBuf,
    paths: HivemindPaths,
    manager: StateManager,
    config: GovernanceConfig,
}

impl SessionService {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let paths = HivemindPaths::new(&root);
        let config = GovernanceConfig::load(&paths.config);
        Self {
            manager: StateManager::new(&root),
            root,
            paths,
            config,
        }
    }

    pub fn paths(&self) -> &HivemindPaths {
        &self.paths
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Open a new session. Non-fatal when one is already open: returns
    /// the current session info with guidance instead.
    pub async fn start(&self, mode: SessionMode, focus: &str, json: bool) -> Result<String> {
        let now = now_ms();

        if focus.trim().is_empty() {
            return Ok(if json {
                Outcome::rejected("start", json!({"error": "focus required"}), now).to_json()
            } else {
                "ERROR: focus is required. What are you working on?".to_string()
            });
        }

        if let Some(existing) = self.manager.load().await {
            if existing.is_open() {
                return Ok(if json {
                    Outcome::rejected(
                        "start",
                        json!({
                            "error": "session already active",
                            "sessionId": existing.session.id,
                            "focus": existing.hierarchy.trajectory,
                        }),
                        now,
                    )
                    .to_json()
                } else {
                    format!(
                        "Session already active: {} (focus: {}).\n\
                         Use hivemind_session update to refine focus, or close to archive first.",
                        existing.session.id, existing.hierarchy.trajectory
                    )
                });
            }
        }

        self.paths.ensure_directories().await?;

        let session_id = generate_session_id();
        let stamp = generate_stamp(now);
        let mut state = BrainState::new(session_id.clone(), mode, now);
        state.unlock();

        let mut tree = HierarchyTree::new();
        tree.set_root(HierarchyNode::new(
            HierarchyLevel::Trajectory,
            focus,
            NodeStatus::Active,
            now,
        ))?;
        persist::save_tree(&self.paths, &tree).await?;

        state.hierarchy = tree.to_brain_projection();
        self.manager.save(&state).await?;

        let file_name =
            hivemind_state::paths::build_session_filename(now, mode.as_str(), focus);
        let frontmatter = SessionFrontmatter::for_new_session(
            &state,
            &stamp,
            self.config.governance_mode.as_str(),
            focus,
            now,
        );
        let content = session_file::instantiate(&frontmatter, &render::to_session_body(&tree))?;
        tokio::fs::write(self.paths.active_dir.join(&file_name), content).await?;

        let mut manifest = SessionManifest::load(&self.paths).await;
        manifest.register(NewSessionEntry {
            stamp: stamp.clone(),
            file: file_name,
            created: now,
            mode: Some(mode),
            trajectory: Some(focus.to_string()),
            linked_plans: Vec::new(),
        });
        manifest.save(&self.paths).await?;

        AnchorsState::default().save(&self.paths).await?;
        self.regenerate_index(now).await;

        tracing::info!(session = %session_id, %mode, "session started");

        Ok(if json {
            Outcome::ok(
                "start",
                json!({
                    "sessionId": session_id,
                    "mode": mode.as_str(),
                    "focus": focus,
                    "governanceStatus": "OPEN",
                }),
                now,
            )
            .to_json()
        } else {
            format!(
                "Session started: {session_id}\nMode: {mode}\nFocus: {focus}\nStatus: OPEN\n\
                 -> Use hivemind_session update to refine focus as you work."
            )
        })
    }

    /// Refocus at a hierarchy level (default tactic at the caller).
    pub async fn update(
        &self,
        level: HierarchyLevel,
        content: &str,
        json: bool,
    ) -> Result<String> {
        let now = now_ms();
        let Some(mut state) = self.manager.load().await else {
            return Ok(no_active_session("update", json, now));
        };
        if content.trim().is_empty() {
            return Ok(if json {
                Outcome::rejected("update", json!({"error": "content required"}), now).to_json()
            } else {
                "ERROR: content is required. What is the new focus?".to_string()
            });
        }

        let mut tree = persist::load_tree(&self.paths).await;
        if tree.is_empty() && !state.hierarchy.trajectory.is_empty() {
            // Pre-tree document; rebuild the tree from the flat strings.
            tree = HierarchyTree::migrate_from_flat(&state.hierarchy, now)?;
        }

        if let Err(e) = tree.apply_update(level, content, now) {
            return Ok(if json {
                Outcome::rejected("update", json!({"error": e.to_string()}), now).to_json()
            } else {
                format!("ERROR: {e}")
            });
        }
        persist::save_tree(&self.paths, &tree).await?;

        state.hierarchy = tree.to_brain_projection();
        state.metrics.context_updates += 1;
        state.metrics.drift_score = drift::calculate_drift_score(&state);
        state.touch(now);
        self.manager.save(&state).await?;

        self.refresh_active_file(&state, &tree, now).await;

        Ok(if json {
            Outcome::ok(
                "update",
                json!({
                    "level": level.as_str(),
                    "content": content,
                    "trajectory": state.hierarchy.trajectory,
                    "tactic": state.hierarchy.tactic,
                    "action": state.hierarchy.action,
                    "contextUpdates": state.metrics.context_updates,
                }),
                now,
            )
            .to_json()
        } else {
            let mut lines = vec![
                format!("Context updated at [{level}] level."),
                String::new(),
                "Current hierarchy:".to_string(),
            ];
            if !state.hierarchy.trajectory.is_empty() {
                lines.push(format!("  Trajectory: {}", state.hierarchy.trajectory));
            }
            if !state.hierarchy.tactic.is_empty() {
                lines.push(format!("  Tactic: {}", state.hierarchy.tactic));
            }
            if !state.hierarchy.action.is_empty() {
                lines.push(format!("  Action: {}", state.hierarchy.action));
            }
            lines.push(String::new());
            lines.push(format!("Context updates: {}", state.metrics.context_updates));
            lines.push("-> Use hivemind_inspect drift to verify alignment.".to_string());
            lines.join("\n")
        })
    }

    /// Archive the session, export a snapshot, and leave a fresh LOCKED
    /// state behind.
    pub async fn close(&self, summary: Option<&str>, json: bool) -> Result<String> {
        let now = now_ms();
        let Some(state) = self.manager.load().await else {
            return Ok(no_active_session("close", json, now));
        };

        let session_id = state.session.id.clone();
        let duration_ms = now - state.session.start_time;
        let summary_line = summary.map(str::to_string).unwrap_or_else(|| {
            format!(
                "Session {session_id}: {} turns, {} files",
                state.metrics.turn_count,
                state.metrics.files_touched.len()
            )
        });

        let mut manifest = SessionManifest::load(&self.paths).await;
        let active_file = manifest.active_entry().map(|e| e.file.clone());
        let active_stamp = manifest.active_stamp.clone();

        let body = match &active_file {
            Some(file) => {
                let raw = tokio::fs::read_to_string(self.paths.active_dir.join(file))
                    .await
                    .unwrap_or_default();
                session_file::parse(&raw).1
            }
            None => String::new(),
        };

        // Export is best-effort: close succeeds even when it fails.
        if let Err(e) = self.write_export(&state, &summary_line, &body, now).await {
            tracing::warn!("session export failed: {e}");
        }

        if let Some(file) = &active_file {
            session_file::archive_file(&self.paths, file, now).await?;
        }
        if let Some(stamp) = &active_stamp {
            manifest.archive(stamp);
            manifest.save(&self.paths).await?;
        }

        let mut tree = persist::load_tree(&self.paths).await;
        tree.root = None;
        tree.cursor = None;
        persist::save_tree(&self.paths, &tree).await?;

        let fresh = BrainState::new(generate_session_id(), state.session.mode, now);
        self.manager.save(&fresh).await?;
        self.regenerate_index(now).await;

        let archives = self.count_archives().await;
        tracing::info!(session = %session_id, "session closed");

        Ok(if json {
            Outcome::ok(
                "close",
                json!({
                    "sessionId": session_id,
                    "durationMs": duration_ms,
                    "durationMinutes": duration_ms / 60_000,
                    "turnCount": state.metrics.turn_count,
                    "filesTouched": state.metrics.files_touched.len(),
                    "contextUpdates": state.metrics.context_updates,
                    "archivesCount": archives,
                    "summary": summary_line,
                }),
                now,
            )
            .to_json()
        } else {
            format!(
                "Session closed: {session_id}\n\n## Summary\n{summary_line}\n\n## Stats\n\
                 Duration: ~{} minutes\nTurns: {}\nFiles: {}\nArchives: {}\n\n\
                 -> Session is now LOCKED. Use hivemind_session start to begin new work.",
                duration_ms / 60_000,
                state.metrics.turn_count,
                state.metrics.files_touched.len(),
                archives,
            )
        })
    }

    /// Pure read of the current session.
    pub async fn status(&self, json: bool) -> Result<String> {
        let now = now_ms();
        let Some(state) = self.manager.load().await else {
            return Ok(if json {
                Outcome::ok("status", json!({"active": false, "session": null}), now).to_json()
            } else {
                "No active session. Use hivemind_session start to begin.".to_string()
            });
        };

        let duration_min = (now - state.session.start_time) / 60_000;
        Ok(if json {
            Outcome::ok(
                "status",
                json!({
                    "active": true,
                    "session": {
                        "id": state.session.id,
                        "mode": state.session.mode.as_str(),
                        "governanceStatus": state.session.governance_status.to_string(),
                        "durationMinutes": duration_min,
                    },
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
                        "violations": state.metrics.violation_count,
                    },
                }),
                now,
            )
            .to_json()
        } else {
            let mut lines = vec![
                "=== SESSION STATUS ===".to_string(),
                String::new(),
                format!("ID: {}", state.session.id),
                format!("Mode: {}", state.session.mode),
                format!("Status: {}", state.session.governance_status),
                format!("Duration: ~{duration_min} min"),
                String::new(),
                "## Hierarchy".to_string(),
            ];
            if !state.hierarchy.trajectory.is_empty() {
                lines.push(format!("Trajectory: {}", state.hierarchy.trajectory));
            }
            if !state.hierarchy.tactic.is_empty() {
                lines.push(format!("Tactic: {}", state.hierarchy.tactic));
            }
            if !state.hierarchy.action.is_empty() {
                lines.push(format!("Action: {}", state.hierarchy.action));
            }
            lines.push(String::new());
            lines.push("## Metrics".to_string());
            lines.push(format!("Turns: {}", state.metrics.turn_count));
            lines.push(format!("Drift: {}/100", state.metrics.drift_score));
            lines.push(format!("Files: {}", state.metrics.files_touched.len()));
            lines.push(format!(
                "Context updates: {}",
                state.metrics.context_updates
            ));
            if state.metrics.violation_count > 0 {
                lines.push(format!("Violations: {}", state.metrics.violation_count));
            }
            lines.push(String::new());
            lines.push("=== END STATUS ===".to_string());
            lines.join("\n")
        })
    }

    /// Best-effort reopen. Without an id, lists what could be resumed.
    /// With one, starts a fresh unlocked session; true state restoration
    /// from an archive is not implemented.
    pub async fn resume(&self, session_id: Option<&str>, json: bool) -> Result<String> {
        let now = now_ms();

        let Some(from_id) = session_id else {
            let archives = self.count_archives().await;
            return Ok(if json {
                Outcome::ok(
                    "resume",
                    json!({
                        "suggestion": "provide sessionId",
                        "availableCount": archives,
                    }),
                    now,
                )
                .to_json()
            } else if archives == 0 {
                "No archived sessions found. Use hivemind_session start to begin a new session."
                    .to_string()
            } else {
                format!(
                    "Archived sessions available: {archives}\n\
                     Use hivemind_session resume <sessionId>, or start for fresh work."
                )
            });
        };

        if let Some(existing) = self.manager.load().await {
            if existing.is_open() {
                return Ok(if json {
                    Outcome::rejected(
                        "resume",
                        json!({"error": "session already active", "sessionId": existing.session.id}),
                        now,
                    )
                    .to_json()
                } else {
                    format!(
                        "Session already active: {}. Close it first with hivemind_session close.",
                        existing.session.id
                    )
                });
            }
        }

        self.paths.ensure_directories().await?;
        let new_id = generate_session_id();
        let mut state = BrainState::new(new_id.clone(), SessionMode::PlanDriven, now);
        state.unlock();
        self.manager.save(&state).await?;

        tracing::info!(session = %new_id, from = %from_id, "session resumed (fresh state)");

        Ok(if json {
            Outcome::ok(
                "resume",
                json!({
                    "sessionId": new_id,
                    "fromSession": from_id,
                    "mode": "plan_driven",
                    "restored": true,
                    "note": "started new session; full restore from archive is not implemented",
                }),
                now,
            )
            .to_json()
        } else {
            format!(
                "Session resumed with new ID: {new_id}\n(Based on archive: {from_id})\n\n\
                 Note: this started a fresh session; archived state was not restored.\n\
                 -> Use hivemind_session status to verify, update to change focus."
            )
        })
    }

    /// Collapse fully-completed subtrees into summary lines.
    pub async fn prune(&self, json: bool) -> Result<String> {
        let now = now_ms();
        let Some(mut state) = self.manager.load().await else {
            return Ok(no_active_session("prune", json, now));
        };

        let mut tree = persist::load_tree(&self.paths).await;
        let outcome = tree.prune_completed();
        persist::save_tree(&self.paths, &tree).await?;

        state.hierarchy = tree.to_brain_projection();
        state.touch(now);
        self.manager.save(&state).await?;
        self.refresh_active_file(&state, &tree, now).await;

        Ok(if json {
            Outcome::ok(
                "prune",
                json!({
                    "pruned": outcome.pruned,
                    "summaries": outcome.summaries,
                    "remainingNodes": tree.stats().total_nodes,
                }),
                now,
            )
            .to_json()
        } else if outcome.pruned == 0 {
            "Nothing to prune: no fully-completed subtrees.".to_string()
        } else {
            let mut lines = vec![format!("Pruned {} completed node(s):", outcome.pruned)];
            for summary in &outcome.summaries {
                lines.push(format!("  - {summary}"));
            }
            lines.push(format!(
                "Remaining nodes: {}",
                tree.stats().total_nodes
            ));
            lines.join("\n")
        })
    }

    /// Upgrade a legacy flat `.hivemind` layout in place.
    pub async fn migrate(&self, json: bool) -> Result<String> {
        let now = now_ms();
        let result = migrate_if_needed(&self.root, now).await?;

        Ok(if json {
            Outcome::ok(
                "migrate",
                json!({
                    "migrated": result.migrated,
                    "reason": result.reason,
                    "movedFiles": result.moved_files,
                    "errors": result.errors,
                }),
                now,
            )
            .to_json()
        } else if result.migrated {
            format!(
                "Migration complete: {} file(s) moved.\n{}",
                result.moved_files.len(),
                result
                    .moved_files
                    .iter()
                    .map(|f| format!("  - {f}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        } else {
            format!("No migration needed ({}).", result.reason)
        })
    }

    async fn write_export(
        &self,
        state: &BrainState,
        summary: &str,
        body: &str,
        now: i64,
    ) -> Result<()> {
        tokio::fs::create_dir_all(&self.paths.exports_dir).await?;
        let data = export::export_data(state, summary);
        let date = chrono::DateTime::from_timestamp_millis(now)
            .unwrap_or_else(chrono::Utc::now)
            .format("%Y-%m-%d");
        let base = format!("session_{date}_{}", state.session.id);
        tokio::fs::write(
            self.paths.exports_dir.join(format!("{base}.json")),
            export::json_export(&data),
        )
        .await?;
        tokio::fs::write(
            self.paths.exports_dir.join(format!("{base}.md")),
            export::markdown_export(&data, body),
        )
        .await?;
        Ok(())
    }

    /// Session file and index refreshes are derived artifacts; failure
    /// warns and moves on.
    async fn refresh_active_file(&self, state: &BrainState, tree: &HierarchyTree, now: i64) {
        let manifest = SessionManifest::load(&self.paths).await;
        if let Some(entry) = manifest.active_entry() {
            let body = render::to_session_body(tree);
            if let Err(e) =
                session_file::update_active_file(&self.paths, &entry.file, state, &body, now).await
            {
                tracing::warn!("active session file refresh failed: {e}");
            }
        }
        self.regenerate_index(now).await;
    }

    async fn regenerate_index(&self, now: i64) {
        if let Err(e) = session_file::generate_index(&self.paths, now).await {
            tracing::warn!("index regeneration failed: {e}");
        }
    }

    async fn count_archives(&self) -> usize {
        let Ok(mut reader) = tokio::fs::read_dir(&self.paths.archive_dir).await else {
            return 0;
        };
        let mut count = 0;
        while let Ok(Some(entry)) = reader.next_entry().await {
            if entry.file_name().to_string_lossy().ends_with(".md") {
                count += 1;
            }
        }
        count
    }
}

fn no_active_session(action: &str, json: bool, now: i64) -> String {
    if json {
        Outcome::rejected(
            action,
            json!({"error": "no active session", "active": false}),
            now,
        )
        .to_json()
    } else {
        "ERROR: No active session. Use hivemind_session start to begin.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn service() -> (tempfile::TempDir, SessionService) {
        let dir = tempfile::tempdir().unwrap();
        let service = SessionService::new(dir.path());
        (dir, service)
    }

    #[tokio::test]
    async fn start_builds_tree_state_and_manifest() {
        let (_dir, service) = service().await;
        let out = service
            .start(SessionMode::QuickFix, "Fix login bug", true)
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["data"]["focus"], "Fix login bug");

        let state = StateManager::new(service.paths().root.parent().unwrap())
            .load()
            .await
            .unwrap();
        assert!(state.is_open());
        assert_eq!(state.hierarchy.trajectory, "Fix login bug");

        let tree = persist::load_tree(service.paths()).await;
        let root = tree.root.as_ref().unwrap();
        assert_eq!(root.level, HierarchyLevel::Trajectory);
        assert_eq!(root.content, "Fix login bug");
        assert_eq!(root.status, NodeStatus::Active);

        let manifest = SessionManifest::load(service.paths()).await;
        assert!(manifest.active_entry().is_some());
    }

    #[tokio::test]
    async fn start_twice_is_rejected_not_fatal() {
        let (_dir, service) = service().await;
        service
            .start(SessionMode::PlanDriven, "First", false)
            .await
            .unwrap();
        let second = service
            .start(SessionMode::PlanDriven, "Second", false)
            .await
            .unwrap();
        assert!(second.contains("already active"));
    }

    #[tokio::test]
    async fn update_keeps_projection_in_lockstep_with_tree() {
        let (_dir, service) = service().await;
        service
            .start(SessionMode::PlanDriven, "Fix login bug", false)
            .await
            .unwrap();
        service
            .update(HierarchyLevel::Tactic, "Add validation", false)
            .await
            .unwrap();
        service
            .update(HierarchyLevel::Action, "Write unit test", false)
            .await
            .unwrap();

        let tree = persist::load_tree(service.paths()).await;
        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.depth, 3);

        let state = service.manager.load().await.unwrap();
        assert_eq!(state.hierarchy, tree.to_brain_projection());
        assert_eq!(state.metrics.context_updates, 2);
    }

    #[tokio::test]
    async fn update_without_session_returns_guidance() {
        let (_dir, service) = service().await;
        let out = service
            .update(HierarchyLevel::Tactic, "anything", false)
            .await
            .unwrap();
        assert!(out.contains("No active session"));
    }

    #[tokio::test]
    async fn close_leaves_fresh_locked_state_and_archive() {
        let (_dir, service) = service().await;
        service
            .start(SessionMode::QuickFix, "Fix login bug", false)
            .await
            .unwrap();
        let out = service.close(Some("done"), true).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["data"]["summary"], "done");
        assert_eq!(parsed["data"]["archivesCount"], 1);

        let state = service.manager.load().await.unwrap();
        assert!(!state.is_open());
        assert_eq!(state.metrics.turn_count, 0);
        assert!(state.hierarchy.is_empty());

        let tree = persist::load_tree(service.paths()).await;
        assert!(tree.is_empty());

        // Export snapshot written next to the archive.
        let mut exports = tokio::fs::read_dir(&service.paths().exports_dir)
            .await
            .unwrap();
        let mut names = Vec::new();
        while let Some(e) = exports.next_entry().await.unwrap() {
            names.push(e.file_name().to_string_lossy().into_owned());
        }
        assert!(names.iter().any(|n| n.ends_with(".json")));
        assert!(names.iter().any(|n| n.ends_with(".md")));
    }

    #[tokio::test]
    async fn status_after_close_reports_inactive_session() {
        let (_dir, service) = service().await;
        service
            .start(SessionMode::Exploration, "Spike", false)
            .await
            .unwrap();
        service.close(None, false).await.unwrap();

        let out = service.status(true).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["data"]["session"]["governanceStatus"], "LOCKED");
        assert_eq!(parsed["data"]["metrics"]["turnCount"], 0);
    }

    #[tokio::test]
    async fn prune_reports_summaries() {
        let (_dir, service) = service().await;
        service
            .start(SessionMode::PlanDriven, "Goal", false)
            .await
            .unwrap();
        service
            .update(HierarchyLevel::Tactic, "done work", false)
            .await
            .unwrap();

        // Mark the tactic complete directly in the persisted tree.
        let mut tree = persist::load_tree(service.paths()).await;
        tree.root.as_mut().unwrap().children[0].status = NodeStatus::Complete;
        persist::save_tree(service.paths(), &tree).await.unwrap();

        let out = service.prune(true).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["data"]["pruned"], 1);
        assert!(parsed["data"]["summaries"][0]
            .as_str()
            .unwrap()
            .contains("done work"));
    }

    #[tokio::test]
    async fn resume_without_id_lists_archives() {
        let (_dir, service) = service().await;
        let out = service.resume(None, false).await.unwrap();
        assert!(out.contains("No archived sessions"));

        service
            .start(SessionMode::QuickFix, "work", false)
            .await
            .unwrap();
        service.close(None, false).await.unwrap();
        let out = service.resume(None, false).await.unwrap();
        assert!(out.contains("Archived sessions available: 1"));
    }

    #[tokio::test]
    async fn resume_with_id_starts_fresh_open_session() {
        let (_dir, service) = service().await;
        service
            .start(SessionMode::QuickFix, "work", false)
            .await
            .unwrap();
        service.close(None, false).await.unwrap();

        let out = service.resume(Some("sess-old"), false).await.unwrap();
        assert!(out.contains("resumed with new ID"));
        let state = service.manager.load().await.unwrap();
        assert!(state.is_open());
    }
}
