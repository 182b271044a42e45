//! Session manifest: the ledger of every session file ever created.
//!
//! The manifest enforces the single-active invariant: registering a new
//! session archives whatever was active before it. Historic manifests
//! written by older versions can contain duplicate stamps; `deduplicate`
//! repairs them by merging.

use crate::paths::HivemindPaths;
use crate::store;
use hivemind_core::{Result, SessionMode};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Archived,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionManifestEntry {
    pub stamp: String,
    pub file: String,
    pub status: SessionStatus,
    pub created: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SessionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trajectory: Option<String>,
    #[serde(default)]
    pub linked_plans: Vec<String>,
}

/// What a caller supplies when registering; everything else is derived.
#[derive(Clone, Debug, Default)]
pub struct NewSessionEntry {
    pub stamp: String,
    pub file: String,
    pub created: i64,
    pub mode: Option<SessionMode>,
    pub trajectory: Option<String>,
    pub linked_plans: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionManifest {
    #[serde(default)]
    pub sessions: Vec<SessionManifestEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_stamp: Option<String>,
}

impl SessionManifest {
    pub async fn load(paths: &HivemindPaths) -> Self {
        store::load_json(&paths.sessions_manifest)
            .await
            .unwrap_or_default()
    }

    pub async fn save(&self, paths: &HivemindPaths) -> Result<()> {
        store::save_json(&paths.sessions_manifest, self).await
    }

    pub fn active_entry(&self) -> Option<&SessionManifestEntry> {
        let stamp = self.active_stamp.as_deref()?;
        self.sessions.iter().find(|s| s.stamp == stamp)
    }

    pub fn find(&self, stamp: &str) -> Option<&SessionManifestEntry> {
        self.sessions.iter().find(|s| s.stamp == stamp)
    }

    /// Upsert a session entry and make it the active one. A re-register
    /// of an existing stamp updates in place (file rename, new plan
    /// links); any other active entry is archived.
    pub fn register(&mut self, new: NewSessionEntry) {
        for entry in &mut self.sessions {
            if entry.status == SessionStatus::Active && entry.stamp != new.stamp {
                entry.status = SessionStatus::Archived;
            }
        }

        if let Some(existing) = self.sessions.iter_mut().find(|s| s.stamp == new.stamp) {
            existing.file = new.file;
            existing.status = SessionStatus::Active;
            if new.mode.is_some() {
                existing.mode = new.mode;
            }
            if new.trajectory.is_some() {
                existing.trajectory = new.trajectory;
            }
            for plan in new.linked_plans {
                if !existing.linked_plans.contains(&plan) {
                    existing.linked_plans.push(plan);
                }
            }
        } else {
            self.sessions.push(SessionManifestEntry {
                stamp: new.stamp.clone(),
                file: new.file,
                status: SessionStatus::Active,
                created: new.created,
                mode: new.mode,
                trajectory: new.trajectory,
                linked_plans: new.linked_plans,
            });
        }
        self.active_stamp = Some(new.stamp);
    }

    /// Mark a session archived; clears the active stamp if it pointed at
    /// this entry.
    pub fn archive(&mut self, stamp: &str) {
        if let Some(entry) = self.sessions.iter_mut().find(|s| s.stamp == stamp) {
            entry.status = SessionStatus::Archived;
        }
        if self.active_stamp.as_deref() == Some(stamp) {
            self.active_stamp = None;
        }
    }

    /// Merge duplicate stamps: keep the first occurrence, union its
    /// linked plans, and collapse to at most one active entry (the one
    /// named by `active_stamp` wins, otherwise the first active seen).
    pub fn deduplicate(&mut self) {
        let mut merged: Vec<SessionManifestEntry> = Vec::with_capacity(self.sessions.len());
        for entry in self.sessions.drain(..) {
            match merged.iter_mut().find(|m| m.stamp == entry.stamp) {
                Some(existing) => {
                    if entry.status == SessionStatus::Active {
                        existing.status = SessionStatus::Active;
                    }
                    for plan in entry.linked_plans {
                        if !existing.linked_plans.contains(&plan) {
                            existing.linked_plans.push(plan);
                        }
                    }
                    if existing.mode.is_none() {
                        existing.mode = entry.mode;
                    }
                    if existing.trajectory.is_none() {
                        existing.trajectory = entry.trajectory;
                    }
                }
                None => merged.push(entry),
            }
        }
        self.sessions = merged;

        let keep = self
            .active_stamp
            .clone()
            .filter(|s| self.sessions.iter().any(|e| e.stamp == *s))
            .or_else(|| {
                self.sessions
                    .iter()
                    .find(|e| e.status == SessionStatus::Active)
                    .map(|e| e.stamp.clone())
            });
        for entry in &mut self.sessions {
            if entry.status == SessionStatus::Active && Some(&entry.stamp) != keep.as_ref() {
                entry.status = SessionStatus::Archived;
            }
        }
        self.active_stamp = keep;
    }
}
