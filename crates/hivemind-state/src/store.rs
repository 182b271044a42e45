//! Atomic JSON document persistence.
//!
//! Every write goes temp-file-then-rename so a crash mid-write can never
//! corrupt a document; the previous version is copied to `.bak` first,
//! best-effort. Reads degrade: a missing or corrupt file yields `None`
//! with a warning. Write failures always propagate.

use crate::paths::HivemindPaths;
use hivemind_core::{BrainState, Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Read a JSON document, treating absence and corruption as "no state".
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("corrupt document {} ({}), treating as absent", path.display(), e);
            None
        }
    }
}

/// Atomically persist a JSON document: backup old version (best-effort),
/// write a temp sibling, rename into place.
pub async fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // Backup is a durability nicety; its failure never blocks the write.
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let bak = backup_path(path);
        if let Err(e) = tokio::fs::copy(path, &bak).await {
            tracing::warn!("backup of {} failed: {}", path.display(), e);
        }
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, json.as_bytes()).await?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::persistence(format!("rename {}: {}", path.display(), e)))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// Load-mutate-save handle for the brain document.
#[derive(Clone, Debug)]
pub struct StateManager {
    paths: HivemindPaths,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            paths: HivemindPaths::new(project_root),
        }
    }

    pub fn paths(&self) -> &HivemindPaths {
        &self.paths
    }

    pub async fn load(&self) -> Option<BrainState> {
        load_json(&self.paths.brain).await
    }

    pub async fn save(&self, state: &BrainState) -> Result<()> {
        save_json(&self.paths.brain, state).await
    }

    /// Load the brain, apply a pure mutation, persist the result.
    /// Returns `None` when no brain state exists.
    pub async fn with_state<F>(&self, mutate: F) -> Result<Option<BrainState>>
    where
        F: FnOnce(&mut BrainState),
    {
        let Some(mut state) = self.load().await else {
            return Ok(None);
        };
        mutate(&mut state);
        self.save(&state).await?;
        Ok(Some(state))
    }
}
