//! Mems brain: cross-session memories organized on shelves.
//!
//! Four builtin shelves cover the common categories; custom shelves are
//! allowed. Search matches content and tags case-insensitively and
//! returns newest first.

use crate::paths::HivemindPaths;
use crate::store;
use hivemind_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BUILTIN_SHELVES: [&str; 4] = ["decisions", "patterns", "errors", "solutions"];

pub const MEMS_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mem {
    pub id: String,
    pub shelf: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub session_id: String,
    pub created_at: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemsState {
    #[serde(default = "mems_version")]
    pub version: u32,
    #[serde(default)]
    pub mems: Vec<Mem>,
}

fn mems_version() -> u32 {
    MEMS_VERSION
}

impl Default for MemsState {
    fn default() -> Self {
        Self {
            version: MEMS_VERSION,
            mems: Vec::new(),
        }
    }
}

impl MemsState {
    pub async fn load(paths: &HivemindPaths) -> Self {
        store::load_json(&paths.mems).await.unwrap_or_default()
    }

    pub async fn save(&self, paths: &HivemindPaths) -> Result<()> {
        store::save_json(&paths.mems, self).await
    }

    /// True when this shelf already holds exactly this content.
    pub fn has_duplicate(&self, shelf: &str, content: &str) -> bool {
        self.mems
            .iter()
            .any(|m| m.shelf == shelf && m.content == content)
    }

    /// Append a memory. Duplicates are never filtered here; callers
    /// that care can ask `has_duplicate` before appending.
    pub fn add(
        &mut self,
        shelf: &str,
        content: &str,
        tags: Vec<String>,
        session_id: &str,
        now_ms: i64,
    ) -> &Mem {
        let id = format!("mem-{}", &uuid_simple()[..8]);
        self.mems.push(Mem {
            id,
            shelf: shelf.to_string(),
            content: content.to_string(),
            tags,
            session_id: session_id.to_string(),
            created_at: now_ms,
        });
        let idx = self.mems.len() - 1;
        &self.mems[idx]
    }

    /// Case-insensitive substring match over content and tags, newest
    /// first, optionally restricted to one shelf.
    pub fn search(&self, query: &str, shelf: Option<&str>) -> Vec<&Mem> {
        let needle = query.to_lowercase();
        let mut hits: Vec<&Mem> = self
            .mems
            .iter()
            .filter(|m| shelf.map_or(true, |s| m.shelf == s))
            .filter(|m| {
                m.content.to_lowercase().contains(&needle)
                    || m.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        hits
    }

    /// Per-shelf counts, deterministic order.
    pub fn shelf_summary(&self) -> BTreeMap<String, usize> {
        let mut summary = BTreeMap::new();
        for mem in &self.mems {
            *summary.entry(mem.shelf.clone()).or_insert(0) += 1;
        }
        summary
    }

    /// Newest `n` memories across all shelves.
    pub fn recent(&self, n: usize) -> Vec<&Mem> {
        let mut all: Vec<&Mem> = self.mems.iter().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(n);
        all
    }
}

fn uuid_simple() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
