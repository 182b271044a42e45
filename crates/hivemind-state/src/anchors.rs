//! Immutable anchors: facts that survive context compaction.
//!
//! Anchors are keyed constraints ("DB_SCHEMA", "API_PORT") the agent
//! must not lose. Upsert by key, never silently drop, and render as an
//! `<immutable-anchors>` block for prompt injection.

use crate::paths::HivemindPaths;
use crate::store;
use hivemind_core::Result;
use serde::{Deserialize, Serialize};

pub const ANCHORS_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Anchor {
    pub key: String,
    pub value: String,
    /// Session that created or last updated this anchor.
    pub session_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnchorsState {
    #[serde(default = "anchors_version")]
    pub version: u32,
    #[serde(default)]
    pub anchors: Vec<Anchor>,
}

fn anchors_version() -> u32 {
    ANCHORS_VERSION
}

impl Default for AnchorsState {
    fn default() -> Self {
        Self {
            version: ANCHORS_VERSION,
            anchors: Vec::new(),
        }
    }
}

impl AnchorsState {
    pub async fn load(paths: &HivemindPaths) -> Self {
        store::load_json(&paths.anchors).await.unwrap_or_default()
    }

    pub async fn save(&self, paths: &HivemindPaths) -> Result<()> {
        store::save_json(&paths.anchors, self).await
    }

    pub fn find(&self, key: &str) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.key == key)
    }

    /// Insert or update by key. Returns the previous value when the key
    /// already existed.
    pub fn upsert(
        &mut self,
        key: &str,
        value: &str,
        session_id: &str,
        now_ms: i64,
    ) -> Option<String> {
        match self.anchors.iter_mut().find(|a| a.key == key) {
            Some(existing) => {
                let previous = std::mem::replace(&mut existing.value, value.to_string());
                existing.session_id = session_id.to_string();
                existing.updated_at = now_ms;
                Some(previous)
            }
            None => {
                self.anchors.push(Anchor {
                    key: key.to_string(),
                    value: value.to_string(),
                    session_id: session_id.to_string(),
                    created_at: now_ms,
                    updated_at: now_ms,
                });
                None
            }
        }
    }

    /// Remove by key; true when something was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.anchors.len();
        self.anchors.retain(|a| a.key != key);
        self.anchors.len() != before
    }

    /// Render the anchors as a prompt-injection block. Empty state
    /// renders nothing.
    pub fn format_for_prompt(&self) -> String {
        if self.anchors.is_empty() {
            return String::new();
        }
        let mut out = String::from("<immutable-anchors>\n");
        for anchor in &self.anchors {
            out.push_str(&format!("[{}]: {}\n", anchor.key, anchor.value));
        }
        out.push_str("</immutable-anchors>");
        out
    }
}
