//! Governance configuration
//!
//! All tunable parameters in one place. Loaded from
//! `.hivemind/config.json`, falls back to defaults if the file is
//! missing or unreadable.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How strictly the governance layer intervenes.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GovernanceMode {
    Strict,
    #[default]
    Assisted,
    Permissive,
}

impl GovernanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Assisted => "assisted",
            Self::Permissive => "permissive",
        }
    }
}

/// Top-level governance configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    pub governance_mode: GovernanceMode,
    /// Files touched before the commit advisor speaks up.
    pub commit_file_threshold: usize,
    /// Parent/child or sibling stamp gaps beyond this are flagged stale.
    pub stale_gap_hours: f64,
    /// Toast throttle parameters.
    pub toast: ToastConfig,
    /// Checklist injection char budget.
    pub checklist_max_chars: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastConfig {
    /// Min milliseconds between toasts of the same key.
    pub cooldown_ms: i64,
    /// Max toasts per key per session.
    pub max_per_session: u32,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            governance_mode: GovernanceMode::default(),
            commit_file_threshold: 5,
            stale_gap_hours: 4.0,
            toast: ToastConfig::default(),
            checklist_max_chars: 300,
        }
    }
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 60_000,
            max_per_session: 5,
        }
    }
}

impl GovernanceConfig {
    /// Load config from a JSON file, falling back to defaults. A corrupt
    /// config is a degraded read, not a failure.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn stale_gap_ms(&self) -> i64 {
        (self.stale_gap_hours * 60.0 * 60.0 * 1000.0) as i64
    }
}
