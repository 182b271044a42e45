//! Core session state types.
//!
//! `BrainState` is the per-session document persisted at
//! `.hivemind/state/brain.json`. Its flat `hierarchy` block is a
//! projection of the hierarchy tree, always recomputed after a tree
//! mutation, never edited independently.

use serde::{Deserialize, Serialize};

/// Session working mode, declared at `start`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    PlanDriven,
    QuickFix,
    Exploration,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanDriven => "plan_driven",
            Self::QuickFix => "quick_fix",
            Self::Exploration => "exploration",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plan_driven" => Some(Self::PlanDriven),
            "quick_fix" => Some(Self::QuickFix),
            "exploration" => Some(Self::Exploration),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Governance gate. A LOCKED session rejects write-intent work until
/// `start` unlocks it again.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum GovernanceStatus {
    Open,
    #[default]
    Locked,
}

impl std::fmt::Display for GovernanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => f.write_str("OPEN"),
            Self::Locked => f.write_str("LOCKED"),
        }
    }
}

/// The three fixed levels of the intent hierarchy, coarsest to finest.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyLevel {
    Trajectory,
    Tactic,
    Action,
}

impl HierarchyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trajectory => "trajectory",
            Self::Tactic => "tactic",
            Self::Action => "action",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trajectory" => Some(Self::Trajectory),
            "tactic" => Some(Self::Tactic),
            "action" => Some(Self::Action),
            _ => None,
        }
    }

    /// The level one step deeper, if any.
    pub fn child(&self) -> Option<Self> {
        match self {
            Self::Trajectory => Some(Self::Tactic),
            Self::Tactic => Some(Self::Action),
            Self::Action => None,
        }
    }
}

impl std::fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a hierarchy node.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    #[default]
    Active,
    Complete,
    Blocked,
}

impl NodeStatus {
    /// Two-letter marker used by the ASCII tree renderer.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Pending => "..",
            Self::Active => ">>",
            Self::Complete => "OK",
            Self::Blocked => "!!",
        }
    }
}

/// Effect class of a tool invocation. Closed set; unknown tools default
/// to `Query` at the classification table, never here.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Read,
    Write,
    Query,
    Governance,
}

/// Flat trajectory/tactic/action strings, the historical shape external
/// consumers (prompt templates, manifests) still depend on. Derived from
/// the tree, empty string for unset levels.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlatHierarchy {
    #[serde(default)]
    pub trajectory: String,
    #[serde(default)]
    pub tactic: String,
    #[serde(default)]
    pub action: String,
}

impl FlatHierarchy {
    pub fn get(&self, level: HierarchyLevel) -> &str {
        match level {
            HierarchyLevel::Trajectory => &self.trajectory,
            HierarchyLevel::Tactic => &self.tactic,
            HierarchyLevel::Action => &self.action,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty() && self.tactic.is_empty() && self.action.is_empty()
    }
}

/// Per-category tool invocation counters.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolTypeCounts {
    pub read: u32,
    pub write: u32,
    pub query: u32,
    pub governance: u32,
}

impl ToolTypeCounts {
    pub fn bump(&mut self, category: ToolCategory) {
        match category {
            ToolCategory::Read => self.read += 1,
            ToolCategory::Write => self.write += 1,
            ToolCategory::Query => self.query += 1,
            ToolCategory::Governance => self.governance += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.read + self.write + self.query + self.governance
    }
}

/// Agent self-assessment captured mid-session, carried into exports.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SelfRating {
    pub score: u8,
    pub reason: String,
}

/// Session identity block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub mode: SessionMode,
    pub governance_status: GovernanceStatus,
    /// Epoch ms.
    pub start_time: i64,
    /// Epoch ms, touched on every mutation.
    pub last_activity: i64,
    /// YYYY-MM-DD, used by exports and filenames.
    #[serde(default)]
    pub date: String,
}

/// Running counters, all monotonic within a session and reset only by a
/// fresh `BrainState` on close.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub turn_count: u32,
    pub drift_score: u8,
    /// Insertion-ordered, de-duplicated paths.
    pub files_touched: Vec<String>,
    pub context_updates: u32,
    pub violation_count: u32,
    pub consecutive_failures: u32,
    pub consecutive_same_section: u32,
    /// Last write-classified target, for repetition tracking.
    #[serde(default)]
    pub last_write_target: Option<String>,
    pub tool_type_counts: ToolTypeCounts,
    /// De-duplicated sentiment/urgency tags matched in tool text.
    pub keyword_flags: Vec<String>,
    pub auto_health_score: u8,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self {
            turn_count: 0,
            drift_score: 100,
            files_touched: Vec::new(),
            context_updates: 0,
            violation_count: 0,
            consecutive_failures: 0,
            consecutive_same_section: 0,
            last_write_target: None,
            tool_type_counts: ToolTypeCounts::default(),
            keyword_flags: Vec::new(),
            auto_health_score: 100,
        }
    }
}

/// The per-session brain document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrainState {
    pub session: SessionInfo,
    pub hierarchy: FlatHierarchy,
    pub metrics: SessionMetrics,
    #[serde(default)]
    pub pending_failure_ack: bool,
    #[serde(default)]
    pub last_commit_suggestion_turn: u32,
    #[serde(default)]
    pub self_ratings: Vec<SelfRating>,
}

impl BrainState {
    /// Fresh state. Starts LOCKED; `start` unlocks it once intent is
    /// declared.
    pub fn new(session_id: impl Into<String>, mode: SessionMode, now_ms: i64) -> Self {
        let date = chrono::DateTime::from_timestamp_millis(now_ms)
            .unwrap_or_else(chrono::Utc::now)
            .format("%Y-%m-%d")
            .to_string();
        Self {
            session: SessionInfo {
                id: session_id.into(),
                mode,
                governance_status: GovernanceStatus::Locked,
                start_time: now_ms,
                last_activity: now_ms,
                date,
            },
            hierarchy: FlatHierarchy::default(),
            metrics: SessionMetrics::default(),
            pending_failure_ack: false,
            last_commit_suggestion_turn: 0,
            self_ratings: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.governance_status == GovernanceStatus::Open
    }

    pub fn unlock(&mut self) {
        self.session.governance_status = GovernanceStatus::Open;
    }

    pub fn lock(&mut self) {
        self.session.governance_status = GovernanceStatus::Locked;
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.session.last_activity = now_ms;
    }

    /// Record a touched file, preserving insertion order without
    /// duplicates.
    pub fn add_file_touched(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.metrics.files_touched.iter().any(|p| *p == path) {
            self.metrics.files_touched.push(path);
        }
    }

    pub fn add_self_rating(&mut self, score: u8, reason: impl Into<String>) {
        self.self_ratings.push(SelfRating {
            score,
            reason: reason.into(),
        });
    }
}
