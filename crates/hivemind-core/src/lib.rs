//! Shared types for the HiveMind context-governance core.

pub mod config;
pub mod error;
pub mod types;

pub use config::{GovernanceConfig, GovernanceMode, ToastConfig};
pub use error::{Error, Result};
pub use types::{
    BrainState, FlatHierarchy, GovernanceStatus, HierarchyLevel, NodeStatus, SelfRating,
    SessionInfo, SessionMetrics, SessionMode, ToolCategory, ToolTypeCounts,
};

/// Current timestamp in epoch milliseconds, the unit every persisted
/// document uses.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Compact `YYYYMMDD-HHMMSS` stamp used for manifest entries and node ids.
pub fn generate_stamp(at_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(at_ms)
        .unwrap_or_else(chrono::Utc::now)
        .format("%Y%m%d-%H%M%S")
        .to_string()
}

/// Fresh session id: `sess-` plus a uuid prefix.
pub fn generate_session_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("sess-{}", &suffix[..12])
}
