//! Drift scoring, chain analysis, and the detection/signal engine.
//!
//! Everything in this crate is a pure function over already-loaded
//! state. Persistence and orchestration live elsewhere.

pub mod advisor;
pub mod chain;
pub mod checklist;
pub mod drift;
pub mod signals;
pub mod throttle;

pub use advisor::{commit_suggestion, tool_activation, CommitSuggestion, HintPriority, ToolHint};
pub use chain::detect_chain_breaks;
pub use checklist::{build_checklist, checklist_items};
pub use drift::{calculate_drift_score, DriftTier, DRIFT_GOOD, DRIFT_WARN};
pub use signals::{classify_tool, record_tool_call, record_turn, KeywordScanner, ToolCallSignal};
pub use throttle::ToastThrottle;
