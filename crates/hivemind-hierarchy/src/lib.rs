//! Hierarchy tree engine: the trajectory/tactic/action intent tree.
//!
//! The tree is the source of truth for session focus. The flat
//! `{trajectory, tactic, action}` strings in the brain document are a
//! projection of the cursor path, recomputed after every mutation.

pub mod persist;
pub mod render;
pub mod tree;

pub use persist::{load_tree, save_tree, tree_exists};
pub use render::{to_ascii_tree, to_session_body};
pub use tree::{
    Gap, GapSeverity, HierarchyNode, HierarchyTree, PruneOutcome, TreeStats, TREE_VERSION,
};
