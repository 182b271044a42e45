//! Persistence wrappers for `state/hierarchy.json`.

use crate::tree::HierarchyTree;
use hivemind_core::Result;
use hivemind_state::{store, HivemindPaths};

pub fn tree_exists(paths: &HivemindPaths) -> bool {
    paths.hierarchy.is_file()
}

/// Load the tree, degrading to a fresh empty tree when the file is
/// missing or corrupt. The cursor is validated on the way in.
pub async fn load_tree(paths: &HivemindPaths) -> HierarchyTree {
    let mut tree: HierarchyTree = store::load_json(&paths.hierarchy)
        .await
        .unwrap_or_else(HierarchyTree::new);
    tree.ensure_cursor();
    tree
}

pub async fn save_tree(paths: &HivemindPaths, tree: &HierarchyTree) -> Result<()> {
    store::save_json(&paths.hierarchy, tree).await
}
