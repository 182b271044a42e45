//! Tree structure and mutation semantics.
//!
//! Invariants held here: children are strictly one level deeper than
//! their parent, action nodes are leaves, and the cursor always names a
//! reachable node (self-healed to root when bookkeeping drifts).

use hivemind_core::{generate_stamp, Error, FlatHierarchy, HierarchyLevel, NodeStatus, Result};
use serde::{Deserialize, Serialize};

pub const TREE_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: String,
    pub level: HierarchyLevel,
    pub content: String,
    pub status: NodeStatus,
    /// Epoch ms of creation or last content overwrite.
    pub stamp: i64,
    #[serde(default)]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn new(level: HierarchyLevel, content: &str, status: NodeStatus, at_ms: i64) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("{}-{}", generate_stamp(at_ms), &suffix[..6]),
            level,
            content: content.to_string(),
            status,
            stamp: at_ms,
            children: Vec::new(),
        }
    }

    /// Node count of this subtree, itself included.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_size).sum::<usize>()
    }

    fn all_complete(&self) -> bool {
        self.status == NodeStatus::Complete && self.children.iter().all(Self::all_complete)
    }

    fn find(&self, id: &str) -> Option<&HierarchyNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut HierarchyNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HierarchyTree {
    pub version: u32,
    pub root: Option<HierarchyNode>,
    pub cursor: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub pruned: usize,
    pub summaries: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub depth: usize,
    pub active_nodes: usize,
    pub completed_nodes: usize,
    pub pending_nodes: usize,
    pub blocked_nodes: usize,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GapSeverity {
    Normal,
    Stale,
}

/// A stamp delta along a parent-child or sibling edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Gap {
    pub from: String,
    pub to: String,
    pub gap_ms: i64,
    pub relationship: String,
    pub severity: GapSeverity,
}

impl HierarchyTree {
    pub fn new() -> Self {
        Self {
            version: TREE_VERSION,
            root: None,
            cursor: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Install a trajectory node as root, cursor on it.
    pub fn set_root(&mut self, node: HierarchyNode) -> Result<()> {
        if node.level != HierarchyLevel::Trajectory {
            return Err(Error::validation("root node must be a trajectory"));
        }
        self.cursor = Some(node.id.clone());
        self.root = Some(node);
        Ok(())
    }

    pub fn find(&self, id: &str) -> Option<&HierarchyNode> {
        self.root.as_ref().and_then(|r| r.find(id))
    }

    /// Root-to-node path, inclusive. Empty when the id is absent.
    pub fn ancestors(&self, id: &str) -> Vec<&HierarchyNode> {
        fn walk<'a>(
            node: &'a HierarchyNode,
            id: &str,
            path: &mut Vec<&'a HierarchyNode>,
        ) -> bool {
            path.push(node);
            if node.id == id {
                return true;
            }
            for child in &node.children {
                if walk(child, id, path) {
                    return true;
                }
            }
            path.pop();
            false
        }

        let mut path = Vec::new();
        if let Some(root) = &self.root {
            if !walk(root, id, &mut path) {
                path.clear();
            }
        }
        path
    }

    pub fn cursor_node(&self) -> Option<&HierarchyNode> {
        self.cursor.as_deref().and_then(|id| self.find(id))
    }

    /// Repair a cursor pointing at a missing node. Recoverable
    /// bookkeeping drift, not an error.
    pub fn ensure_cursor(&mut self) {
        let valid = self
            .cursor
            .as_deref()
            .map(|id| self.find(id).is_some())
            .unwrap_or(false);
        if !valid {
            if self.cursor.is_some() {
                tracing::warn!("cursor referenced a missing node, resetting to root");
            }
            self.cursor = self.root.as_ref().map(|r| r.id.clone());
        }
    }

    /// Apply an `update` at a level. Trajectory replaces the whole tree;
    /// tactic and action update-in-place along the cursor ancestry or
    /// append under their parent, keeping the active path singular per
    /// level. Cursor lands on the touched node.
    pub fn apply_update(
        &mut self,
        level: HierarchyLevel,
        content: &str,
        at_ms: i64,
    ) -> Result<()> {
        if content.trim().is_empty() {
            return Err(Error::validation("content is required"));
        }
        self.ensure_cursor();

        match level {
            HierarchyLevel::Trajectory => {
                let node = HierarchyNode::new(level, content, NodeStatus::Active, at_ms);
                self.set_root(node)?;
            }
            HierarchyLevel::Tactic => {
                let existing_id = self.ancestry_node_id(HierarchyLevel::Tactic);
                let root = self
                    .root
                    .as_mut()
                    .ok_or_else(|| Error::validation("no trajectory set, call start first"))?;
                let id = match existing_id {
                    Some(id) => {
                        let node = root.find_mut(&id).ok_or_else(|| {
                            Error::validation("cursor ancestry out of sync with tree")
                        })?;
                        node.content = content.to_string();
                        node.stamp = at_ms;
                        node.status = NodeStatus::Active;
                        node.children.clear();
                        id
                    }
                    None => {
                        let node =
                            HierarchyNode::new(level, content, NodeStatus::Active, at_ms);
                        let id = node.id.clone();
                        root.children.push(node);
                        id
                    }
                };
                self.cursor = Some(id);
            }
            HierarchyLevel::Action => {
                let tactic_id = self
                    .ancestry_node_id(HierarchyLevel::Tactic)
                    .ok_or_else(|| {
                        Error::validation(
                            "action declared without a tactic, set a tactic first",
                        )
                    })?;
                let existing_id = self.ancestry_node_id(HierarchyLevel::Action);
                let root = self
                    .root
                    .as_mut()
                    .ok_or_else(|| Error::validation("no trajectory set, call start first"))?;
                let id = match existing_id {
                    Some(id) => {
                        let node = root.find_mut(&id).ok_or_else(|| {
                            Error::validation("cursor ancestry out of sync with tree")
                        })?;
                        node.content = content.to_string();
                        node.stamp = at_ms;
                        node.status = NodeStatus::Active;
                        id
                    }
                    None => {
                        let tactic = root.find_mut(&tactic_id).ok_or_else(|| {
                            Error::validation("cursor ancestry out of sync with tree")
                        })?;
                        let node =
                            HierarchyNode::new(level, content, NodeStatus::Active, at_ms);
                        let id = node.id.clone();
                        tactic.children.push(node);
                        id
                    }
                };
                self.cursor = Some(id);
            }
        }
        Ok(())
    }

    /// Id of the cursor-path node at `level`, if one exists. For actions
    /// with no node at the level yet, falls back to the deepest tactic
    /// under the cursor so appends land in the right branch.
    fn ancestry_node_id(&self, level: HierarchyLevel) -> Option<String> {
        let cursor = self.cursor.as_deref()?;
        let path = self.ancestors(cursor);
        if let Some(node) = path.iter().find(|n| n.level == level) {
            return Some(node.id.clone());
        }
        // Cursor on a tactic whose single active child is the level we
        // want (cursor moved up after a prune).
        if let Some(last) = path.last() {
            if last.level.child() == Some(level) && last.children.len() == 1 {
                return Some(last.children[0].id.clone());
            }
        }
        None
    }

    /// Flat projection of the cursor path. Missing levels project as "".
    pub fn to_brain_projection(&self) -> FlatHierarchy {
        let mut flat = FlatHierarchy::default();
        let Some(cursor) = self.cursor.as_deref() else {
            if let Some(root) = &self.root {
                flat.trajectory = root.content.clone();
            }
            return flat;
        };
        for node in self.ancestors(cursor) {
            match node.level {
                HierarchyLevel::Trajectory => flat.trajectory = node.content.clone(),
                HierarchyLevel::Tactic => flat.tactic = node.content.clone(),
                HierarchyLevel::Action => flat.action = node.content.clone(),
            }
        }
        if flat.trajectory.is_empty() {
            if let Some(root) = &self.root {
                flat.trajectory = root.content.clone();
            }
        }
        flat
    }

    /// Remove every fully-complete subtree, leaving a one-line summary
    /// per removal. Cursor inside a pruned subtree heals to the nearest
    /// surviving ancestor.
    pub fn prune_completed(&mut self) -> PruneOutcome {
        let cursor_path: Vec<String> = self
            .cursor
            .as_deref()
            .map(|id| self.ancestors(id).iter().map(|n| n.id.clone()).collect())
            .unwrap_or_default();

        let mut outcome = PruneOutcome::default();
        if let Some(root) = self.root.take() {
            if root.all_complete() {
                outcome.pruned += root.subtree_size();
                outcome.summaries.push(summarize(&root));
            } else {
                let mut root = root;
                prune_children(&mut root, &mut outcome);
                self.root = Some(root);
            }
        }

        // Heal cursor: deepest surviving node on the old cursor path.
        let survivor = cursor_path
            .iter()
            .rev()
            .find(|id| self.find(id).is_some())
            .cloned();
        self.cursor = survivor.or_else(|| self.root.as_ref().map(|r| r.id.clone()));
        outcome
    }

    /// Build a tree from flat strings. Trajectory is required.
    pub fn migrate_from_flat(flat: &FlatHierarchy, at_ms: i64) -> Result<Self> {
        if flat.trajectory.trim().is_empty() {
            return Err(Error::validation("cannot migrate an empty trajectory"));
        }
        let mut tree = Self::new();
        let root = HierarchyNode::new(
            HierarchyLevel::Trajectory,
            &flat.trajectory,
            NodeStatus::Active,
            at_ms,
        );
        tree.set_root(root)?;
        if !flat.tactic.trim().is_empty() {
            tree.apply_update(HierarchyLevel::Tactic, &flat.tactic, at_ms)?;
            if !flat.action.trim().is_empty() {
                tree.apply_update(HierarchyLevel::Action, &flat.action, at_ms)?;
            }
        }
        Ok(tree)
    }

    /// Stamp deltas along parent-child and adjacent-sibling edges.
    /// `stale_threshold_ms` comes from config, not from here.
    pub fn detect_gaps(&self, stale_threshold_ms: i64) -> Vec<Gap> {
        fn classify(gap_ms: i64, threshold: i64) -> GapSeverity {
            if gap_ms > threshold {
                GapSeverity::Stale
            } else {
                GapSeverity::Normal
            }
        }

        fn walk(node: &HierarchyNode, threshold: i64, gaps: &mut Vec<Gap>) {
            for child in &node.children {
                let gap_ms = (child.stamp - node.stamp).abs();
                gaps.push(Gap {
                    from: node.id.clone(),
                    to: child.id.clone(),
                    gap_ms,
                    relationship: "parent-child".to_string(),
                    severity: classify(gap_ms, threshold),
                });
            }
            for pair in node.children.windows(2) {
                let gap_ms = (pair[1].stamp - pair[0].stamp).abs();
                gaps.push(Gap {
                    from: pair[0].id.clone(),
                    to: pair[1].id.clone(),
                    gap_ms,
                    relationship: "sibling".to_string(),
                    severity: classify(gap_ms, threshold),
                });
            }
            for child in &node.children {
                walk(child, threshold, gaps);
            }
        }

        let mut gaps = Vec::new();
        if let Some(root) = &self.root {
            walk(root, stale_threshold_ms, &mut gaps);
        }
        gaps
    }

    pub fn stats(&self) -> TreeStats {
        fn walk(node: &HierarchyNode, depth: usize, stats: &mut TreeStats) {
            stats.total_nodes += 1;
            stats.depth = stats.depth.max(depth);
            match node.status {
                NodeStatus::Active => stats.active_nodes += 1,
                NodeStatus::Complete => stats.completed_nodes += 1,
                NodeStatus::Pending => stats.pending_nodes += 1,
                NodeStatus::Blocked => stats.blocked_nodes += 1,
            }
            for child in &node.children {
                walk(child, depth + 1, stats);
            }
        }

        let mut stats = TreeStats::default();
        if let Some(root) = &self.root {
            walk(root, 1, &mut stats);
        }
        stats
    }
}

fn summarize(node: &HierarchyNode) -> String {
    let descendants = node.subtree_size() - 1;
    if descendants == 0 {
        format!("{}: {}", node.level, node.content)
    } else {
        format!(
            "{}: {} [{} sub-items completed]",
            node.level, node.content, descendants
        )
    }
}

fn prune_children(node: &mut HierarchyNode, outcome: &mut PruneOutcome) {
    let mut kept = Vec::with_capacity(node.children.len());
    for child in node.children.drain(..) {
        if child.all_complete() {
            outcome.pruned += child.subtree_size();
            outcome.summaries.push(summarize(&child));
        } else {
            kept.push(child);
        }
    }
    node.children = kept;
    for child in &mut node.children {
        prune_children(child, outcome);
    }
}
