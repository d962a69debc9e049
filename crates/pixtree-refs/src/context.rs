//! The workspace context value and its state transitions.

use chrono::{DateTime, Utc};
use pixtree_types::ImageNode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RefError, Result};

/// Default length of the recently-used tree list.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

fn default_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

/// Which of the three context states the working copy is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState<'a> {
    NoTree,
    TreeSelected { tree: &'a str },
    TreeAndNodeSelected { tree: &'a str, node: &'a str },
}

/// The current tree and node of a working copy.
///
/// Invariant: `current_node` is only ever set while `current_tree` is set,
/// and only to a node that was a member of that tree when it was checked
/// out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node: Option<String>,
    /// Most recent first, no duplicates.
    #[serde(default)]
    pub recent_trees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip, default = "default_limit")]
    recent_limit: usize,
}

impl Default for WorkspaceContext {
    fn default() -> Self {
        Self {
            current_tree: None,
            current_node: None,
            recent_trees: Vec::new(),
            updated_at: None,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl WorkspaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the recently-used list. A limit of zero is treated as one.
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.set_recent_limit(limit);
        self
    }

    pub fn set_recent_limit(&mut self, limit: usize) {
        self.recent_limit = limit.max(1);
        self.recent_trees.truncate(self.recent_limit);
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    pub fn state(&self) -> ContextState<'_> {
        match (self.current_tree.as_deref(), self.current_node.as_deref()) {
            (None, _) => ContextState::NoTree,
            (Some(tree), None) => ContextState::TreeSelected { tree },
            (Some(tree), Some(node)) => ContextState::TreeAndNodeSelected { tree, node },
        }
    }

    pub fn current_tree(&self) -> Option<&str> {
        self.current_tree.as_deref()
    }

    pub fn current_node(&self) -> Option<&str> {
        self.current_node.as_deref()
    }

    /// Make `tree_id` current. Always clears the current node and moves the
    /// tree to the front of the recently-used list.
    pub fn switch_tree(&mut self, tree_id: &str) {
        self.current_tree = Some(tree_id.to_string());
        self.current_node = None;
        self.recent_trees.retain(|t| t != tree_id);
        self.recent_trees.insert(0, tree_id.to_string());
        self.recent_trees.truncate(self.recent_limit);
        self.stamp();
        debug!(tree = %tree_id, "switched tree");
    }

    /// Make `node` current. The node must belong to the current tree.
    ///
    /// On error the context is left unchanged.
    pub fn checkout(&mut self, node: &ImageNode) -> Result<()> {
        let Some(current_tree) = self.current_tree.as_deref() else {
            return Err(RefError::NoTreeSelected {
                node: node.id.clone(),
            });
        };
        if node.tree_id != current_tree {
            return Err(RefError::CrossTreeCheckout {
                node: node.id.clone(),
                node_tree: node.tree_id.clone(),
                current_tree: current_tree.to_string(),
            });
        }
        self.current_node = Some(node.id.clone());
        self.stamp();
        debug!(node = %node.id, tree = %node.tree_id, "checked out node");
        Ok(())
    }

    /// Drop the current node, keeping the current tree.
    pub fn clear_node(&mut self) {
        if self.current_node.take().is_some() {
            self.stamp();
        }
    }

    /// Forget a deleted tree. Returns `true` if it was the current tree.
    pub fn on_tree_deleted(&mut self, tree_id: &str) -> bool {
        self.recent_trees.retain(|t| t != tree_id);
        let was_current = self.current_tree.as_deref() == Some(tree_id);
        if was_current {
            self.current_tree = None;
            self.current_node = None;
        }
        self.stamp();
        was_current
    }

    /// Forget a deleted node. Returns `true` if it was the current node.
    pub fn on_node_deleted(&mut self, node_id: &str) -> bool {
        let was_current = self.current_node.as_deref() == Some(node_id);
        if was_current {
            self.current_node = None;
            self.stamp();
        }
        was_current
    }

    fn stamp(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixtree_types::{ContentHash, FileMetadata};

    fn node_in(tree: &str) -> ImageNode {
        ImageNode::new(
            "project-x",
            tree,
            None,
            ContentHash::of(tree.as_bytes()),
            "images/x.bin",
            FileMetadata::default(),
        )
    }

    #[test]
    fn starts_with_no_tree() {
        let ctx = WorkspaceContext::new();
        assert_eq!(ctx.state(), ContextState::NoTree);
        assert!(ctx.recent_trees.is_empty());
    }

    #[test]
    fn switch_tree_clears_node() {
        let mut ctx = WorkspaceContext::new();
        ctx.switch_tree("tree-a");
        let node = node_in("tree-a");
        ctx.checkout(&node).unwrap();
        assert_eq!(
            ctx.state(),
            ContextState::TreeAndNodeSelected {
                tree: "tree-a",
                node: &node.id
            }
        );

        ctx.switch_tree("tree-b");
        assert_eq!(ctx.state(), ContextState::TreeSelected { tree: "tree-b" });
    }

    #[test]
    fn switching_to_same_tree_still_clears_node() {
        let mut ctx = WorkspaceContext::new();
        ctx.switch_tree("tree-a");
        ctx.checkout(&node_in("tree-a")).unwrap();
        ctx.switch_tree("tree-a");
        assert!(ctx.current_node().is_none());
        assert_eq!(ctx.recent_trees, ["tree-a"]);
    }

    #[test]
    fn checkout_without_tree_fails() {
        let mut ctx = WorkspaceContext::new();
        let err = ctx.checkout(&node_in("tree-a")).unwrap_err();
        assert!(matches!(err, RefError::NoTreeSelected { .. }));
        assert_eq!(ctx.state(), ContextState::NoTree);
    }

    #[test]
    fn cross_tree_checkout_leaves_context_unchanged() {
        let mut ctx = WorkspaceContext::new();
        ctx.switch_tree("tree-a");
        let home = node_in("tree-a");
        ctx.checkout(&home).unwrap();
        let before = ctx.clone();

        let err = ctx.checkout(&node_in("tree-b")).unwrap_err();
        match err {
            RefError::CrossTreeCheckout {
                node_tree,
                current_tree,
                ..
            } => {
                assert_eq!(node_tree, "tree-b");
                assert_eq!(current_tree, "tree-a");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ctx, before);
    }

    #[test]
    fn recent_trees_are_bounded_and_deduplicated() {
        let mut ctx = WorkspaceContext::new().with_recent_limit(3);
        for t in ["t1", "t2", "t3", "t2", "t4"] {
            ctx.switch_tree(t);
        }
        assert_eq!(ctx.recent_trees, ["t4", "t2", "t3"]);
    }

    #[test]
    fn deleting_current_tree_resets_context() {
        let mut ctx = WorkspaceContext::new();
        ctx.switch_tree("t1");
        ctx.switch_tree("t2");
        assert!(ctx.on_tree_deleted("t2"));
        assert_eq!(ctx.state(), ContextState::NoTree);
        assert_eq!(ctx.recent_trees, ["t1"]);

        ctx.switch_tree("t3");
        assert!(!ctx.on_tree_deleted("t1"));
        assert_eq!(ctx.current_tree(), Some("t3"));
        assert_eq!(ctx.recent_trees, ["t3"]);
    }

    #[test]
    fn deleting_current_node_clears_pointer() {
        let mut ctx = WorkspaceContext::new();
        ctx.switch_tree("tree-a");
        let node = node_in("tree-a");
        ctx.checkout(&node).unwrap();
        assert!(!ctx.on_node_deleted("node-other"));
        assert_eq!(ctx.current_node(), Some(node.id.as_str()));
        assert!(ctx.on_node_deleted(&node.id));
        assert_eq!(ctx.state(), ContextState::TreeSelected { tree: "tree-a" });
    }

    #[test]
    fn limit_is_not_serialized() {
        let ctx = WorkspaceContext::new().with_recent_limit(2);
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(!json.contains("limit"));
        let back: WorkspaceContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back.recent_limit(), DEFAULT_RECENT_LIMIT);
    }
}
