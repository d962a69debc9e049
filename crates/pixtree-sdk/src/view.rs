//! Owned result types returned by SDK operations.

use std::collections::BTreeSet;
use std::path::PathBuf;

use pixtree_dag::{build_forest, render_forest, Forest, NodeIndex};
use pixtree_types::{ContentHash, ImageNode, Project, Tree};

/// Summary of a working copy for display.
#[derive(Clone, Debug)]
pub struct Status {
    pub project: Project,
    pub current_tree: Option<Tree>,
    pub current_node: Option<ImageNode>,
    /// Most recent first; trees deleted since are skipped.
    pub recent_trees: Vec<Tree>,
    pub blob_bytes: u64,
}

/// Where a node sits in its derivation tree.
#[derive(Clone, Debug)]
pub struct NodeLineage {
    pub node: ImageNode,
    /// Root first, the node itself last.
    pub path_from_root: Vec<ImageNode>,
    pub children: Vec<ImageNode>,
    pub siblings: Vec<ImageNode>,
    pub descendant_count: usize,
}

impl NodeLineage {
    pub fn depth(&self) -> usize {
        self.path_from_root.len().saturating_sub(1)
    }
}

/// A tree with its members and assembled forest.
#[derive(Clone, Debug)]
pub struct TreeView {
    pub tree: Tree,
    pub nodes: Vec<ImageNode>,
    pub forest: Forest,
}

impl TreeView {
    pub(crate) fn new(tree: Tree, nodes: Vec<ImageNode>) -> Self {
        let forest = build_forest(&nodes);
        Self {
            tree,
            nodes,
            forest,
        }
    }

    /// ASCII rendering, labelling nodes by prompt or filename.
    pub fn render(&self, current: Option<&str>) -> String {
        let index = NodeIndex::new(&self.nodes);
        render_forest(
            &self.forest,
            |id| index.get(id).map_or_else(|| id.to_string(), |n| n.label()),
            current,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteNodeOutcome {
    pub node_id: String,
    /// Children moved to the deleted node's parent.
    pub reparented: Vec<String>,
    /// `false` when another node still shares the image bytes.
    pub blob_removed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteTreeOutcome {
    pub tree_id: String,
    pub nodes_deleted: usize,
    pub blobs_removed: BTreeSet<ContentHash>,
}

/// Where an export landed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub record: pixtree_types::ExportRecord,
}
