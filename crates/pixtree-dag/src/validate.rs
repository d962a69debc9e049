//! Integrity validation for a single tree.
//!
//! Validation is advisory: it reports every problem it finds and never
//! modifies nodes. Repairs are separate, explicit operations.

use std::collections::{HashMap, HashSet};
use std::fmt;

use pixtree_types::{ImageNode, Tree};
use tracing::debug;

/// A specific integrity violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    /// The node the issue is reported against, or the tree id for
    /// tree-level issues.
    pub node_id: String,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueKind {
    /// `parent_id` names a node that does not exist.
    InvalidParent,
    /// `parent_id` names a node that belongs to another tree.
    CrossTreeParent,
    /// Following `parent_id` upward returns to the starting node.
    CircularReference,
    /// The tree's cached metadata disagrees with its actual members.
    MetadataDrift,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of validating one tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub tree_id: String,
    pub node_count: usize,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// One human-readable line per issue.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.message.clone()).collect()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}

/// Check every node of `tree`. `all_nodes` may contain nodes from other
/// trees; they are used to tell a missing parent from a cross-tree one.
pub fn validate_tree(tree: &Tree, all_nodes: &[ImageNode]) -> ValidationReport {
    let by_id: HashMap<&str, &ImageNode> =
        all_nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut members: Vec<&ImageNode> = all_nodes.iter().filter(|n| n.tree_id == tree.id).collect();
    members.sort_by(|a, b| a.id.cmp(&b.id));
    members.dedup_by(|a, b| a.id == b.id);

    let mut issues = Vec::new();

    // ---- parent references ----
    for node in &members {
        let Some(parent_id) = node.parent_id.as_deref() else {
            continue;
        };
        match by_id.get(parent_id) {
            None => issues.push(Issue {
                kind: IssueKind::InvalidParent,
                node_id: node.id.clone(),
                message: format!("node {} references missing parent {}", node.id, parent_id),
            }),
            Some(parent) if parent.tree_id != tree.id => issues.push(Issue {
                kind: IssueKind::CrossTreeParent,
                node_id: node.id.clone(),
                message: format!(
                    "node {} references parent {} in another tree ({})",
                    node.id, parent_id, parent.tree_id
                ),
            }),
            Some(_) => {}
        }
    }

    // ---- cycles ----
    let member_ids: HashMap<&str, &ImageNode> =
        members.iter().map(|n| (n.id.as_str(), *n)).collect();
    let mut done: HashSet<&str> = HashSet::new();
    for start in &members {
        if done.contains(start.id.as_str()) {
            continue;
        }
        let mut path: Vec<&str> = Vec::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut cursor = Some(start.id.as_str());
        while let Some(id) = cursor {
            if done.contains(id) {
                break;
            }
            if !on_path.insert(id) {
                let from = path.iter().position(|p| *p == id).unwrap_or(0);
                let cycle = &path[from..];
                let anchor = cycle.iter().min().copied().unwrap_or(id);
                issues.push(Issue {
                    kind: IssueKind::CircularReference,
                    node_id: anchor.to_string(),
                    message: format!(
                        "circular parent reference through {} node(s) starting at {}",
                        cycle.len(),
                        anchor
                    ),
                });
                break;
            }
            path.push(id);
            cursor = member_ids
                .get(id)
                .and_then(|n| n.parent_id.as_deref())
                .filter(|p| member_ids.contains_key(p));
        }
        done.extend(path);
    }

    // ---- cached metadata ----
    if tree.metadata.total_nodes != members.len() {
        issues.push(Issue {
            kind: IssueKind::MetadataDrift,
            node_id: tree.id.clone(),
            message: format!(
                "tree {} records {} node(s) but has {}",
                tree.id,
                tree.metadata.total_nodes,
                members.len()
            ),
        });
    }

    debug!(tree = %tree.id, nodes = members.len(), issues = issues.len(), "validated tree");

    ValidationReport {
        tree_id: tree.id.clone(),
        node_count: members.len(),
        issues,
    }
}
