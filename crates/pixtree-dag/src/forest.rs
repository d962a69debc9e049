//! Forest assembly: rebuild the derivation trees of a node set.

use std::collections::HashSet;

use pixtree_types::ImageNode;
use tracing::debug;

use crate::index::NodeIndex;

/// One placed node and its subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub node_id: String,
    /// Hops from the root; roots have depth 0.
    pub depth: usize,
    /// Ordered by creation time, ties broken by id.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn find(&self, id: &str) -> Option<&TreeNode> {
        if self.node_id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// The derivation forest of a node set.
///
/// Every input node lands in exactly one place: inside `roots`, or in
/// `unplaced` when it cannot be reached from a root (a missing ancestor or
/// a parent cycle). `orphans` is the subset of `unplaced` whose own parent
/// is missing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Forest {
    pub roots: Vec<TreeNode>,
    pub orphans: Vec<String>,
    pub unplaced: Vec<String>,
}

impl Forest {
    /// Number of placed nodes.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// `true` when every input node was placed.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        self.roots.iter().find_map(|r| r.find(id))
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.iter().map(|n| n.depth).max()
    }

    /// Depth-first, pre-order walk in display order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: self.roots.iter().rev().collect(),
        }
    }
}

/// Pre-order iterator over a [`Forest`].
pub struct Iter<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Assemble the forest for `nodes`, typically the members of one tree.
pub fn build_forest(nodes: &[ImageNode]) -> Forest {
    let index = NodeIndex::new(nodes);
    let mut placed: HashSet<&str> = HashSet::with_capacity(index.len());

    let roots: Vec<TreeNode> = index
        .roots()
        .into_iter()
        .map(|root| place(&index, root, 0, &mut placed))
        .collect();

    let orphans: Vec<String> = index.orphans().into_iter().map(|n| n.id.clone()).collect();

    let mut unplaced: Vec<String> = nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| !placed.contains(id))
        .collect::<HashSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    unplaced.sort();

    if !unplaced.is_empty() {
        debug!(
            placed = placed.len(),
            unplaced = unplaced.len(),
            orphans = orphans.len(),
            "forest is incomplete"
        );
    }

    Forest {
        roots,
        orphans,
        unplaced,
    }
}

fn place<'a>(
    index: &NodeIndex<'a>,
    node: &'a ImageNode,
    depth: usize,
    placed: &mut HashSet<&'a str>,
) -> TreeNode {
    placed.insert(node.id.as_str());
    let mut children = Vec::new();
    for child in index.children(&node.id) {
        if placed.contains(child.id.as_str()) {
            continue;
        }
        children.push(place(index, child, depth + 1, placed));
    }
    TreeNode {
        node_id: node.id.clone(),
        depth,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{node, node_at};
    use crate::index::NodeIndex;
    use proptest::prelude::*;

    #[test]
    fn single_edge() {
        let nodes = vec![node("a", None), node("b", Some("a"))];
        let forest = build_forest(&nodes);

        assert_eq!(forest.roots.len(), 1);
        let root = &forest.roots[0];
        assert_eq!(root.node_id, "a");
        assert_eq!(root.depth, 0);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].node_id, "b");
        assert_eq!(root.children[0].depth, 1);
        assert!(forest.is_complete());
    }

    #[test]
    fn empty_input() {
        let forest = build_forest(&[]);
        assert!(forest.is_empty());
        assert_eq!(forest.len(), 0);
        assert_eq!(forest.max_depth(), None);
    }

    #[test]
    fn iteration_is_pre_order() {
        let nodes = vec![
            node_at("r", None, 0),
            node_at("x", Some("r"), 2),
            node_at("y", Some("r"), 1),
            node_at("y1", Some("y"), 3),
            node_at("s", None, 5),
        ];
        let forest = build_forest(&nodes);
        let order: Vec<&str> = forest.iter().map(|n| n.node_id.as_str()).collect();
        assert_eq!(order, ["r", "y", "y1", "x", "s"]);
        assert_eq!(forest.max_depth(), Some(2));
        assert_eq!(forest.find("y1").unwrap().depth, 2);
        assert!(forest.find("zz").is_none());
    }

    #[test]
    fn orphan_is_not_promoted_to_root() {
        let nodes = vec![
            node("a", None),
            node("c", Some("gone")),
            node("c1", Some("c")),
        ];
        let forest = build_forest(&nodes);
        assert_eq!(forest.roots.len(), 1);
        assert_eq!(forest.orphans, ["c"]);
        assert_eq!(forest.unplaced, ["c", "c1"]);
        assert!(!forest.is_complete());
    }

    #[test]
    fn cycle_members_are_unplaced() {
        let nodes = vec![node("a", None), node("p", Some("q")), node("q", Some("p"))];
        let forest = build_forest(&nodes);
        assert_eq!(forest.len(), 1);
        assert!(forest.orphans.is_empty());
        assert_eq!(forest.unplaced, ["p", "q"]);
    }

    /// Random well-formed forests: node `i` picks a parent among `0..i`.
    fn arb_nodes() -> impl Strategy<Value = Vec<ImageNode>> {
        prop::collection::vec((any::<bool>(), any::<prop::sample::Index>(), 0i64..50), 1..40)
            .prop_map(|picks| {
                picks
                    .iter()
                    .enumerate()
                    .map(|(i, (is_root, pick, secs))| {
                        let parent = if i == 0 || *is_root {
                            None
                        } else {
                            Some(format!("n{}", pick.index(i)))
                        };
                        node_at(&format!("n{i}"), parent.as_deref(), *secs)
                    })
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn every_node_placed_once_at_its_depth(nodes in arb_nodes()) {
            let forest = build_forest(&nodes);
            let index = NodeIndex::new(&nodes);

            prop_assert!(forest.is_complete());
            prop_assert_eq!(forest.len(), nodes.len());

            let mut seen = HashSet::new();
            for placed in forest.iter() {
                prop_assert!(seen.insert(placed.node_id.clone()));
                prop_assert_eq!(placed.depth, index.ancestors(&placed.node_id).len());
            }
        }

        #[test]
        fn parent_chains_terminate(nodes in arb_nodes()) {
            let index = NodeIndex::new(&nodes);
            for n in &nodes {
                prop_assert!(index.ancestors(&n.id).len() < nodes.len());
            }
        }
    }
}
