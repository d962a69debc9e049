//! Arena + index over a flat slice of nodes.
//!
//! [`NodeIndex`] is built once per query in O(n log n): an id -> slot map and
//! a parent-id -> children map whose sibling groups are sorted by creation
//! time, ties broken by id. Every structural query reads from it.

use std::collections::{HashMap, HashSet, VecDeque};

use pixtree_types::{ImageNode, StructuralPosition, TreeMetadata};

use crate::error::{DagError, DagResult};

/// Index over a borrowed node slice.
#[derive(Debug)]
pub struct NodeIndex<'a> {
    nodes: &'a [ImageNode],
    by_id: HashMap<&'a str, usize>,
    children: HashMap<&'a str, Vec<usize>>,
    roots: Vec<usize>,
}

impl<'a> NodeIndex<'a> {
    /// Index `nodes`. If an id appears twice, the first occurrence wins.
    pub fn new(nodes: &'a [ImageNode]) -> Self {
        let mut by_id = HashMap::with_capacity(nodes.len());
        for (slot, node) in nodes.iter().enumerate() {
            by_id.entry(node.id.as_str()).or_insert(slot);
        }

        let mut children: HashMap<&'a str, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();
        for (slot, node) in nodes.iter().enumerate() {
            if by_id.get(node.id.as_str()) != Some(&slot) {
                continue;
            }
            match node.parent_id.as_deref() {
                Some(parent) => children.entry(parent).or_default().push(slot),
                None => roots.push(slot),
            }
        }

        let order = |a: &usize, b: &usize| {
            let (na, nb) = (&nodes[*a], &nodes[*b]);
            na.created_at
                .cmp(&nb.created_at)
                .then_with(|| na.id.cmp(&nb.id))
        };
        for group in children.values_mut() {
            group.sort_by(order);
        }
        roots.sort_by(order);

        Self {
            nodes,
            by_id,
            children,
            roots,
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&'a ImageNode> {
        self.by_id.get(id).map(|&slot| &self.nodes[slot])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Nodes without a parent, in display order.
    pub fn roots(&self) -> Vec<&'a ImageNode> {
        self.roots.iter().map(|&slot| &self.nodes[slot]).collect()
    }

    /// Direct children of `id`, in display order.
    pub fn children(&self, id: &str) -> Vec<&'a ImageNode> {
        self.children
            .get(id)
            .map(|group| group.iter().map(|&slot| &self.nodes[slot]).collect())
            .unwrap_or_default()
    }

    pub fn child_count(&self, id: &str) -> usize {
        self.children.get(id).map_or(0, Vec::len)
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.child_count(id) > 0
    }

    /// Nodes whose declared parent is not in the indexed set.
    pub fn orphans(&self) -> Vec<&'a ImageNode> {
        let mut out: Vec<&'a ImageNode> = self
            .by_id
            .values()
            .map(|&slot| &self.nodes[slot])
            .filter(|n| matches!(n.parent_id.as_deref(), Some(p) if !self.contains(p)))
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Parent chain of `id`, nearest first. Stops at a root, at a missing
    /// parent, or when the chain revisits a node.
    pub fn ancestors(&self, id: &str) -> Vec<&'a ImageNode> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(id);
        let mut current = self.get(id);
        while let Some(node) = current {
            let Some(parent_id) = node.parent_id.as_deref() else {
                break;
            };
            if !seen.insert(parent_id) {
                break;
            }
            current = self.get(parent_id);
            if let Some(parent) = current {
                out.push(parent);
            }
        }
        out
    }

    /// Every node below `id`, breadth first, in display order per level.
    pub fn descendants(&self, id: &str) -> Vec<&'a ImageNode> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(id);
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for child in self.children(current) {
                if seen.insert(child.id.as_str()) {
                    out.push(child);
                    queue.push_back(child.id.as_str());
                }
            }
        }
        out
    }

    /// Other children of the same parent (or other roots), in display order.
    pub fn siblings(&self, id: &str) -> Vec<&'a ImageNode> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        let group = match node.parent_id.as_deref() {
            Some(parent) => self.children(parent),
            None => self.roots(),
        };
        group.into_iter().filter(|n| n.id != id).collect()
    }

    /// Chain from `id` up to its root, the node itself first.
    pub fn path_to_root(&self, id: &str) -> DagResult<Vec<&'a ImageNode>> {
        let node = self
            .get(id)
            .ok_or_else(|| DagError::NodeNotFound(id.to_string()))?;
        let mut path = vec![node];
        path.extend(self.ancestors(id));
        Ok(path)
    }

    /// Full lineage of a node for display.
    pub fn lineage(&self, id: &str) -> DagResult<Lineage<'a>> {
        let mut path = self.path_to_root(id)?;
        path.reverse();
        let node = path[path.len() - 1];
        Ok(Lineage {
            node,
            path_from_root: path,
            children: self.children(id),
            siblings: self.siblings(id),
            descendant_count: self.descendants(id).len(),
        })
    }

    /// Number of indexed ancestors of every indexed node.
    ///
    /// One breadth-first pass from the roots and orphans. Only nodes that
    /// hang off a parent cycle fall back to walking their chain.
    fn depths(&self) -> HashMap<&'a str, usize> {
        let nodes = self.nodes;
        let mut depths = HashMap::with_capacity(self.len());
        let mut queue: VecDeque<(usize, usize)> =
            self.roots.iter().map(|&slot| (slot, 0)).collect();
        queue.extend(
            self.orphans()
                .into_iter()
                .filter_map(|n| self.by_id.get(n.id.as_str()))
                .map(|&slot| (slot, 0)),
        );
        while let Some((slot, depth)) = queue.pop_front() {
            let id = nodes[slot].id.as_str();
            if depths.insert(id, depth).is_some() {
                continue;
            }
            if let Some(group) = self.children.get(id) {
                queue.extend(group.iter().map(|&child| (child, depth + 1)));
            }
        }
        for &id in self.by_id.keys() {
            depths.entry(id).or_insert_with(|| self.ancestors(id).len());
        }
        depths
    }

    /// Structural position of every indexed node, keyed by id.
    fn positions(&self) -> HashMap<&'a str, StructuralPosition> {
        let nodes = self.nodes;
        let depths = self.depths();
        let mut out = HashMap::with_capacity(self.len());
        // Every indexed slot sits in exactly one sibling group.
        for group in self.children.values().chain(std::iter::once(&self.roots)) {
            for (sibling_index, &slot) in group.iter().enumerate() {
                let id = nodes[slot].id.as_str();
                out.insert(
                    id,
                    StructuralPosition {
                        depth: depths.get(id).copied().unwrap_or(0),
                        sibling_index,
                        has_children: self.has_children(id),
                    },
                );
            }
        }
        out
    }
}

/// Where a node sits in its derivation tree.
#[derive(Debug)]
pub struct Lineage<'a> {
    pub node: &'a ImageNode,
    /// Root first, the node itself last.
    pub path_from_root: Vec<&'a ImageNode>,
    pub children: Vec<&'a ImageNode>,
    pub siblings: Vec<&'a ImageNode>,
    pub descendant_count: usize,
}

/// Recompute `position` on every node. Returns the ids whose stored
/// position changed, so callers persist only those.
pub fn compute_positions(nodes: &mut [ImageNode]) -> Vec<String> {
    let computed: HashMap<String, StructuralPosition> = {
        let index = NodeIndex::new(nodes);
        index
            .positions()
            .into_iter()
            .map(|(id, pos)| (id.to_string(), pos))
            .collect()
    };

    let mut changed = Vec::new();
    for node in nodes.iter_mut() {
        if let Some(pos) = computed.get(&node.id) {
            if node.position != *pos {
                node.position = *pos;
                changed.push(node.id.clone());
            }
        }
    }
    changed
}

/// Recompute a tree's cached aggregates from its member nodes.
pub fn tree_metadata(nodes: &[ImageNode]) -> TreeMetadata {
    let index = NodeIndex::new(nodes);
    let depths = index.depths();
    let mut meta = TreeMetadata {
        total_nodes: index.len(),
        max_depth: depths.values().copied().max().unwrap_or(0),
        ..TreeMetadata::default()
    };
    for node in nodes {
        if index.get(&node.id).map(|n| std::ptr::eq(n, node)) != Some(true) {
            continue;
        }
        meta.total_size += node.file.size;
        match index.child_count(&node.id) {
            0 => meta.leaf_count += 1,
            1 => {}
            _ => meta.branch_count += 1,
        }
    }
    meta
}
