//! Derivation hierarchy for pixtree.
//!
//! Nodes are persisted as flat records, each naming at most one parent.
//! This crate rebuilds the parent/child structure on demand; it holds no
//! persistent state of its own.
//!
//! - [`NodeIndex`] -- arena + parent-id index over a node slice
//! - [`build_forest`] -- reconstruct the derivation forest of a tree
//! - [`render_forest`] -- ASCII rendering for terminals
//! - [`validate_tree`] -- report orphaned parents, cycles, and metadata drift
//! - [`compute_positions`] / [`tree_metadata`] -- recompute derived caches

pub mod error;
pub mod forest;
pub mod index;
pub mod render;
pub mod validate;

#[cfg(test)]
mod fixtures;

pub use error::{DagError, DagResult};
pub use forest::{build_forest, Forest, TreeNode};
pub use index::{compute_positions, tree_metadata, Lineage, NodeIndex};
pub use render::render_forest;
pub use validate::{validate_tree, Issue, IssueKind, ValidationReport};
