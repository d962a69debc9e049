//! Workspace context for pixtree.
//!
//! The context is the working copy's equivalent of a checked-out branch: it
//! names the tree the user is working in, optionally the node new
//! generations derive from, and a short most-recently-used list of trees.
//!
//! # States
//!
//! - **NoTree**: nothing selected.
//! - **TreeSelected**: a current tree, no current node.
//! - **TreeAndNodeSelected**: a current tree and a node inside it.
//!
//! The context is a plain value. Callers load it through a
//! [`ContextStore`], pass it to operations that need it, and save it back.
//!
//! # Modules
//!
//! - [`error`] -- Error types for context operations
//! - [`context`] -- [`WorkspaceContext`] and its state transitions
//! - [`traits`] -- The [`ContextStore`] persistence interface
//! - [`fs`] -- [`FsContextStore`], backed by `context.json`
//! - [`memory`] -- [`InMemoryContextStore`] for tests

pub mod context;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use context::{ContextState, WorkspaceContext, DEFAULT_RECENT_LIMIT};
pub use error::{RefError, Result};
pub use fs::FsContextStore;
pub use memory::InMemoryContextStore;
pub use traits::ContextStore;
