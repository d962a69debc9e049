use std::path::PathBuf;

use pixtree_dag::DagError;
use pixtree_query::QueryError;
use pixtree_refs::RefError;
use pixtree_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PixtreeError {
    /// An entity or blob is absent. Always carries the missing id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("not a pixtree working copy: {}", .0.display())]
    NotInitialized(PathBuf),

    #[error("invalid parent {parent} for node {node}: {reason}")]
    InvalidParent {
        node: String,
        parent: String,
        reason: String,
    },

    #[error("cannot check out {node}: it belongs to tree {node_tree}, current tree is {current_tree}")]
    CrossTreeCheckout {
        node: String,
        node_tree: String,
        current_tree: String,
    },

    #[error("no tree selected; switch to a tree first")]
    NoTreeSelected,

    #[error("circular parent reference at {0}")]
    CircularReference(String),

    #[error("invalid rating {0}: must be between 1 and 5")]
    InvalidRating(u8),

    #[error("node {node} has {children} child node(s); reparent them or delete them first")]
    HasChildren { node: String, children: usize },

    #[error("tree {tree} still holds {nodes} node(s); use cascade to delete them")]
    TreeNotEmpty { tree: String, nodes: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Opaque failure reported by a generation or analysis backend.
    #[error("backend failure: {0}")]
    BackendFailure(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("storage error: {0}")]
    StorageIo(StoreError),

    #[error("context store error: {0}")]
    Context(RefError),
}

impl PixtreeError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StoreError> for PixtreeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { kind, id } => Self::not_found(kind.as_str(), id),
            StoreError::BlobNotFound(hash) => Self::not_found("blob", hash.to_hex()),
            StoreError::AlreadyInitialized(path) => Self::AlreadyInitialized(path),
            StoreError::NotInitialized(path) => Self::NotInitialized(path),
            StoreError::Config(msg) => Self::Config(msg),
            other => Self::StorageIo(other),
        }
    }
}

impl From<std::io::Error> for PixtreeError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageIo(StoreError::Io(e))
    }
}

impl From<RefError> for PixtreeError {
    fn from(e: RefError) -> Self {
        match e {
            RefError::CrossTreeCheckout {
                node,
                node_tree,
                current_tree,
            } => Self::CrossTreeCheckout {
                node,
                node_tree,
                current_tree,
            },
            RefError::NoTreeSelected { .. } => Self::NoTreeSelected,
            other => Self::Context(other),
        }
    }
}

impl From<DagError> for PixtreeError {
    fn from(e: DagError) -> Self {
        match e {
            DagError::NodeNotFound(id) => Self::not_found("node", id),
        }
    }
}

pub type PixtreeResult<T> = Result<T, PixtreeError>;
