//! Error types for hierarchy queries.

/// Errors that can occur during hierarchy queries.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DagError {
    /// The node is not part of the indexed set.
    #[error("node not found: {0}")]
    NodeNotFound(String),
}

/// Convenience alias for hierarchy results.
pub type DagResult<T> = Result<T, DagError>;
