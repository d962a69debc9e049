//! Error types for workspace context operations.

use thiserror::Error;

/// Errors that can occur while changing or persisting the context.
#[derive(Debug, Error)]
pub enum RefError {
    /// The node belongs to a tree other than the current one.
    #[error("cannot check out {node}: it belongs to tree {node_tree}, current tree is {current_tree}")]
    CrossTreeCheckout {
        node: String,
        node_tree: String,
        current_tree: String,
    },

    /// A node checkout was attempted with no current tree.
    #[error("cannot check out {node}: no tree selected")]
    NoTreeSelected { node: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error while reading or writing the context file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RefError {
    fn from(e: serde_json::Error) -> Self {
        RefError::Serialization(e.to_string())
    }
}

/// Convenience type alias for context operations.
pub type Result<T> = std::result::Result<T, RefError>;
