use std::path::PathBuf;

use pixtree_types::{ContentHash, EntityKind};

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// No blob is stored for this hash.
    #[error("blob not found: {0}")]
    BlobNotFound(ContentHash),

    /// Blob content no longer hashes to its name (data corruption).
    #[error("hash mismatch for blob {expected}: computed {computed}")]
    HashMismatch {
        expected: ContentHash,
        computed: ContentHash,
    },

    /// A working copy already exists at this location.
    #[error("already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    /// No working copy exists at this location.
    #[error("not a pixtree working copy: {}", .0.display())]
    NotInitialized(PathBuf),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration file could not be parsed or written.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::BlobNotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
