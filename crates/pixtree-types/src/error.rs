use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("malformed identifier: {0}")]
    MalformedId(String),

    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("unknown tree purpose: {0}")]
    UnknownPurpose(String),
}
