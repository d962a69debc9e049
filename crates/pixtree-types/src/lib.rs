//! Foundation types for pixtree.
//!
//! This crate provides the identifiers, content hashes, and entity model
//! shared by every other pixtree crate.
//!
//! # Key Types
//!
//! - [`EntityKind`] / [`new_id`] -- Sortable `{kind}-{time}-{suffix}` identifiers
//! - [`ContentHash`] -- BLAKE3 digest of a stored image blob (dedup key)
//! - [`Project`] -- The single top-level container of a working copy
//! - [`Tree`] -- A named collection of derivation chains
//! - [`ImageNode`] -- One generated or imported artifact
//! - [`ModelConfig`] -- Tagged per-model generation parameters
//! - [`Rating`] -- Validated 1..=5 user rating

pub mod error;
pub mod hash;
pub mod id;
pub mod model;
pub mod node;
pub mod project;
pub mod tree;

pub use error::TypeError;
pub use hash::ContentHash;
pub use id::{new_id, parse_id, EntityKind, ParsedId};
pub use model::ModelConfig;
pub use node::{
    Dimensions, ExportRecord, FileMetadata, ImageAnalysis, ImageFormat, ImageNode, ImportInfo,
    Rating, StructuralPosition,
};
pub use project::{Project, ProjectMetadata, ProjectSettings, ProjectStats, TagCount};
pub use tree::{Tree, TreeMetadata, TreePurpose, TreeStats};
