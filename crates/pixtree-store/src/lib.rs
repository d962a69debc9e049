//! Storage backends for pixtree.
//!
//! A working copy keeps everything under one root directory:
//!
//! ```text
//! .pixtree/
//!   project.json      the single Project entity
//!   context.json      workspace pointer state (owned by pixtree-refs)
//!   config.toml       optional user configuration
//!   images/           content-addressed blobs, `{blake3-hex}.{ext}`
//!   nodes/            one `{node-id}.json` per ImageNode
//!   trees/            one `{tree-id}.json` per Tree
//!   exports/          one `{node-id}.json` export history per node
//! ```
//!
//! # Backends
//!
//! - [`BlobStore`] -- content store: `put` dedups by hash, `get` verifies it
//! - [`EntityStore`] -- raw per-entity file storage
//! - [`EntityRepository`] -- typed load/save/list/delete over an [`EntityStore`]
//! - [`ExportStore`] -- append-only export history per node
//!
//! Filesystem and in-memory implementations exist for each trait.
//!
//! # Design Rules
//!
//! 1. Blobs are immutable; identical bytes are stored at most once.
//! 2. Every file is written to a temp file in its target directory and
//!    renamed into place, so a failed write leaves no partial file.
//! 3. Entities are read-modify-write: callers load, merge, and save whole.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod blob;
pub mod config;
pub mod entity;
pub mod error;
pub mod export;
pub mod fs;
pub mod layout;
pub mod memory;

pub use blob::{BlobStore, FsBlobStore, StoredBlob};
pub use config::PixtreeConfig;
pub use entity::{Entity, EntityRepository, EntityStore, FsEntityStore};
pub use error::{StoreError, StoreResult};
pub use export::{ExportStore, FsExportLog};
pub use layout::StoreLayout;
pub use memory::{InMemoryBlobStore, InMemoryEntityStore, InMemoryExportLog};
