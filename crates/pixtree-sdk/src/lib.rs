//! High-level SDK for pixtree.
//!
//! [`Pixtree`] is the single entry point: it owns a working copy and
//! exposes every user-level operation (trees, generation, import, tagging,
//! lineage, search, diff, validation, export). Model calls go through the
//! [`GenerationBackend`] and [`AnalysisBackend`] traits supplied by the
//! caller.

pub mod backend;
pub mod error;
pub mod export;
pub mod nodes;
pub mod options;
pub mod repository;
pub mod stats;
pub mod trees;
pub mod view;

#[cfg(test)]
mod testutil;

pub use backend::{
    AnalysisBackend, BackendError, FileBackend, GenerationBackend, GenerationOutput,
    GenerationRequest,
};
pub use error::{PixtreeError, PixtreeResult};
pub use options::{GenerateOptions, ImportOptions, ParentChoice};
pub use repository::Pixtree;
pub use view::{DeleteNodeOutcome, DeleteTreeOutcome, ExportedFile, NodeLineage, Status, TreeView};

// Re-export key types
pub use pixtree_dag::{Issue, IssueKind, ValidationReport};
pub use pixtree_diff::{NodeDiff, ParamChange, PromptDiff, WordChange};
pub use pixtree_query::{SearchFilter, SortOrder};
pub use pixtree_store::PixtreeConfig;
pub use pixtree_types::{
    Dimensions, ExportRecord, ImageNode, ModelConfig, Project, Rating, Tree, TreePurpose,
};
