//! The [`ContextStore`] trait defining how the context is persisted.

use crate::context::WorkspaceContext;
use crate::error::Result;

/// Storage backend for the workspace context.
///
/// A working copy holds at most one context. `load` on a store that has
/// never been written returns the empty context rather than an error.
pub trait ContextStore: Send + Sync {
    fn load(&self) -> Result<WorkspaceContext>;

    /// Replace the stored context. Must be atomic: a reader sees either the
    /// previous context or the new one.
    fn save(&self, context: &WorkspaceContext) -> Result<()>;
}
