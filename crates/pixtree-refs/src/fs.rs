//! File-backed context store: a single `context.json`.

use std::path::{Path, PathBuf};

use pixtree_store::fs::{read_optional, write_atomic};
use tracing::debug;

use crate::context::WorkspaceContext;
use crate::error::Result;
use crate::traits::ContextStore;

#[derive(Clone, Debug)]
pub struct FsContextStore {
    path: PathBuf,
}

impl FsContextStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContextStore for FsContextStore {
    fn load(&self) -> Result<WorkspaceContext> {
        match read_optional(&self.path)? {
            Some(data) => Ok(serde_json::from_slice(&data)?),
            None => Ok(WorkspaceContext::default()),
        }
    }

    fn save(&self, context: &WorkspaceContext) -> Result<()> {
        let mut data = serde_json::to_vec_pretty(context)?;
        data.push(b'\n');
        write_atomic(&self.path, &data)?;

        debug!(
            path = %self.path.display(),
            tree = ?context.current_tree,
            node = ?context.current_node,
            "saved context"
        );
        Ok(())
    }
}
