//! Append-only export history, one list per node.

use std::path::PathBuf;

use pixtree_types::ExportRecord;
use tracing::debug;

use crate::entity::is_storable_id;
use crate::error::{StoreError, StoreResult};
use crate::fs::{read_json, write_json};
use crate::layout::StoreLayout;

/// Where export records are kept.
pub trait ExportStore: Send + Sync {
    /// Append a record to the node's history.
    fn append(&self, record: &ExportRecord) -> StoreResult<()>;

    /// Every export of a node, oldest first. Empty if never exported.
    fn history(&self, node_id: &str) -> StoreResult<Vec<ExportRecord>>;
}

/// Export history under `exports/`, one `{node-id}.json` per node.
#[derive(Clone, Debug)]
pub struct FsExportLog {
    dir: PathBuf,
}

impl FsExportLog {
    pub fn new(layout: &StoreLayout) -> Self {
        Self {
            dir: layout.exports_dir(),
        }
    }

    fn path_for(&self, node_id: &str) -> StoreResult<PathBuf> {
        if !is_storable_id(node_id) {
            return Err(StoreError::Serialization(format!(
                "unsafe node id {node_id:?}"
            )));
        }
        Ok(self.dir.join(format!("{node_id}.json")))
    }
}

impl ExportStore for FsExportLog {
    fn append(&self, record: &ExportRecord) -> StoreResult<()> {
        let path = self.path_for(&record.node_id)?;
        let mut history: Vec<ExportRecord> = read_json(&path)?.unwrap_or_default();
        history.push(record.clone());
        write_json(&path, &history)?;
        debug!(node = %record.node_id, entries = history.len(), "recorded export");
        Ok(())
    }

    fn history(&self, node_id: &str) -> StoreResult<Vec<ExportRecord>> {
        Ok(read_json(&self.path_for(node_id)?)?.unwrap_or_default())
    }
}
