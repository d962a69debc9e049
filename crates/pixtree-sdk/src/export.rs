//! Copying images out of the working copy and recording where they went.

use std::path::Path;

use chrono::Utc;
use pixtree_store::fs::write_atomic;
use pixtree_types::ExportRecord;
use tracing::info;

use crate::error::{PixtreeError, PixtreeResult};
use crate::repository::Pixtree;
use crate::view::ExportedFile;

impl Pixtree {
    /// Copy a node's image into `dest_dir` as `{name}.{ext}` and record the
    /// export. The name defaults to the node id.
    pub fn export_node(
        &self,
        node_id: &str,
        dest_dir: &Path,
        custom_name: Option<&str>,
    ) -> PixtreeResult<ExportedFile> {
        let node = self.load_node(node_id)?;
        let name = match custom_name.map(str::trim) {
            Some(name) if name.is_empty() || name.contains(['/', '\\']) => {
                return Err(PixtreeError::InvalidArgument(format!(
                    "invalid export name {name:?}"
                )))
            }
            Some(name) => name.to_string(),
            None => node.id.clone(),
        };
        let format = node.file.format.extension();
        let bytes = self.blobs.get(&node.image_hash)?;

        std::fs::create_dir_all(dest_dir)?;
        let path = dest_dir.join(format!("{name}.{format}"));
        write_atomic(&path, &bytes)?;

        let record = self.record_export(
            &node.id,
            &path.display().to_string(),
            format,
            custom_name.map(str::trim),
        )?;
        info!(node = %node.id, path = %path.display(), "exported image");
        Ok(ExportedFile { path, record })
    }

    /// Append an export record for a node without copying anything, for
    /// exports performed by other tools.
    pub fn record_export(
        &self,
        node_id: &str,
        destination: &str,
        format: &str,
        custom_name: Option<&str>,
    ) -> PixtreeResult<ExportRecord> {
        self.load_node(node_id)?;
        let record = ExportRecord {
            node_id: node_id.to_string(),
            exported_at: Utc::now(),
            destination: destination.to_string(),
            custom_name: custom_name.map(str::to_string),
            format: format.to_string(),
        };
        self.exports.append(&record)?;
        Ok(record)
    }

    /// Every recorded export of a node, oldest first.
    pub fn export_history(&self, node_id: &str) -> PixtreeResult<Vec<ExportRecord>> {
        self.load_node(node_id)?;
        Ok(self.exports.history(node_id)?)
    }
}
