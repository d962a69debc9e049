use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::fs::{read_optional, write_atomic};

/// User configuration read from `config.toml` in the working copy.
///
/// Every field has a default, so a missing file or a partial file is fine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixtreeConfig {
    /// Length of the most-recently-used tree list.
    pub recent_trees_limit: usize,
    /// Model used when neither the caller nor the project names one.
    pub default_model: String,
    /// Run the analysis backend on every import.
    pub analyze_on_import: bool,
    /// Number of tags kept in project usage statistics.
    pub top_tags_limit: usize,
    /// Smart import reuses an import tree created within this many seconds.
    pub smart_import_window_secs: u64,
}

impl Default for PixtreeConfig {
    fn default() -> Self {
        Self {
            recent_trees_limit: 10,
            default_model: "nano-banana".to_string(),
            analyze_on_import: false,
            top_tags_limit: 10,
            smart_import_window_secs: 3600,
        }
    }
}

impl PixtreeConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let Some(data) = read_optional(path)? else {
            return Ok(Self::default());
        };
        let text = String::from_utf8(data).map_err(|e| StoreError::Config(e.to_string()))?;
        let config: Self = toml::from_str(&text).map_err(|e| StoreError::Config(e.to_string()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))?;
        write_atomic(path, text.as_bytes())?;
        Ok(())
    }
}
