use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Name of the working-copy directory created by `init`.
pub const WORKING_DIR: &str = ".pixtree";

const PROJECT_FILE: &str = "project.json";
const CONTEXT_FILE: &str = "context.json";
const CONFIG_FILE: &str = "config.toml";
const IMAGES_DIR: &str = "images";
const NODES_DIR: &str = "nodes";
const TREES_DIR: &str = "trees";
const EXPORTS_DIR: &str = "exports";

/// Paths of every file and directory inside a working copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    /// Layout rooted directly at `root` (the `.pixtree` directory itself).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout for the working copy inside `workdir`, i.e. `workdir/.pixtree`.
    pub fn in_workdir(workdir: &Path) -> Self {
        Self::new(workdir.join(WORKING_DIR))
    }

    /// Walk up from `start` looking for a `.pixtree` directory.
    pub fn discover(start: &Path) -> Option<Self> {
        start
            .ancestors()
            .map(|dir| dir.join(WORKING_DIR))
            .find(|candidate| candidate.join(PROJECT_FILE).is_file())
            .map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_file(&self) -> PathBuf {
        self.root.join(PROJECT_FILE)
    }

    pub fn context_file(&self) -> PathBuf {
        self.root.join(CONTEXT_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    pub fn nodes_dir(&self) -> PathBuf {
        self.root.join(NODES_DIR)
    }

    pub fn trees_dir(&self) -> PathBuf {
        self.root.join(TREES_DIR)
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.root.join(EXPORTS_DIR)
    }

    /// Resolve a blob path stored on a node (relative to the root).
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// A working copy exists once the project file has been written.
    pub fn is_initialized(&self) -> bool {
        self.project_file().is_file()
    }

    /// Create the directory skeleton. Fails if a project already exists.
    pub fn create(&self) -> StoreResult<()> {
        if self.is_initialized() {
            return Err(StoreError::AlreadyInitialized(self.root.clone()));
        }
        for dir in [
            self.images_dir(),
            self.nodes_dir(),
            self.trees_dir(),
            self.exports_dir(),
        ] {
            fs::create_dir_all(&dir)?;
        }
        debug!(root = %self.root.display(), "created working copy layout");
        Ok(())
    }

    /// Fail with `NotInitialized` unless the project file exists.
    pub fn ensure_initialized(&self) -> StoreResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(StoreError::NotInitialized(self.root.clone()))
        }
    }
}
