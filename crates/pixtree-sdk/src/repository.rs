use std::path::{Path, PathBuf};
use std::sync::Arc;

use pixtree_refs::{ContextStore, FsContextStore, WorkspaceContext};
use pixtree_store::{
    BlobStore, EntityRepository, ExportStore, FsBlobStore, FsExportLog, PixtreeConfig,
    StoreLayout,
};
use pixtree_types::{ImageNode, Project, Tree};
use tracing::{debug, info, warn};

use crate::backend::AnalysisBackend;
use crate::error::{PixtreeError, PixtreeResult};
use crate::view::Status;

/// High-level pixtree working copy API.
///
/// Every method is one user-level operation: it loads what it needs, writes
/// whole entities back, and leaves no state cached between calls.
pub struct Pixtree {
    pub(crate) layout: StoreLayout,
    pub(crate) config: PixtreeConfig,
    pub(crate) entities: EntityRepository,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) contexts: Arc<dyn ContextStore>,
    pub(crate) exports: Arc<dyn ExportStore>,
    pub(crate) analyzer: Option<Box<dyn AnalysisBackend>>,
}

impl std::fmt::Debug for Pixtree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pixtree")
            .field("root", &self.layout.root())
            .field("analyzer", &self.analyzer.is_some())
            .finish_non_exhaustive()
    }
}

impl Pixtree {
    /// Create a working copy in `workdir/.pixtree` with a new project.
    pub fn init(workdir: &Path, name: &str) -> PixtreeResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PixtreeError::InvalidArgument("project name is empty".into()));
        }
        let layout = StoreLayout::in_workdir(workdir);
        layout.create()?;

        let config_file = layout.config_file();
        let config = PixtreeConfig::load(&config_file)?;
        if !config_file.exists() {
            config.save(&config_file)?;
        }

        let repo = Self::from_layout(layout, config);
        let mut project = Project::new(name);
        project.settings.default_model = Some(repo.config.default_model.clone());
        repo.entities.save(&project)?;
        repo.save_context(&repo.new_context())?;

        info!(project = %project.id, root = %repo.layout.root().display(), "initialized working copy");
        Ok(repo)
    }

    /// Open the working copy in `workdir/.pixtree`.
    pub fn open(workdir: &Path) -> PixtreeResult<Self> {
        let layout = StoreLayout::in_workdir(workdir);
        layout.ensure_initialized()?;
        let config = PixtreeConfig::load(&layout.config_file())?;
        debug!(root = %layout.root().display(), "opened working copy");
        Ok(Self::from_layout(layout, config))
    }

    /// Open the nearest working copy at or above `start`.
    pub fn discover(start: &Path) -> PixtreeResult<Self> {
        let layout = StoreLayout::discover(start)
            .ok_or_else(|| PixtreeError::NotInitialized(start.to_path_buf()))?;
        let config = PixtreeConfig::load(&layout.config_file())?;
        Ok(Self::from_layout(layout, config))
    }

    fn from_layout(layout: StoreLayout, config: PixtreeConfig) -> Self {
        Self {
            entities: EntityRepository::open(&layout),
            blobs: Arc::new(FsBlobStore::new(&layout)),
            contexts: Arc::new(FsContextStore::new(layout.context_file())),
            exports: Arc::new(FsExportLog::new(&layout)),
            analyzer: None,
            config,
            layout,
        }
    }

    /// Swap every storage backend, e.g. for in-memory stores.
    ///
    /// If the new entity store holds no project yet, the current project
    /// and workspace context are copied into the new stores. The layout
    /// keeps anchoring the config file and the paths recorded on nodes.
    pub fn with_stores(
        mut self,
        entities: EntityRepository,
        blobs: Arc<dyn BlobStore>,
        contexts: Arc<dyn ContextStore>,
        exports: Arc<dyn ExportStore>,
    ) -> PixtreeResult<Self> {
        match entities.project() {
            Ok(project) => debug!(project = %project.id, "new stores already hold a project"),
            Err(e) if e.is_not_found() => {
                entities.save(&self.entities.project()?)?;
                contexts.save(&self.context()?)?;
            }
            Err(e) => return Err(e.into()),
        }
        self.entities = entities;
        self.blobs = blobs;
        self.contexts = contexts;
        self.exports = exports;
        Ok(self)
    }

    /// Attach an analysis backend used by imports.
    pub fn with_analyzer(mut self, analyzer: Box<dyn AnalysisBackend>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn config(&self) -> &PixtreeConfig {
        &self.config
    }

    /// Absolute path of a node's blob.
    pub fn image_path(&self, node: &ImageNode) -> PathBuf {
        self.layout.resolve(&node.image_path)
    }

    // ---- Project ----

    /// The project, without refreshing its access time.
    pub fn project(&self) -> PixtreeResult<Project> {
        Ok(self.entities.project()?)
    }

    pub fn rename_project(&self, name: &str) -> PixtreeResult<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PixtreeError::InvalidArgument("project name is empty".into()));
        }
        let mut project = self.entities.project()?;
        project.name = name.to_string();
        project.touch();
        self.entities.save(&project)?;
        Ok(project)
    }

    /// Model used by `generate` when the caller names none.
    pub fn set_default_model(&self, model: &str) -> PixtreeResult<Project> {
        let mut project = self.entities.project()?;
        project.settings.default_model = Some(model.to_string());
        self.entities.save(&project)?;
        Ok(project)
    }

    /// Tree that receives imports when the caller names none.
    pub fn set_default_import_tree(&self, tree_id: Option<&str>) -> PixtreeResult<Project> {
        if let Some(id) = tree_id {
            self.load_tree(id)?;
        }
        let mut project = self.entities.project()?;
        project.settings.default_import_tree = tree_id.map(str::to_string);
        self.entities.save(&project)?;
        Ok(project)
    }

    // ---- Context ----

    fn new_context(&self) -> WorkspaceContext {
        WorkspaceContext::new().with_recent_limit(self.config.recent_trees_limit)
    }

    /// The persisted workspace context.
    pub fn context(&self) -> PixtreeResult<WorkspaceContext> {
        let mut ctx = self.contexts.load()?;
        ctx.set_recent_limit(self.config.recent_trees_limit);
        Ok(ctx)
    }

    pub(crate) fn save_context(&self, ctx: &WorkspaceContext) -> PixtreeResult<()> {
        Ok(self.contexts.save(ctx)?)
    }

    /// Make `tree_id` the current tree. Clears the current node.
    pub fn switch_tree(&self, tree_id: &str) -> PixtreeResult<Tree> {
        let mut tree = self.load_tree(tree_id)?;
        tree.touch();
        self.entities.save(&tree)?;

        let mut ctx = self.context()?;
        ctx.switch_tree(&tree.id);
        self.save_context(&ctx)?;
        Ok(tree)
    }

    /// Make `node_id` the current node. It must belong to the current tree.
    ///
    /// A missing node fails with `NotFound` before the context is touched.
    pub fn checkout(&self, node_id: &str) -> PixtreeResult<ImageNode> {
        let node = self.load_node(node_id)?;
        let mut ctx = self.context()?;
        ctx.checkout(&node)?;
        self.save_context(&ctx)?;
        Ok(node)
    }

    /// Drop the current node, keeping the current tree.
    pub fn clear_node(&self) -> PixtreeResult<()> {
        let mut ctx = self.context()?;
        ctx.clear_node();
        self.save_context(&ctx)
    }

    /// The current tree, or `NoTreeSelected`.
    pub fn current_tree(&self) -> PixtreeResult<Tree> {
        let ctx = self.context()?;
        let id = ctx.current_tree().ok_or(PixtreeError::NoTreeSelected)?;
        self.load_tree(id)
    }

    /// Summary of the working copy. Refreshes the project's access time.
    pub fn status(&self) -> PixtreeResult<Status> {
        let mut project = self.entities.project()?;
        project.touch();
        self.entities.save(&project)?;

        let ctx = self.context()?;
        let current_tree = match ctx.current_tree() {
            Some(id) => self.stale_tolerant(self.entities.find::<Tree>(id), id)?,
            None => None,
        };
        let current_node = match (&current_tree, ctx.current_node()) {
            (Some(_), Some(id)) => self.stale_tolerant(self.entities.find::<ImageNode>(id), id)?,
            _ => None,
        };
        let mut recent_trees = Vec::new();
        for id in &ctx.recent_trees {
            if let Some(tree) = self.entities.find::<Tree>(id)? {
                recent_trees.push(tree);
            }
        }

        Ok(Status {
            project,
            current_tree,
            current_node,
            recent_trees,
            blob_bytes: self.blobs.total_bytes()?,
        })
    }

    fn stale_tolerant<T>(
        &self,
        found: pixtree_store::StoreResult<Option<T>>,
        id: &str,
    ) -> PixtreeResult<Option<T>> {
        let found = found?;
        if found.is_none() {
            warn!(id, "context points at a missing entity");
        }
        Ok(found)
    }

    // ---- Loading helpers ----

    pub(crate) fn load_tree(&self, id: &str) -> PixtreeResult<Tree> {
        Ok(self.entities.load::<Tree>(id)?)
    }

    pub(crate) fn load_node(&self, id: &str) -> PixtreeResult<ImageNode> {
        Ok(self.entities.load::<ImageNode>(id)?)
    }

    pub(crate) fn all_nodes(&self) -> PixtreeResult<Vec<ImageNode>> {
        Ok(self.entities.load_all::<ImageNode>()?)
    }

    pub(crate) fn all_trees(&self) -> PixtreeResult<Vec<Tree>> {
        Ok(self.entities.load_all::<Tree>()?)
    }
}
