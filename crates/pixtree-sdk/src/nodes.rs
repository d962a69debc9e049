//! Node-level operations: creation, edits, deletion, and lineage.

use std::collections::HashSet;
use std::path::Path;

use chrono::{Duration, Utc};
use pixtree_dag::NodeIndex;
use pixtree_diff::NodeDiff;
use pixtree_query::{search, SearchFilter};
use pixtree_types::{
    new_id, EntityKind, FileMetadata, ImageNode, ImportInfo, Rating, Tree, TreePurpose,
};
use tracing::{debug, info, warn};

use crate::backend::{GenerationBackend, GenerationRequest};
use crate::error::{PixtreeError, PixtreeResult};
use crate::options::{GenerateOptions, ImportOptions, ParentChoice};
use crate::repository::Pixtree;
use crate::trees::normalize_tags;
use crate::view::{DeleteNodeOutcome, NodeLineage};

impl Pixtree {
    // ---- Reads ----

    /// Load a node by id.
    pub fn get_node(&self, id: &str) -> PixtreeResult<ImageNode> {
        self.load_node(id)
    }

    /// Every node of a tree, in no particular order.
    pub fn tree_nodes(&self, tree_id: &str) -> PixtreeResult<Vec<ImageNode>> {
        Ok(self
            .all_nodes()?
            .into_iter()
            .filter(|n| n.tree_id == tree_id)
            .collect())
    }

    /// Nodes matching `filter`, in storage order.
    ///
    /// Filter tags are normalized the same way stored tags are.
    pub fn search(&self, filter: &SearchFilter) -> PixtreeResult<Vec<ImageNode>> {
        filter.validate()?;
        let mut filter = filter.clone();
        filter.tags = normalize_tags(&filter.tags.iter().collect::<Vec<_>>());
        let nodes = self.all_nodes()?;
        Ok(search(&filter, &nodes).into_iter().cloned().collect())
    }

    /// Compare two nodes: prompt words, parameters, tags.
    pub fn diff_nodes(&self, from: &str, to: &str) -> PixtreeResult<NodeDiff> {
        let from = self.load_node(from)?;
        let to = self.load_node(to)?;
        Ok(pixtree_diff::diff_nodes(&from, &to))
    }

    /// Ancestors, children, and siblings of a node within its tree.
    pub fn lineage(&self, id: &str) -> PixtreeResult<NodeLineage> {
        let node = self.load_node(id)?;
        let members = self.tree_nodes(&node.tree_id)?;
        let index = NodeIndex::new(&members);
        let lineage = index.lineage(id)?;
        let owned = |nodes: Vec<&ImageNode>| nodes.into_iter().cloned().collect::<Vec<_>>();
        Ok(NodeLineage {
            node: lineage.node.clone(),
            path_from_root: owned(lineage.path_from_root),
            children: owned(lineage.children),
            siblings: owned(lineage.siblings),
            descendant_count: lineage.descendant_count,
        })
    }

    /// Raw image bytes of a node.
    pub fn read_image(&self, id: &str) -> PixtreeResult<Vec<u8>> {
        let node = self.load_node(id)?;
        Ok(self.blobs.get(&node.image_hash)?)
    }

    // ---- Creation ----

    /// Generate a new image with `backend` and record it as a node.
    ///
    /// The target tree defaults to the current tree and the parent to the
    /// current node. On success the new node becomes current. A backend
    /// failure persists nothing.
    pub fn generate(
        &self,
        options: GenerateOptions,
        backend: &dyn GenerationBackend,
    ) -> PixtreeResult<ImageNode> {
        let prompt = options.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(PixtreeError::InvalidArgument("prompt is empty".into()));
        }
        let mut ctx = self.context()?;
        let tree_id = match options.tree.as_deref().or(ctx.current_tree()) {
            Some(id) => id.to_string(),
            None => return Err(PixtreeError::NoTreeSelected),
        };
        let tree = self.load_tree(&tree_id)?;
        let node_id = new_id(EntityKind::Node);

        let parent_id = match &options.parent {
            ParentChoice::Root => None,
            ParentChoice::Node(id) => Some(id.clone()),
            ParentChoice::Current if ctx.current_tree() == Some(tree.id.as_str()) => {
                ctx.current_node().map(str::to_string)
            }
            ParentChoice::Current => None,
        };
        let parent = match &parent_id {
            Some(id) => Some(self.require_parent(&node_id, id, &tree)?),
            None => None,
        };

        let project = self.entities.project()?;
        let config = match options.config {
            Some(config) => config,
            None => {
                let model = options
                    .model
                    .or(project.settings.default_model.clone())
                    .unwrap_or_else(|| self.config.default_model.clone());
                pixtree_types::ModelConfig::for_model(&model, &prompt)
            }
        };
        let request = GenerationRequest {
            prompt: prompt.clone(),
            config,
            source_image: match &parent {
                Some(p) => Some(self.blobs.get(&p.image_hash)?),
                None => None,
            },
        };

        debug!(tree = %tree.id, parent = ?parent_id, model = %request.config.model_name(), "generating");
        let output = backend
            .generate(&request)
            .map_err(|e| PixtreeError::BackendFailure(e.0))?;

        let stored = self.blobs.put(&output.image_bytes)?;
        let file = FileMetadata {
            size: stored.size,
            dimensions: output.dimensions,
            format: stored.format,
            generation_secs: Some(output.duration_secs),
            has_alpha: false,
        };
        let mut node = ImageNode::new(
            &project.id,
            &tree.id,
            parent_id,
            stored.hash,
            stored.relative_path,
            file,
        );
        node.id = node_id;
        node.generation = Some(output.parameters);
        node.tags = normalize_tags(&options.tags.iter().collect::<Vec<_>>());
        node.description = options.description;
        self.entities.save(&node)?;

        self.refresh_tree_stats(&tree.id)?;
        self.refresh_project_stats()?;

        if ctx.current_tree() != Some(tree.id.as_str()) {
            ctx.switch_tree(&tree.id);
        }
        ctx.checkout(&node)?;
        self.save_context(&ctx)?;

        info!(node = %node.id, tree = %tree.id, model = ?node.model_name(), "generated node");
        self.load_node(&node.id)
    }

    /// Import an image file as a new node.
    ///
    /// Without an explicit tree the target is, in order: the project's
    /// default import tree, the newest import tree created within the
    /// configured window, or a new tree named `Imported <date>`.
    pub fn import_image(&self, path: &Path, options: ImportOptions) -> PixtreeResult<ImageNode> {
        let bytes = std::fs::read(path)?;
        let tree = match options.tree.as_deref() {
            Some(id) => self.load_tree(id)?,
            None => self.smart_import_tree()?,
        };
        let node_id = new_id(EntityKind::Node);
        if let Some(parent) = options.parent.as_deref() {
            self.require_parent(&node_id, parent, &tree)?;
        }

        let analysis = if options.analyze.unwrap_or(self.config.analyze_on_import) {
            match &self.analyzer {
                Some(analyzer) => match analyzer.analyze(&bytes) {
                    Ok(analysis) => Some(analysis),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "image analysis failed; importing without it");
                        None
                    }
                },
                None => {
                    warn!("analysis requested but no analyzer is configured");
                    None
                }
            }
        } else {
            None
        };

        let project = self.entities.project()?;
        let stored = self.blobs.put(&bytes)?;
        let file = FileMetadata {
            size: stored.size,
            format: stored.format,
            ..FileMetadata::default()
        };
        let mut node = ImageNode::new(
            &project.id,
            &tree.id,
            options.parent.clone(),
            stored.hash,
            stored.relative_path,
            file,
        );
        node.id = node_id;
        node.import = Some(ImportInfo {
            original_path: path.display().to_string(),
            filename: path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            imported_at: Utc::now(),
        });
        node.tags = normalize_tags(&options.tags.iter().collect::<Vec<_>>());
        node.description = options
            .description
            .or_else(|| analysis.as_ref().map(|a| a.description.clone()));
        node.analysis = analysis;
        self.entities.save(&node)?;

        self.refresh_tree_stats(&tree.id)?;
        self.refresh_project_stats()?;
        info!(node = %node.id, tree = %tree.id, path = %path.display(), "imported image");
        self.load_node(&node.id)
    }

    fn smart_import_tree(&self) -> PixtreeResult<Tree> {
        let project = self.entities.project()?;
        if let Some(id) = project.settings.default_import_tree.as_deref() {
            match self.entities.find::<Tree>(id)? {
                Some(tree) if !tree.archived => return Ok(tree),
                Some(_) => debug!(tree = id, "default import tree is archived"),
                None => warn!(tree = id, "default import tree no longer exists"),
            }
        }

        let window = Duration::seconds(self.config.smart_import_window_secs as i64);
        let cutoff = Utc::now() - window;
        let recent = self
            .all_trees()?
            .into_iter()
            .filter(|t| t.purpose == TreePurpose::Import && !t.archived && t.created_at >= cutoff)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(tree) = recent {
            return Ok(tree);
        }

        let name = format!("Imported {}", Utc::now().format("%Y-%m-%d"));
        self.create_tree(&name, TreePurpose::Import, None)
    }

    /// `parent_id` must name an existing node of `tree`.
    fn require_parent(&self, node_id: &str, parent_id: &str, tree: &Tree) -> PixtreeResult<ImageNode> {
        let invalid = |reason: String| PixtreeError::InvalidParent {
            node: node_id.to_string(),
            parent: parent_id.to_string(),
            reason,
        };
        let parent = self
            .entities
            .find::<ImageNode>(parent_id)?
            .ok_or_else(|| invalid("no such node".into()))?;
        if parent.tree_id != tree.id {
            return Err(invalid(format!(
                "it belongs to tree {}, not {}",
                parent.tree_id, tree.id
            )));
        }
        Ok(parent)
    }

    // ---- Edits ----

    pub fn add_tags<S: AsRef<str>>(&self, id: &str, tags: &[S]) -> PixtreeResult<ImageNode> {
        let tags = normalize_tags(tags);
        self.update_node(id, |node| {
            node.tags.extend(tags);
            Ok(())
        })
    }

    pub fn remove_tags<S: AsRef<str>>(&self, id: &str, tags: &[S]) -> PixtreeResult<ImageNode> {
        let tags = normalize_tags(tags);
        self.update_node(id, |node| {
            node.tags.retain(|t| !tags.contains(t));
            Ok(())
        })
    }

    /// Set or clear (`None`) a node's rating. Ratings are 1 to 5.
    pub fn set_rating(&self, id: &str, rating: Option<u8>) -> PixtreeResult<ImageNode> {
        let rating = rating
            .map(|r| Rating::new(r).map_err(|_| PixtreeError::InvalidRating(r)))
            .transpose()?;
        self.update_node(id, |node| {
            node.rating = rating;
            Ok(())
        })
    }

    pub fn set_favorite(&self, id: &str, favorite: bool) -> PixtreeResult<ImageNode> {
        self.update_node(id, |node| {
            node.favorite = favorite;
            Ok(())
        })
    }

    pub fn set_description(&self, id: &str, description: Option<&str>) -> PixtreeResult<ImageNode> {
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        self.update_node(id, |node| {
            node.description = description.map(str::to_string);
            Ok(())
        })
    }

    /// Move a node under a new parent in the same tree, or make it a root.
    ///
    /// Fails with `CircularReference` if `parent_id` is the node itself or
    /// one of its descendants.
    pub fn reparent_node(&self, id: &str, parent_id: Option<&str>) -> PixtreeResult<ImageNode> {
        let node = self.load_node(id)?;
        let tree = self.load_tree(&node.tree_id)?;
        if let Some(parent_id) = parent_id {
            self.require_parent(id, parent_id, &tree)?;
            let members = self.tree_nodes(&tree.id)?;
            let index = NodeIndex::new(&members);
            if parent_id == id || index.descendants(id).iter().any(|d| d.id == parent_id) {
                return Err(PixtreeError::CircularReference(id.to_string()));
            }
        }
        let node = self.update_node(id, |node| {
            node.parent_id = parent_id.map(str::to_string);
            Ok(())
        })?;
        self.refresh_tree_stats(&tree.id)?;
        self.load_node(&node.id)
    }

    fn update_node(
        &self,
        id: &str,
        change: impl FnOnce(&mut ImageNode) -> PixtreeResult<()>,
    ) -> PixtreeResult<ImageNode> {
        let mut node = self.load_node(id)?;
        change(&mut node)?;
        node.touch();
        self.entities.save(&node)?;
        self.refresh_project_stats()?;
        Ok(node)
    }

    // ---- Deletion ----

    /// Delete a node. A node with children is refused unless
    /// `reparent_children` is set, in which case its children move to its
    /// parent (or become roots). The blob is removed only when no other
    /// node references the same bytes.
    pub fn delete_node(&self, id: &str, reparent_children: bool) -> PixtreeResult<DeleteNodeOutcome> {
        let node = self.load_node(id)?;
        let all = self.all_nodes()?;
        let children: Vec<&ImageNode> = all
            .iter()
            .filter(|n| n.parent_id.as_deref() == Some(id))
            .collect();
        if !children.is_empty() && !reparent_children {
            return Err(PixtreeError::HasChildren {
                node: node.id,
                children: children.len(),
            });
        }

        let mut reparented = Vec::with_capacity(children.len());
        for child in children {
            let mut child = child.clone();
            child.parent_id = node.parent_id.clone();
            child.touch();
            self.entities.save(&child)?;
            reparented.push(child.id);
        }

        self.entities.delete(EntityKind::Node, &node.id)?;
        let shared = all
            .iter()
            .any(|n| n.id != node.id && n.image_hash == node.image_hash);
        let blob_removed = !shared && self.blobs.delete(&node.image_hash)?;

        let mut ctx = self.context()?;
        if ctx.on_node_deleted(&node.id) {
            self.save_context(&ctx)?;
        }
        self.refresh_tree_stats(&node.tree_id)?;
        self.refresh_project_stats()?;

        info!(node = %node.id, reparented = reparented.len(), blob_removed, "deleted node");
        Ok(DeleteNodeOutcome {
            node_id: node.id,
            reparented,
            blob_removed,
        })
    }

    /// Ids of every node referencing blobs that are missing from the store.
    pub fn missing_blobs(&self) -> PixtreeResult<Vec<String>> {
        let stored: HashSet<_> = self.blobs.list()?.into_iter().collect();
        let mut missing: Vec<String> = self
            .all_nodes()?
            .into_iter()
            .filter(|n| !stored.contains(&n.image_hash))
            .map(|n| n.id)
            .collect();
        missing.sort();
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AnalysisBackend, BackendError};
    use crate::testutil::{generate, workspace, FailingBackend, StaticBackend};
    use pixtree_types::{ImageAnalysis, ModelConfig};

    fn with_tree(px: &Pixtree) -> Tree {
        let tree = px.create_tree("t", TreePurpose::Exploration, None).unwrap();
        px.switch_tree(&tree.id).unwrap();
        tree
    }

    // ---- generate ----

    #[test]
    fn generate_chains_from_current_node() {
        let (_dir, px) = workspace();
        let tree = with_tree(&px);
        let a = generate(&px, "a castle");
        let b = generate(&px, "a castle at dawn");

        assert!(a.is_root());
        assert_eq!(b.parent_id.as_deref(), Some(a.id.as_str()));
        assert_eq!(b.tree_id, tree.id);
        assert_eq!(b.position.depth, 1);
        assert_eq!(px.context().unwrap().current_node(), Some(b.id.as_str()));
        assert!(px.image_path(&b).is_file());

        let tree = px.get_tree(&tree.id).unwrap();
        assert_eq!(tree.metadata.total_nodes, 2);
        assert_eq!(tree.metadata.max_depth, 1);
        assert_eq!(tree.stats.generations, 2);
        assert_eq!(tree.stats.last_model.as_deref(), Some("nano-banana"));
    }

    #[test]
    fn generate_root_and_explicit_parent() {
        let (_dir, px) = workspace();
        with_tree(&px);
        let a = generate(&px, "first");
        let _b = generate(&px, "second");
        let root = px
            .generate(
                GenerateOptions::new("fresh start").parent(ParentChoice::Root),
                &StaticBackend::new(b"root bytes"),
            )
            .unwrap();
        assert!(root.is_root());

        let sibling = px
            .generate(
                GenerateOptions::new("branch")
                    .parent(ParentChoice::Node(a.id.clone()))
                    .model("seedream")
                    .tag("Fog"),
                &StaticBackend::new(b"branch bytes"),
            )
            .unwrap();
        assert_eq!(sibling.parent_id.as_deref(), Some(a.id.as_str()));
        assert_eq!(sibling.model_name(), Some("seedream"));
        assert!(sibling.tags.contains("fog"));
        assert_eq!(sibling.position.sibling_index, 1);
    }

    #[test]
    fn generate_sends_parent_image_to_backend() {
        let (_dir, px) = workspace();
        with_tree(&px);
        generate(&px, "parent");
        let backend = StaticBackend::new(b"child");
        px.generate(GenerateOptions::new("child"), &backend).unwrap();
        let seen = backend.last_request().unwrap();
        assert_eq!(seen.source_image.as_deref(), Some(&b"parent"[..]));
        assert_eq!(seen.prompt, "child");
    }

    #[test]
    fn generate_without_tree_fails() {
        let (_dir, px) = workspace();
        let err = px
            .generate(GenerateOptions::new("x"), &StaticBackend::new(b"x"))
            .unwrap_err();
        assert!(matches!(err, PixtreeError::NoTreeSelected));
    }

    #[test]
    fn backend_failure_persists_nothing() {
        let (_dir, px) = workspace();
        let tree = with_tree(&px);
        let err = px
            .generate(GenerateOptions::new("x"), &FailingBackend("quota exceeded".into()))
            .unwrap_err();
        match err {
            PixtreeError::BackendFailure(msg) => assert_eq!(msg, "quota exceeded"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(px.tree_nodes(&tree.id).unwrap().is_empty());
        assert!(px.blobs.list().unwrap().is_empty());
    }

    #[test]
    fn cross_tree_parent_is_invalid() {
        let (_dir, px) = workspace();
        with_tree(&px);
        let a = generate(&px, "in first tree");
        let other = px.create_tree("other", TreePurpose::Exploration, None).unwrap();
        let err = px
            .generate(
                GenerateOptions::new("x")
                    .in_tree(&other.id)
                    .parent(ParentChoice::Node(a.id.clone())),
                &StaticBackend::new(b"x"),
            )
            .unwrap_err();
        assert!(matches!(err, PixtreeError::InvalidParent { ref parent, .. } if *parent == a.id));
    }

    #[test]
    fn generate_into_other_tree_switches_context() {
        let (_dir, px) = workspace();
        with_tree(&px);
        generate(&px, "a");
        let other = px.create_tree("other", TreePurpose::Exploration, None).unwrap();
        let node = px
            .generate(
                GenerateOptions::new("elsewhere").in_tree(&other.id),
                &StaticBackend::new(b"elsewhere"),
            )
            .unwrap();
        assert!(node.is_root());
        let ctx = px.context().unwrap();
        assert_eq!(ctx.current_tree(), Some(other.id.as_str()));
        assert_eq!(ctx.current_node(), Some(node.id.as_str()));
    }

    #[test]
    fn explicit_config_is_recorded() {
        let (_dir, px) = workspace();
        with_tree(&px);
        let config = ModelConfig::Seedream {
            prompt: "fox".into(),
            width: Some(1024),
            height: Some(768),
            guidance_scale: Some(7.5),
            seed: Some(42),
        };
        let node = px
            .generate(GenerateOptions::new("fox").config(config.clone()), &StaticBackend::new(b"fox"))
            .unwrap();
        assert_eq!(node.generation, Some(config));
    }

    // ---- import ----

    struct FixedAnalyzer(Result<ImageAnalysis, BackendError>);

    impl AnalysisBackend for FixedAnalyzer {
        fn analyze(&self, _image: &[u8]) -> Result<ImageAnalysis, BackendError> {
            self.0.clone()
        }
    }

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn smart_import_reuses_recent_import_tree() {
        let (dir, px) = workspace();
        let first = px
            .import_image(&write_file(dir.path(), "a.png", b"aaa"), ImportOptions::new())
            .unwrap();
        let second = px
            .import_image(&write_file(dir.path(), "b.png", b"bbb"), ImportOptions::new())
            .unwrap();
        assert_eq!(first.tree_id, second.tree_id);

        let tree = px.get_tree(&first.tree_id).unwrap();
        assert_eq!(tree.purpose, TreePurpose::Import);
        assert!(tree.name.starts_with("Imported "));
        assert_eq!(tree.stats.imports, 2);
        assert_eq!(first.import.as_ref().unwrap().filename, "a.png");
        assert!(first.is_imported());
    }

    #[test]
    fn smart_import_prefers_default_tree() {
        let (dir, px) = workspace();
        let inbox = px.create_tree("inbox", TreePurpose::Exploration, None).unwrap();
        px.set_default_import_tree(Some(&inbox.id)).unwrap();
        let node = px
            .import_image(&write_file(dir.path(), "a.jpg", b"jpg"), ImportOptions::new())
            .unwrap();
        assert_eq!(node.tree_id, inbox.id);
    }

    #[test]
    fn import_into_explicit_tree_with_parent() {
        let (dir, px) = workspace();
        let tree = with_tree(&px);
        let base = generate(&px, "base");
        let node = px
            .import_image(
                &write_file(dir.path(), "edit.png", b"edited"),
                ImportOptions::new().in_tree(&tree.id).parent(&base.id).tag("Edit"),
            )
            .unwrap();
        assert_eq!(node.parent_id.as_deref(), Some(base.id.as_str()));
        assert!(node.tags.contains("edit"));
        // Importing does not move the checkout.
        assert_eq!(px.context().unwrap().current_node(), Some(base.id.as_str()));
    }

    #[test]
    fn import_missing_file_is_storage_error() {
        let (dir, px) = workspace();
        let err = px
            .import_image(&dir.path().join("nope.png"), ImportOptions::new())
            .unwrap_err();
        assert!(matches!(err, PixtreeError::StorageIo(_)));
    }

    #[test]
    fn analysis_result_is_kept() {
        let (dir, px) = workspace();
        let analysis = ImageAnalysis {
            description: "a red fox".into(),
            detected_objects: vec!["fox".into()],
            style: Some("photo".into()),
            confidence: 0.9,
        };
        let px = px.with_analyzer(Box::new(FixedAnalyzer(Ok(analysis.clone()))));
        let node = px
            .import_image(&write_file(dir.path(), "fox.png", b"fox"), ImportOptions::new().analyze(true))
            .unwrap();
        assert_eq!(node.analysis, Some(analysis));
        assert_eq!(node.description.as_deref(), Some("a red fox"));
    }

    #[test]
    fn analysis_failure_degrades() {
        let (dir, px) = workspace();
        let px = px.with_analyzer(Box::new(FixedAnalyzer(Err(BackendError::new("offline")))));
        let node = px
            .import_image(&write_file(dir.path(), "fox.png", b"fox"), ImportOptions::new().analyze(true))
            .unwrap();
        assert!(node.analysis.is_none());
    }

    // ---- edits ----

    #[test]
    fn tags_rating_favorite_description() {
        let (_dir, px) = workspace();
        with_tree(&px);
        let node = generate(&px, "castle");

        px.add_tags(&node.id, &["Sky", "moat"]).unwrap();
        let node2 = px.remove_tags(&node.id, &["moat"]).unwrap();
        assert_eq!(node2.tags.iter().collect::<Vec<_>>(), ["sky"]);

        assert!(matches!(
            px.set_rating(&node.id, Some(6)),
            Err(PixtreeError::InvalidRating(6))
        ));
        assert_eq!(px.set_rating(&node.id, Some(4)).unwrap().rating.map(|r| r.value()), Some(4));
        px.set_favorite(&node.id, true).unwrap();
        px.set_description(&node.id, Some("  keeper ")).unwrap();

        let loaded = px.get_node(&node.id).unwrap();
        assert!(loaded.favorite);
        assert_eq!(loaded.description.as_deref(), Some("keeper"));

        let project = px.project().unwrap();
        assert_eq!(project.metadata.favorite_count, 1);
        assert_eq!(project.metadata.average_rating, Some(4.0));
        assert!(project.metadata.tags.contains("sky"));

        px.set_rating(&node.id, None).unwrap();
        assert_eq!(px.project().unwrap().metadata.average_rating, None);
    }

    #[test]
    fn reparent_rejects_cycles() {
        let (_dir, px) = workspace();
        with_tree(&px);
        let a = generate(&px, "a");
        let b = generate(&px, "b");
        let c = generate(&px, "c");

        assert!(matches!(
            px.reparent_node(&a.id, Some(&c.id)),
            Err(PixtreeError::CircularReference(_))
        ));
        assert!(matches!(
            px.reparent_node(&a.id, Some(&a.id)),
            Err(PixtreeError::CircularReference(_))
        ));

        let moved = px.reparent_node(&c.id, Some(&a.id)).unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some(a.id.as_str()));
        assert_eq!(moved.position.sibling_index, 1);
        let root = px.reparent_node(&b.id, None).unwrap();
        assert!(root.is_root());
    }

    // ---- delete ----

    #[test]
    fn shared_blob_survives_deletion() {
        let (_dir, px) = workspace();
        with_tree(&px);
        let a = generate(&px, "same");
        let b = px
            .generate(
                GenerateOptions::new("same again").parent(ParentChoice::Root),
                &StaticBackend::new(b"same"),
            )
            .unwrap();
        assert_eq!(a.image_hash, b.image_hash);

        let outcome = px.delete_node(&a.id, false).unwrap();
        assert!(!outcome.blob_removed);
        assert!(px.image_path(&b).is_file());
        assert_eq!(px.read_image(&b.id).unwrap(), b"same");

        let outcome = px.delete_node(&b.id, false).unwrap();
        assert!(outcome.blob_removed);
        assert!(!px.image_path(&b).exists());
    }

    #[test]
    fn delete_with_children_requires_reparent() {
        let (_dir, px) = workspace();
        let tree = with_tree(&px);
        let a = generate(&px, "a");
        let b = generate(&px, "b");
        let c = generate(&px, "c");

        assert!(matches!(
            px.delete_node(&b.id, false),
            Err(PixtreeError::HasChildren { children: 1, .. })
        ));

        let outcome = px.delete_node(&b.id, true).unwrap();
        assert_eq!(outcome.reparented, [c.id.clone()]);
        let c = px.get_node(&c.id).unwrap();
        assert_eq!(c.parent_id.as_deref(), Some(a.id.as_str()));
        assert_eq!(c.position.depth, 1);
        assert_eq!(px.get_tree(&tree.id).unwrap().metadata.total_nodes, 2);
        assert!(px.get_node(&b.id).unwrap_err().is_not_found());
    }

    #[test]
    fn deleting_current_node_clears_pointer() {
        let (_dir, px) = workspace();
        let tree = with_tree(&px);
        let a = generate(&px, "a");
        px.delete_node(&a.id, false).unwrap();
        let ctx = px.context().unwrap();
        assert_eq!(ctx.current_tree(), Some(tree.id.as_str()));
        assert!(ctx.current_node().is_none());
    }

    // ---- reads ----

    #[test]
    fn lineage_and_search() {
        let (_dir, px) = workspace();
        with_tree(&px);
        let a = generate(&px, "a castle");
        let b = generate(&px, "a castle in fog");
        px.checkout(&a.id).unwrap();
        let c = generate(&px, "a castle at dawn");

        let lineage = px.lineage(&b.id).unwrap();
        assert_eq!(lineage.depth(), 1);
        assert_eq!(lineage.path_from_root[0].id, a.id);
        assert_eq!(lineage.siblings.len(), 1);
        assert_eq!(lineage.siblings[0].id, c.id);

        let hits = px.search(&SearchFilter::new().text("FOG")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, b.id);
        let leaves = px.search(&SearchFilter::new().is_leaf(true)).unwrap();
        assert_eq!(leaves.len(), 2);

        let diff = px.diff_nodes(&a.id, &c.id).unwrap();
        assert_eq!(diff.prompt.added_words().join(" "), "at dawn");
        assert!(diff.is_parent_of);
    }

    #[test]
    fn tag_search_matches_normalized_tags() {
        let (_dir, px) = workspace();
        with_tree(&px);
        let a = generate(&px, "a");
        generate(&px, "b");
        px.add_tags(&a.id, &["Sky"]).unwrap();

        for tag in ["Sky", " sky ", "SKY"] {
            let hits = px.search(&SearchFilter::new().tag(tag)).unwrap();
            assert_eq!(hits.len(), 1, "tag {tag:?}");
            assert_eq!(hits[0].id, a.id);
        }
        assert!(px.search(&SearchFilter::new().tag("sea")).unwrap().is_empty());
    }

    #[test]
    fn missing_blobs_are_reported() {
        let (_dir, px) = workspace();
        with_tree(&px);
        let a = generate(&px, "a");
        std::fs::remove_file(px.image_path(&a)).unwrap();
        assert_eq!(px.missing_blobs().unwrap(), [a.id]);
    }
}
