//! Tree-level operations.

use std::collections::{BTreeSet, HashSet};

use pixtree_types::{EntityKind, Tree, TreePurpose};
use tracing::info;

use crate::error::{PixtreeError, PixtreeResult};
use crate::repository::Pixtree;
use crate::view::{DeleteTreeOutcome, TreeView};

impl Pixtree {
    pub fn create_tree(
        &self,
        name: &str,
        purpose: TreePurpose,
        description: Option<&str>,
    ) -> PixtreeResult<Tree> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PixtreeError::InvalidArgument("tree name is empty".into()));
        }
        let project = self.entities.project()?;
        let mut tree = Tree::new(&project.id, name, purpose);
        tree.description = description.map(str::to_string);
        self.entities.save(&tree)?;
        self.refresh_project_stats()?;
        info!(tree = %tree.id, name = %tree.name, purpose = %tree.purpose, "created tree");
        Ok(tree)
    }

    /// Load a tree for display. Refreshes its access time.
    pub fn get_tree(&self, id: &str) -> PixtreeResult<Tree> {
        let mut tree = self.load_tree(id)?;
        tree.touch();
        self.entities.save(&tree)?;
        Ok(tree)
    }

    /// Trees ordered by most recent access.
    pub fn list_trees(&self, include_archived: bool) -> PixtreeResult<Vec<Tree>> {
        let mut trees: Vec<Tree> = self
            .all_trees()?
            .into_iter()
            .filter(|t| include_archived || !t.archived)
            .collect();
        trees.sort_by(|a, b| {
            b.last_accessed
                .cmp(&a.last_accessed)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(trees)
    }

    /// A tree with its member nodes and assembled forest.
    pub fn tree_view(&self, id: &str) -> PixtreeResult<TreeView> {
        let tree = self.get_tree(id)?;
        let nodes = self.tree_nodes(id)?;
        Ok(TreeView::new(tree, nodes))
    }

    pub fn rename_tree(&self, id: &str, name: &str) -> PixtreeResult<Tree> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PixtreeError::InvalidArgument("tree name is empty".into()));
        }
        self.update_tree(id, |tree| tree.name = name.to_string())
    }

    pub fn describe_tree(&self, id: &str, description: Option<&str>) -> PixtreeResult<Tree> {
        self.update_tree(id, |tree| tree.description = description.map(str::to_string))
    }

    pub fn set_tree_purpose(&self, id: &str, purpose: TreePurpose) -> PixtreeResult<Tree> {
        self.update_tree(id, |tree| tree.purpose = purpose)
    }

    pub fn tag_tree(&self, id: &str, add: &[String], remove: &[String]) -> PixtreeResult<Tree> {
        let add = normalize_tags(add);
        let remove = normalize_tags(remove);
        self.update_tree(id, |tree| {
            tree.tags.extend(add);
            tree.tags.retain(|t| !remove.contains(t));
        })
    }

    pub fn set_tree_favorite(&self, id: &str, favorite: bool) -> PixtreeResult<Tree> {
        self.update_tree(id, |tree| tree.favorite = favorite)
    }

    /// Hide a tree from default listings. Nodes are untouched.
    pub fn archive_tree(&self, id: &str) -> PixtreeResult<Tree> {
        self.update_tree(id, |tree| tree.archived = true)
    }

    pub fn unarchive_tree(&self, id: &str) -> PixtreeResult<Tree> {
        self.update_tree(id, |tree| tree.archived = false)
    }

    /// Delete a tree. Without `cascade`, a tree that still has nodes is
    /// refused. With it, member nodes are deleted too, along with any blob
    /// no remaining node references.
    pub fn delete_tree(&self, id: &str, cascade: bool) -> PixtreeResult<DeleteTreeOutcome> {
        let tree = self.load_tree(id)?;
        let all = self.all_nodes()?;
        let (members, others): (Vec<_>, Vec<_>) = all.into_iter().partition(|n| n.tree_id == tree.id);
        if !members.is_empty() && !cascade {
            return Err(PixtreeError::TreeNotEmpty {
                tree: tree.id,
                nodes: members.len(),
            });
        }

        for node in &members {
            self.entities.delete(EntityKind::Node, &node.id)?;
        }
        let still_used: HashSet<_> = others.iter().map(|n| n.image_hash).collect();
        let mut blobs_removed = BTreeSet::new();
        for node in &members {
            if !still_used.contains(&node.image_hash)
                && !blobs_removed.contains(&node.image_hash)
                && self.blobs.delete(&node.image_hash)?
            {
                blobs_removed.insert(node.image_hash);
            }
        }
        self.entities.delete(EntityKind::Tree, &tree.id)?;

        let mut project = self.entities.project()?;
        if project.settings.default_import_tree.as_deref() == Some(tree.id.as_str()) {
            project.settings.default_import_tree = None;
            self.entities.save(&project)?;
        }

        let mut ctx = self.context()?;
        ctx.on_tree_deleted(&tree.id);
        self.save_context(&ctx)?;
        self.refresh_project_stats()?;

        info!(tree = %tree.id, nodes = members.len(), blobs = blobs_removed.len(), "deleted tree");
        Ok(DeleteTreeOutcome {
            tree_id: tree.id,
            nodes_deleted: members.len(),
            blobs_removed,
        })
    }

    fn update_tree(&self, id: &str, change: impl FnOnce(&mut Tree)) -> PixtreeResult<Tree> {
        let mut tree = self.load_tree(id)?;
        change(&mut tree);
        tree.touch();
        self.entities.save(&tree)?;
        Ok(tree)
    }
}

/// Trim, lowercase, and drop empty tags.
pub(crate) fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> BTreeSet<String> {
    tags.iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
