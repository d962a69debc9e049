//! Cached aggregates and integrity checks.
//!
//! Trees and the project carry derived counters so listings stay cheap.
//! Every mutation recomputes them from the nodes; `repair_metadata` does
//! the same on demand after out-of-band edits.

use std::collections::{BTreeMap, BTreeSet};

use pixtree_dag::{compute_positions, tree_metadata, validate_tree, ValidationReport};
use pixtree_types::{ImageNode, Project, TagCount, Tree};
use tracing::{debug, info};

use crate::error::PixtreeResult;
use crate::repository::Pixtree;

impl Pixtree {
    /// Recompute node positions and the tree's metadata and stats.
    pub fn refresh_tree_stats(&self, tree_id: &str) -> PixtreeResult<Tree> {
        let mut tree = self.load_tree(tree_id)?;
        let mut members = self.tree_nodes(tree_id)?;

        let changed = compute_positions(&mut members);
        for node in members.iter().filter(|n| changed.contains(&n.id)) {
            self.entities.save(node)?;
        }

        tree.metadata = tree_metadata(&members);
        tree.stats.generations = members.iter().filter(|n| n.is_generated()).count();
        tree.stats.imports = members.iter().filter(|n| n.is_imported()).count();
        tree.stats.last_model = members
            .iter()
            .filter(|n| n.is_generated())
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .and_then(|n| n.model_name())
            .map(str::to_string);
        self.entities.save(&tree)?;

        debug!(tree = %tree.id, nodes = tree.metadata.total_nodes, repositioned = changed.len(), "refreshed tree");
        Ok(tree)
    }

    /// Recompute project-wide totals, tag usage, and rating summary.
    pub fn refresh_project_stats(&self) -> PixtreeResult<Project> {
        let mut project = self.entities.project()?;
        let trees = self.all_trees()?;
        let nodes = self.all_nodes()?;

        let meta = &mut project.metadata;
        meta.total_trees = trees.len();
        meta.total_nodes = nodes.len();
        meta.tags = nodes
            .iter()
            .flat_map(|n| n.tags.iter().cloned())
            .chain(trees.iter().flat_map(|t| t.tags.iter().cloned()))
            .collect::<BTreeSet<_>>();
        meta.favorite_count = nodes.iter().filter(|n| n.favorite).count();
        let ratings: Vec<f64> = nodes
            .iter()
            .filter_map(|n| n.rating)
            .map(|r| f64::from(r.value()))
            .collect();
        meta.average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        };

        let mut by_model = BTreeMap::new();
        for name in nodes.iter().filter_map(ImageNode::model_name) {
            *by_model.entry(name.to_string()).or_insert(0) += 1;
        }
        project.stats.generations_by_model = by_model;
        project.stats.imports = nodes.iter().filter(|n| n.is_imported()).count();
        project.stats.top_tags = top_tags(&nodes, self.config.top_tags_limit);

        self.entities.save(&project)?;
        Ok(project)
    }

    // ---- Integrity ----

    /// Check one tree's parent references, cycles, and cached metadata.
    pub fn validate_tree(&self, tree_id: &str) -> PixtreeResult<ValidationReport> {
        let tree = self.load_tree(tree_id)?;
        let nodes = self.all_nodes()?;
        Ok(validate_tree(&tree, &nodes))
    }

    /// Validate every tree, ordered by tree id.
    pub fn validate_all(&self) -> PixtreeResult<Vec<ValidationReport>> {
        let nodes = self.all_nodes()?;
        let mut trees = self.all_trees()?;
        trees.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(trees.iter().map(|t| validate_tree(t, &nodes)).collect())
    }

    /// Recompute cached positions and aggregates for a tree and the
    /// project. Structural problems (cycles, dangling parents) are left
    /// for the user to resolve.
    pub fn repair_metadata(&self, tree_id: &str) -> PixtreeResult<Tree> {
        let tree = self.refresh_tree_stats(tree_id)?;
        self.refresh_project_stats()?;
        info!(tree = %tree.id, "repaired metadata");
        Ok(tree)
    }
}

/// Most used node tags, by count then name.
fn top_tags(nodes: &[ImageNode], limit: usize) -> Vec<TagCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tag in nodes.iter().flat_map(|n| n.tags.iter()) {
        *counts.entry(tag.as_str()).or_insert(0) += 1;
    }
    let mut ranked: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    ranked.truncate(limit);
    ranked
}
