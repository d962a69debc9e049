//! Whole-node comparison.

use std::collections::BTreeMap;

use pixtree_types::ImageNode;

use crate::params::{diff_params, ParamDiff};
use crate::prompt::{diff_prompts, PromptDiff};

/// What differs between two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDiff {
    pub from: String,
    pub to: String,
    pub from_model: Option<String>,
    pub to_model: Option<String>,
    pub prompt: PromptDiff,
    pub params: ParamDiff,
    pub tags_added: Vec<String>,
    pub tags_removed: Vec<String>,
    /// Both nodes point at identical image bytes.
    pub same_image: bool,
    pub same_tree: bool,
    /// `to` was derived directly from `from`.
    pub is_parent_of: bool,
}

impl NodeDiff {
    pub fn model_changed(&self) -> bool {
        self.from_model != self.to_model
    }

    /// Nothing user-visible differs except identity.
    pub fn is_empty(&self) -> bool {
        !self.model_changed()
            && self.prompt.is_empty()
            && self.params.is_empty()
            && self.tags_added.is_empty()
            && self.tags_removed.is_empty()
            && self.same_image
    }
}

/// Compare `from` against `to`. Nodes without generation data (imports)
/// compare as an empty prompt with no parameters.
pub fn diff_nodes(from: &ImageNode, to: &ImageNode) -> NodeDiff {
    let no_params = BTreeMap::new();
    let from_params = from.generation.as_ref().map(|g| g.parameters());
    let to_params = to.generation.as_ref().map(|g| g.parameters());

    NodeDiff {
        from: from.id.clone(),
        to: to.id.clone(),
        from_model: from.model_name().map(str::to_string),
        to_model: to.model_name().map(str::to_string),
        prompt: diff_prompts(from.prompt().unwrap_or(""), to.prompt().unwrap_or("")),
        params: diff_params(
            from_params.as_ref().unwrap_or(&no_params),
            to_params.as_ref().unwrap_or(&no_params),
        ),
        tags_added: to.tags.difference(&from.tags).cloned().collect(),
        tags_removed: from.tags.difference(&to.tags).cloned().collect(),
        same_image: from.image_hash == to.image_hash,
        same_tree: from.tree_id == to.tree_id,
        is_parent_of: to.parent_id.as_deref() == Some(from.id.as_str()),
    }
}
