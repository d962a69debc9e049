//! Search predicates.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use pixtree_types::{ImageNode, Rating};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// A conjunction of optional predicates. The empty filter matches every
/// node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// The node must carry every one of these tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Case-insensitive substring of the prompt, description, or a tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<Rating>,
    /// Exact model name, e.g. `nano-banana`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    /// Inclusive lower bound on `created_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_children: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_leaf: Option<bool>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn min_rating(mut self, rating: Rating) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn in_tree(mut self, tree_id: impl Into<String>) -> Self {
        self.tree_id = Some(tree_id.into());
        self
    }

    pub fn favorite(mut self, favorite: bool) -> Self {
        self.favorite = Some(favorite);
        self
    }

    pub fn created_after(mut self, at: DateTime<Utc>) -> Self {
        self.created_after = Some(at);
        self
    }

    pub fn created_before(mut self, at: DateTime<Utc>) -> Self {
        self.created_before = Some(at);
        self
    }

    pub fn has_children(mut self, value: bool) -> Self {
        self.has_children = Some(value);
        self
    }

    pub fn is_leaf(mut self, value: bool) -> Self {
        self.is_leaf = Some(value);
        self
    }

    /// `true` when no predicate is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reject filters whose date range can match nothing.
    pub fn validate(&self) -> QueryResult<()> {
        if let (Some(after), Some(before)) = (self.created_after, self.created_before) {
            if after > before {
                return Err(QueryError::InvertedDateRange {
                    after: after.to_rfc3339(),
                    before: before.to_rfc3339(),
                });
            }
        }
        Ok(())
    }

    /// Evaluate every predicate against one node. `parents` is the set of
    /// ids that appear as some node's `parent_id` in the full input.
    pub(crate) fn matches(&self, node: &ImageNode, parents: &HashSet<&str>) -> bool {
        if !self.tags.is_subset(&node.tags) {
            return false;
        }
        if let Some(text) = &self.text {
            if !matches_text(node, &text.to_lowercase()) {
                return false;
            }
        }
        if let Some(min) = self.min_rating {
            if node.rating.map_or(true, |r| r < min) {
                return false;
            }
        }
        if let Some(model) = &self.model {
            if node.model_name() != Some(model.as_str()) {
                return false;
            }
        }
        if let Some(tree) = &self.tree_id {
            if node.tree_id != *tree {
                return false;
            }
        }
        if let Some(favorite) = self.favorite {
            if node.favorite != favorite {
                return false;
            }
        }
        if self.created_after.is_some_and(|t| node.created_at < t) {
            return false;
        }
        if self.created_before.is_some_and(|t| node.created_at > t) {
            return false;
        }
        let has_children = parents.contains(node.id.as_str());
        if self.has_children.is_some_and(|want| want != has_children) {
            return false;
        }
        if self.is_leaf.is_some_and(|want| want == has_children) {
            return false;
        }
        true
    }
}

fn matches_text(node: &ImageNode, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);
    node.prompt().is_some_and(hit)
        || node.description.as_deref().is_some_and(hit)
        || node.tags.iter().any(|t| hit(t))
}
