use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::{new_id, EntityKind};

/// Why a tree exists. Smart import uses this to find a tree to reuse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreePurpose {
    #[default]
    Exploration,
    Refinement,
    Variation,
    Import,
    Other,
}

impl TreePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exploration => "exploration",
            Self::Refinement => "refinement",
            Self::Variation => "variation",
            Self::Import => "import",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TreePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreePurpose {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exploration" => Ok(Self::Exploration),
            "refinement" => Ok(Self::Refinement),
            "variation" => Ok(Self::Variation),
            "import" => Ok(Self::Import),
            "other" => Ok(Self::Other),
            other => Err(TypeError::UnknownPurpose(other.to_string())),
        }
    }
}

/// Cached aggregates over a tree's member nodes.
///
/// This is a cache, never a source of truth: it must always be derivable by
/// recomputation from the nodes themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeMetadata {
    pub total_nodes: usize,
    pub max_depth: usize,
    pub total_size: u64,
    /// Nodes with more than one child.
    pub branch_count: usize,
    /// Nodes with no children.
    pub leaf_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub generations: usize,
    pub imports: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_model: Option<String>,
}

/// A named collection of derivation chains, e.g. one creative direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub purpose: TreePurpose,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    #[serde(default)]
    pub metadata: TreeMetadata,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub stats: TreeStats,
}

impl Tree {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>, purpose: TreePurpose) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(EntityKind::Tree),
            project_id: project_id.into(),
            name: name.into(),
            description: None,
            purpose,
            created_at: now,
            last_accessed: now,
            metadata: TreeMetadata::default(),
            tags: BTreeSet::new(),
            favorite: false,
            archived: false,
            stats: TreeStats::default(),
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tree_defaults() {
        let tree = Tree::new("project-x", "portraits", TreePurpose::Exploration);
        assert!(tree.id.starts_with("tree-"));
        assert_eq!(tree.metadata, TreeMetadata::default());
        assert!(!tree.archived);
        assert!(!tree.favorite);
    }

    #[test]
    fn purpose_parse_roundtrip() {
        for purpose in [
            TreePurpose::Exploration,
            TreePurpose::Refinement,
            TreePurpose::Variation,
            TreePurpose::Import,
            TreePurpose::Other,
        ] {
            assert_eq!(purpose.as_str().parse::<TreePurpose>().unwrap(), purpose);
        }
        assert_eq!(
            "nonsense".parse::<TreePurpose>().unwrap_err(),
            TypeError::UnknownPurpose("nonsense".into())
        );
    }

    #[test]
    fn missing_optional_fields_deserialize() {
        let json = serde_json::json!({
            "id": "tree-0000000001-abcdefgh",
            "project_id": "project-0000000001-abcdefgh",
            "name": "legacy",
            "created_at": "2024-01-01T00:00:00Z",
            "last_accessed": "2024-01-01T00:00:00Z"
        });
        let tree: Tree = serde_json::from_value(json).unwrap();
        assert_eq!(tree.purpose, TreePurpose::Exploration);
        assert!(tree.tags.is_empty());
    }
}
