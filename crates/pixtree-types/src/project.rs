use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{new_id, EntityKind};

/// Aggregates over every node and tree in the project.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub total_trees: usize,
    pub total_nodes: usize,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub favorite_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Tree that receives imports when the caller names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_import_tree: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    #[serde(default)]
    pub generations_by_model: BTreeMap<String, usize>,
    #[serde(default)]
    pub imports: usize,
    #[serde(default)]
    pub top_tags: Vec<TagCount>,
}

/// The single top-level container of a working copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    #[serde(default)]
    pub metadata: ProjectMetadata,
    #[serde(default)]
    pub settings: ProjectSettings,
    #[serde(default)]
    pub stats: ProjectStats,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(EntityKind::Project),
            name: name.into(),
            description: None,
            created_at: now,
            last_accessed: now,
            metadata: ProjectMetadata::default(),
            settings: ProjectSettings::default(),
            stats: ProjectStats::default(),
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }
}
