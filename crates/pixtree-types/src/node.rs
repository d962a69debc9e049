use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::ContentHash;
use crate::id::{new_id, EntityKind};
use crate::model::ModelConfig;

/// A user rating, always within `1..=5`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, TypeError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TypeError::InvalidRating(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = TypeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        r.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/5", self.0)
    }
}

/// Container format detected from the blob's leading bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
    #[default]
    Unknown,
}

impl ImageFormat {
    /// Identify the format by magic bytes. Never decodes the image.
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]) {
            Self::Png
        } else if data.starts_with(&[0xff, 0xd8, 0xff]) {
            Self::Jpeg
        } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Self::Webp
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Self::Gif
        } else {
            Self::Unknown
        }
    }

    /// File extension used for stored blobs.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Unknown => "bin",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Facts about the stored blob.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    pub format: ImageFormat,
    /// Seconds the backend spent producing the image, for generated nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_secs: Option<f64>,
    #[serde(default)]
    pub has_alpha: bool,
}

/// Where an imported image came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportInfo {
    pub original_path: String,
    pub filename: String,
    pub imported_at: DateTime<Utc>,
}

/// Result of the optional AI analysis pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub description: String,
    #[serde(default)]
    pub detected_objects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub confidence: f32,
}

/// Position of a node inside its tree. Derived from the parent edges and
/// refreshed whenever siblings are inserted or removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralPosition {
    pub depth: usize,
    pub sibling_index: usize,
    pub has_children: bool,
}

/// One export of a node's blob to the filesystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub node_id: String,
    pub exported_at: DateTime<Utc>,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    pub format: String,
}

/// One artifact: a generated or imported image.
///
/// `parent_id` is the derivation edge. It must reference a node in the same
/// tree, and following it upward must terminate; both rules are checked by
/// the integrity validator rather than enforced here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageNode {
    pub id: String,
    pub project_id: String,
    pub tree_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Blob path relative to the working-copy root.
    pub image_path: String,
    pub image_hash: ContentHash,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<ModelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportInfo>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub file: FileMetadata,
    #[serde(default)]
    pub position: StructuralPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ImageAnalysis>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImageNode {
    /// Create a node for a blob that has already been stored.
    pub fn new(
        project_id: impl Into<String>,
        tree_id: impl Into<String>,
        parent_id: Option<String>,
        image_hash: ContentHash,
        image_path: impl Into<String>,
        file: FileMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(EntityKind::Node),
            project_id: project_id.into(),
            tree_id: tree_id.into(),
            parent_id,
            image_path: image_path.into(),
            image_hash,
            tags: BTreeSet::new(),
            generation: None,
            import: None,
            favorite: false,
            rating: None,
            description: None,
            file,
            position: StructuralPosition::default(),
            analysis: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_generated(&self) -> bool {
        self.generation.is_some()
    }

    pub fn is_imported(&self) -> bool {
        self.import.is_some()
    }

    pub fn prompt(&self) -> Option<&str> {
        self.generation.as_ref().map(|g| g.prompt())
    }

    pub fn model_name(&self) -> Option<&str> {
        self.generation.as_ref().map(|g| g.model_name())
    }

    /// Short human label: the prompt, the imported filename, or the id.
    pub fn label(&self) -> String {
        if let Some(prompt) = self.prompt() {
            return truncate(prompt, 48);
        }
        if let Some(import) = &self.import {
            return import.filename.clone();
        }
        self.id.clone()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> ImageNode {
        ImageNode::new(
            "project-1",
            "tree-1",
            None,
            ContentHash::of(b"png"),
            "images/abc.png",
            FileMetadata {
                size: 3,
                format: ImageFormat::Png,
                ..Default::default()
            },
        )
    }

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        for v in 1..=5 {
            assert_eq!(Rating::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn rating_rejected_on_deserialize() {
        assert!(serde_json::from_str::<Rating>("9").is_err());
        assert_eq!(serde_json::from_str::<Rating>("4").unwrap().value(), 4);
    }

    #[test]
    fn sniff_formats() {
        assert_eq!(
            ImageFormat::sniff(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0]),
            ImageFormat::Png
        );
        assert_eq!(ImageFormat::sniff(&[0xff, 0xd8, 0xff, 0xe0]), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::sniff(b"RIFF\0\0\0\0WEBPVP8 "), ImageFormat::Webp);
        assert_eq!(ImageFormat::sniff(b"GIF89a...."), ImageFormat::Gif);
        assert_eq!(ImageFormat::sniff(b"hello"), ImageFormat::Unknown);
        assert_eq!(ImageFormat::Unknown.extension(), "bin");
    }

    #[test]
    fn new_node_is_root_with_fresh_id() {
        let node = sample_node();
        assert!(node.id.starts_with("node-"));
        assert!(node.is_root());
        assert!(!node.is_generated());
        assert_eq!(node.created_at, node.updated_at);
    }

    #[test]
    fn label_prefers_prompt_then_filename() {
        let mut node = sample_node();
        assert_eq!(node.label(), node.id);

        node.import = Some(ImportInfo {
            original_path: "/tmp/cat.png".into(),
            filename: "cat.png".into(),
            imported_at: Utc::now(),
        });
        assert_eq!(node.label(), "cat.png");

        node.generation = Some(ModelConfig::for_model("seedream", "a very tall tower"));
        assert_eq!(node.label(), "a very tall tower");
    }

    #[test]
    fn long_prompts_are_truncated_in_label() {
        let mut node = sample_node();
        node.generation = Some(ModelConfig::for_model("seedream", "x".repeat(100)));
        assert_eq!(node.label().chars().count(), 48);
    }

    #[test]
    fn json_roundtrip_keeps_optional_fields_absent() {
        let node = sample_node();
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("parent_id").is_none());
        assert!(json.get("rating").is_none());
        let back: ImageNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }
}
