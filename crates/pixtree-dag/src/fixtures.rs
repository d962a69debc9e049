//! Node builders shared by the unit tests.

use chrono::{DateTime, TimeZone, Utc};
use pixtree_types::{ContentHash, FileMetadata, ImageNode};

pub(crate) const TREE: &str = "tree-test";

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

/// A node in [`TREE`] created `seconds` after a fixed epoch.
pub(crate) fn node_at(id: &str, parent: Option<&str>, seconds: i64) -> ImageNode {
    let hash = ContentHash::of(id.as_bytes());
    let mut node = ImageNode::new(
        "project-test",
        TREE,
        parent.map(str::to_string),
        hash,
        format!("images/{}.bin", hash.to_hex()),
        FileMetadata::default(),
    );
    node.id = id.to_string();
    node.created_at = at(seconds);
    node.updated_at = node.created_at;
    node
}

pub(crate) fn node(id: &str, parent: Option<&str>) -> ImageNode {
    node_at(id, parent, 0)
}
