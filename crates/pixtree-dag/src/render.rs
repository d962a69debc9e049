//! ASCII rendering of a derivation forest.

use crate::forest::{Forest, TreeNode};

const CURRENT_MARKER: &str = " *";

/// Render a forest as ASCII art, one line per node.
///
/// `label` maps a node id to its display text. The node whose id equals
/// `current` is suffixed with `*`.
///
/// ```text
/// a castle at dusk
/// ├── castle, more fog
/// │   └── castle, fog, crows
/// └── castle at dawn *
/// ```
pub fn render_forest<F>(forest: &Forest, label: F, current: Option<&str>) -> String
where
    F: Fn(&str) -> String,
{
    let mut out = String::new();
    for root in &forest.roots {
        render_node(&mut out, root, "", true, true, &label, current);
    }
    out
}

fn render_node<F>(
    out: &mut String,
    node: &TreeNode,
    prefix: &str,
    is_last: bool,
    is_root: bool,
    label: &F,
    current: Option<&str>,
) where
    F: Fn(&str) -> String,
{
    if !is_root {
        out.push_str(prefix);
        out.push_str(if is_last { "└── " } else { "├── " });
    }
    out.push_str(&label(&node.node_id));
    if current == Some(node.node_id.as_str()) {
        out.push_str(CURRENT_MARKER);
    }
    out.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        format!("{prefix}{}", if is_last { "    " } else { "│   " })
    };
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == node.children.len();
        render_node(out, child, &child_prefix, last, false, label, current);
    }
}
