//! Caller-supplied options for node-creating operations.

use std::collections::BTreeSet;

use pixtree_types::ModelConfig;

/// Which node a new generation derives from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ParentChoice {
    /// The current node, if the target tree is the current tree.
    #[default]
    Current,
    /// Start a new root.
    Root,
    Node(String),
}

#[derive(Clone, Debug, Default)]
pub struct GenerateOptions {
    pub prompt: String,
    /// Model name; falls back to the project default, then the config.
    pub model: Option<String>,
    /// Full parameter set; overrides `model` when given.
    pub config: Option<ModelConfig>,
    /// Target tree; defaults to the current tree.
    pub tree: Option<String>,
    pub parent: ParentChoice,
    pub tags: BTreeSet<String>,
    pub description: Option<String>,
}

impl GenerateOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn in_tree(mut self, tree_id: impl Into<String>) -> Self {
        self.tree = Some(tree_id.into());
        self
    }

    pub fn parent(mut self, parent: ParentChoice) -> Self {
        self.parent = parent;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct ImportOptions {
    /// Target tree; when absent the smart-import rules pick one.
    pub tree: Option<String>,
    pub parent: Option<String>,
    pub tags: BTreeSet<String>,
    pub description: Option<String>,
    /// Run the analysis backend; defaults to the config setting.
    pub analyze: Option<bool>,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_tree(mut self, tree_id: impl Into<String>) -> Self {
        self.tree = Some(tree_id.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn analyze(mut self, analyze: bool) -> Self {
        self.analyze = Some(analyze);
        self
    }
}
