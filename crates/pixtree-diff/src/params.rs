//! Generation parameter diff.
//!
//! Parameters are compared as `BTreeMap<String, serde_json::Value>`, the
//! model-independent view produced by `ModelConfig::parameters`.

use std::collections::BTreeMap;

use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamDiff {
    /// Sorted by key.
    pub changes: Vec<ParamChange>,
}

impl ParamDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Keys whose value differs, was added, or was removed.
    pub fn keys(&self) -> Vec<&str> {
        self.changes.iter().map(ParamChange::key).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamChange {
    Added { key: String, value: Value },
    Removed { key: String, value: Value },
    Modified { key: String, old: Value, new: Value },
}

impl ParamChange {
    pub fn key(&self) -> &str {
        match self {
            ParamChange::Added { key, .. }
            | ParamChange::Removed { key, .. }
            | ParamChange::Modified { key, .. } => key,
        }
    }
}

/// Compare two parameter maps. Keys only in `new` are `Added`, keys only in
/// `old` are `Removed`, and keys in both with different values are
/// `Modified`.
pub fn diff_params(old: &BTreeMap<String, Value>, new: &BTreeMap<String, Value>) -> ParamDiff {
    let mut changes = Vec::new();
    for (key, old_value) in old {
        match new.get(key) {
            None => changes.push(ParamChange::Removed {
                key: key.clone(),
                value: old_value.clone(),
            }),
            Some(new_value) if new_value != old_value => changes.push(ParamChange::Modified {
                key: key.clone(),
                old: old_value.clone(),
                new: new_value.clone(),
            }),
            Some(_) => {}
        }
    }
    for (key, value) in new {
        if !old.contains_key(key) {
            changes.push(ParamChange::Added {
                key: key.clone(),
                value: value.clone(),
            });
        }
    }
    changes.sort_by(|a, b| a.key().cmp(b.key()));
    ParamDiff { changes }
}
