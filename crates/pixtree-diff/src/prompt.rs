//! Word-level prompt diff.
//!
//! Prompts are short single-paragraph strings, so the diff is computed over
//! words rather than lines.

use similar::{ChangeTag, TextDiff};

/// One run of the word diff. Runs include their surrounding whitespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WordChange {
    Same(String),
    Added(String),
    Removed(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptDiff {
    pub changes: Vec<WordChange>,
}

impl PromptDiff {
    /// Returns `true` if the prompts are identical.
    pub fn is_empty(&self) -> bool {
        self.changes
            .iter()
            .all(|c| matches!(c, WordChange::Same(_)))
    }

    pub fn added_words(&self) -> Vec<&str> {
        self.changes
            .iter()
            .filter_map(|c| match c {
                WordChange::Added(w) => Some(w.trim()),
                _ => None,
            })
            .filter(|w| !w.is_empty())
            .collect()
    }

    pub fn removed_words(&self) -> Vec<&str> {
        self.changes
            .iter()
            .filter_map(|c| match c {
                WordChange::Removed(w) => Some(w.trim()),
                _ => None,
            })
            .filter(|w| !w.is_empty())
            .collect()
    }

    /// Inline rendering: `[-removed-]` and `{+added+}`.
    pub fn render_inline(&self) -> String {
        let mut out = String::new();
        for change in &self.changes {
            match change {
                WordChange::Same(w) => out.push_str(w),
                WordChange::Added(w) => push_marked(&mut out, w, "{+", "+}"),
                WordChange::Removed(w) => push_marked(&mut out, w, "[-", "-]"),
            }
        }
        out
    }
}

fn push_marked(out: &mut String, text: &str, open: &str, close: &str) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[text.trim_end().len()..];
    out.push_str(lead);
    out.push_str(open);
    out.push_str(trimmed);
    out.push_str(close);
    out.push_str(trail);
}

/// Diff two prompts word by word. Adjacent changes of the same kind are
/// merged into one run.
pub fn diff_prompts(old: &str, new: &str) -> PromptDiff {
    if old == new {
        return PromptDiff {
            changes: if old.is_empty() {
                Vec::new()
            } else {
                vec![WordChange::Same(old.to_string())]
            },
        };
    }

    let diff = TextDiff::from_words(old, new);
    let mut changes: Vec<WordChange> = Vec::new();
    for change in diff.iter_all_changes() {
        let value = change.value();
        let merged = match (change.tag(), changes.last_mut()) {
            (ChangeTag::Equal, Some(WordChange::Same(run)))
            | (ChangeTag::Insert, Some(WordChange::Added(run)))
            | (ChangeTag::Delete, Some(WordChange::Removed(run))) => {
                run.push_str(value);
                true
            }
            _ => false,
        };
        if !merged {
            changes.push(match change.tag() {
                ChangeTag::Equal => WordChange::Same(value.to_string()),
                ChangeTag::Insert => WordChange::Added(value.to_string()),
                ChangeTag::Delete => WordChange::Removed(value.to_string()),
            });
        }
    }
    PromptDiff { changes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_prompts() {
        let diff = diff_prompts("a castle at dusk", "a castle at dusk");
        assert!(diff.is_empty());
        assert_eq!(diff.render_inline(), "a castle at dusk");
        assert!(diff_prompts("", "").changes.is_empty());
    }

    #[test]
    fn word_replacement() {
        let diff = diff_prompts("a castle at dusk", "a castle at dawn");
        assert!(!diff.is_empty());
        assert_eq!(diff.removed_words(), ["dusk"]);
        assert_eq!(diff.added_words(), ["dawn"]);
        assert_eq!(diff.render_inline(), "a castle at [-dusk-]{+dawn+}");
    }

    #[test]
    fn appended_words() {
        let diff = diff_prompts("castle", "castle with fog");
        assert!(diff.removed_words().is_empty());
        assert_eq!(diff.added_words().join(" "), "with fog");
    }
}
