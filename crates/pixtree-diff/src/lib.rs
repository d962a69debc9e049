//! Node comparison for pixtree.
//!
//! Answers "what changed between these two images": the prompt, word by
//! word, and every generation parameter whose value differs.
//!
//! # Key Types
//!
//! - [`NodeDiff`] -- Full comparison of two nodes
//! - [`PromptDiff`] / [`WordChange`] -- Word-level prompt diff
//! - [`ParamDiff`] / [`ParamChange`] -- Parameter map diff

pub mod node_diff;
pub mod params;
pub mod prompt;

pub use node_diff::{diff_nodes, NodeDiff};
pub use params::{diff_params, ParamChange, ParamDiff};
pub use prompt::{diff_prompts, PromptDiff, WordChange};
