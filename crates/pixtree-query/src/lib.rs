//! Node search for pixtree.
//!
//! A [`SearchFilter`] is a conjunction of optional predicates. [`search`]
//! evaluates it over a node set in one linear pass; predicates that depend
//! on structure (`has_children`, `is_leaf`) are resolved against the whole
//! input, not just the nodes that survive earlier predicates.
//!
//! - [`SearchFilter`] -- predicate set with builder methods
//! - [`search`] -- evaluate a filter
//! - [`sort_results`] / [`limit`] -- caller-side ordering helpers

pub mod error;
pub mod filter;
pub mod search;

pub use error::{QueryError, QueryResult};
pub use filter::SearchFilter;
pub use search::{limit, search, sort_results, SortOrder};
