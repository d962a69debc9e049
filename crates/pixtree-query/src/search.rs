//! Filter evaluation and result ordering.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use pixtree_types::ImageNode;
use tracing::debug;

use crate::error::QueryError;
use crate::filter::SearchFilter;

/// Every node of `nodes` that satisfies all predicates of `filter`, in
/// input order.
pub fn search<'a>(filter: &SearchFilter, nodes: &'a [ImageNode]) -> Vec<&'a ImageNode> {
    let parents: HashSet<&str> = nodes.iter().filter_map(|n| n.parent_id.as_deref()).collect();
    let results: Vec<&ImageNode> = nodes.iter().filter(|n| filter.matches(n, &parents)).collect();
    debug!(scanned = nodes.len(), matched = results.len(), "search");
    results
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    /// Highest rating first, unrated last, newest first within a rating.
    Rating,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::Rating => "rating",
        })
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "rating" => Ok(SortOrder::Rating),
            _ => Err(QueryError::UnknownSortOrder(s.to_string())),
        }
    }
}

/// Sort results in place. Ties always fall back to the node id so the order
/// is total.
pub fn sort_results(results: &mut [&ImageNode], order: SortOrder) {
    match order {
        SortOrder::Newest => {
            results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)))
        }
        SortOrder::Oldest => {
            results.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
        }
        SortOrder::Rating => results.sort_by_key(|n| {
            (
                Reverse(n.rating.map(|r| r.value()).unwrap_or(0)),
                Reverse(n.created_at),
                n.id.clone(),
            )
        }),
    }
}

/// Keep at most `max` results.
pub fn limit<T>(mut results: Vec<T>, max: usize) -> Vec<T> {
    results.truncate(max);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pixtree_types::{ContentHash, FileMetadata, ModelConfig, Rating};
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn node(id: &str, parent: Option<&str>) -> ImageNode {
        let mut n = ImageNode::new(
            "project-q",
            "tree-1",
            parent.map(str::to_string),
            ContentHash::of(id.as_bytes()),
            "images/x.bin",
            FileMetadata::default(),
        );
        n.id = id.to_string();
        n.created_at = at(0);
        n
    }

    fn corpus() -> Vec<ImageNode> {
        let mut a = node("a", None);
        a.generation = Some(ModelConfig::for_model("nano-banana", "A Castle at dusk"));
        a.tags.insert("castle".into());
        a.rating = Some(Rating::new(4).unwrap());
        a.created_at = at(10);

        let mut b = node("b", Some("a"));
        b.generation = Some(ModelConfig::for_model("seedream", "castle with fog"));
        b.tags.extend(["castle".to_string(), "fog".to_string()]);
        b.favorite = true;
        b.rating = Some(Rating::new(5).unwrap());
        b.created_at = at(20);

        let mut c = node("c", Some("a"));
        c.description = Some("Reference photo of a MOAT".into());
        c.tree_id = "tree-2".into();
        c.created_at = at(30);

        vec![a, b, c]
    }

    fn ids(results: &[&ImageNode]) -> Vec<String> {
        results.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn empty_filter_returns_everything() {
        let nodes = corpus();
        assert_eq!(search(&SearchFilter::new(), &nodes).len(), 3);
        assert!(search(&SearchFilter::new(), &[]).is_empty());
    }

    #[test]
    fn tags_require_all() {
        let nodes = corpus();
        let f = SearchFilter::new().tag("castle").tag("fog");
        assert_eq!(ids(&search(&f, &nodes)), ["b"]);
    }

    #[test]
    fn text_is_case_insensitive_across_fields() {
        let nodes = corpus();
        assert_eq!(ids(&search(&SearchFilter::new().text("CASTLE"), &nodes)), ["a", "b"]);
        assert_eq!(ids(&search(&SearchFilter::new().text("moat"), &nodes)), ["c"]);
        assert_eq!(ids(&search(&SearchFilter::new().text("FOG"), &nodes)), ["b"]);
    }

    #[test]
    fn min_rating_excludes_unrated() {
        let nodes = corpus();
        let f = SearchFilter::new().min_rating(Rating::new(4).unwrap());
        assert_eq!(ids(&search(&f, &nodes)), ["a", "b"]);
        let f = SearchFilter::new().min_rating(Rating::new(5).unwrap());
        assert_eq!(ids(&search(&f, &nodes)), ["b"]);
    }

    #[test]
    fn model_tree_and_favorite() {
        let nodes = corpus();
        assert_eq!(ids(&search(&SearchFilter::new().model("seedream"), &nodes)), ["b"]);
        assert_eq!(ids(&search(&SearchFilter::new().in_tree("tree-2"), &nodes)), ["c"]);
        assert_eq!(ids(&search(&SearchFilter::new().favorite(false), &nodes)), ["a", "c"]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let nodes = corpus();
        let f = SearchFilter::new().created_after(at(20)).created_before(at(30));
        assert_eq!(ids(&search(&f, &nodes)), ["b", "c"]);
    }

    #[test]
    fn structure_uses_full_node_set() {
        let nodes = corpus();
        // "a" is a parent even though its children fail the other predicates.
        let f = SearchFilter::new().has_children(true).model("nano-banana");
        assert_eq!(ids(&search(&f, &nodes)), ["a"]);
        assert_eq!(ids(&search(&SearchFilter::new().is_leaf(true), &nodes)), ["b", "c"]);
        assert_eq!(ids(&search(&SearchFilter::new().is_leaf(false), &nodes)), ["a"]);
    }

    #[test]
    fn sort_orders() {
        let nodes = corpus();
        let mut results = search(&SearchFilter::new(), &nodes);
        sort_results(&mut results, SortOrder::Newest);
        assert_eq!(ids(&results), ["c", "b", "a"]);
        sort_results(&mut results, SortOrder::Oldest);
        assert_eq!(ids(&results), ["a", "b", "c"]);
        sort_results(&mut results, SortOrder::Rating);
        assert_eq!(ids(&results), ["b", "a", "c"]);
        assert_eq!(ids(&limit(results, 2)), ["b", "a"]);
    }

    #[test]
    fn sort_order_parsing() {
        assert_eq!("Rating".parse::<SortOrder>().unwrap(), SortOrder::Rating);
        assert_eq!(
            "best".parse::<SortOrder>().unwrap_err(),
            QueryError::UnknownSortOrder("best".into())
        );
    }

    // ---- conjunction property ----

    const TAGS: [&str; 4] = ["red", "blue", "fog", "sky"];

    fn arb_node(i: usize) -> impl Strategy<Value = ImageNode> {
        (
            prop::collection::btree_set(prop::sample::select(TAGS.to_vec()), 0..3),
            prop::option::of(1u8..=5),
            any::<bool>(),
            0i64..5,
            prop::option::of(0usize..8),
        )
            .prop_map(move |(tags, rating, favorite, secs, parent)| {
                let parent = parent.filter(|p| *p < i).map(|p| format!("n{p}"));
                let mut n = node(&format!("n{i}"), parent.as_deref());
                n.tags = tags.into_iter().map(str::to_string).collect();
                n.rating = rating.map(|r| Rating::new(r).unwrap());
                n.favorite = favorite;
                n.created_at = at(secs);
                n
            })
    }

    fn arb_nodes() -> impl Strategy<Value = Vec<ImageNode>> {
        (0usize..8).prop_flat_map(|len| (0..len).map(arb_node).collect::<Vec<_>>())
    }

    fn arb_filter() -> impl Strategy<Value = SearchFilter> {
        (
            prop::collection::btree_set(prop::sample::select(TAGS.to_vec()), 0..2),
            prop::option::of(1u8..=5),
            prop::option::of(any::<bool>()),
            prop::option::of(0i64..5),
            prop::option::of(any::<bool>()),
        )
            .prop_map(|(tags, min_rating, favorite, after, leaf)| SearchFilter {
                tags: tags.into_iter().map(str::to_string).collect(),
                min_rating: min_rating.map(|r| Rating::new(r).unwrap()),
                favorite,
                created_after: after.map(at),
                is_leaf: leaf,
                ..SearchFilter::default()
            })
    }

    proptest! {
        #[test]
        fn search_equals_brute_force(nodes in arb_nodes(), filter in arb_filter()) {
            let got = ids(&search(&filter, &nodes));
            let expected: Vec<String> = nodes
                .iter()
                .filter(|n| filter.tags.iter().all(|t| n.tags.contains(t)))
                .filter(|n| filter.min_rating.map_or(true, |m| n.rating.is_some_and(|r| r >= m)))
                .filter(|n| filter.favorite.map_or(true, |f| n.favorite == f))
                .filter(|n| filter.created_after.map_or(true, |t| n.created_at >= t))
                .filter(|n| {
                    filter.is_leaf.map_or(true, |want| {
                        let leaf = !nodes.iter().any(|m| m.parent_id.as_deref() == Some(n.id.as_str()));
                        leaf == want
                    })
                })
                .map(|n| n.id.clone())
                .collect();
            prop_assert_eq!(got, expected);
        }
    }
}
