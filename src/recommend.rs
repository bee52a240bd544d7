//! Core ranking algorithm. Grounded line-for-line on
//! `recommendation.go`'s `RecommendProperty`/`RecommendPropertiesAndTypes`,
//! collapsed into one function parameterized by `include_types` — the two
//! Go functions differ only in the `IsProp()` filter, and `tree_bitmap`
//! routinely parameterizes over a `MatchOptions`-style flag rather than
//! forking near-identical functions.

use std::collections::HashMap;

use crate::dictionary::Pid;
use crate::tree::{NodeId, SchemaTree};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCandidate {
    pub pid: Pid,
    pub probability: f64,
}

pub type Recommendations = Vec<RankedCandidate>;

/// `Top10AvgProbability`, used by the `TooUnlikelyRecommendations` backoff
/// condition — missing entries beyond the list's length count
/// as probability 0, per `recommendation.go`'s `Top10AvgProbibility`.
pub fn top10_avg_probability(recs: &Recommendations) -> f64 {
    let sum: f64 = (0..10).map(|i| recs.get(i).map_or(0.0, |r| r.probability)).sum();
    sum / 10.0
}

/// Ranks recommendations for `query` (an arbitrary, possibly unsorted,
/// possibly-duplicate list of PIDs — unknown or duplicate entries are the
/// caller's problem to have already resolved via `dictionary.get`).
/// `include_types` selects between property-only and property-and-type
/// candidate filtering.
pub fn recommend(tree: &SchemaTree, query: &[Pid], include_types: bool) -> Recommendations {
    if query.is_empty() {
        return recommend_empty(tree, include_types);
    }

    let mut sorted: Vec<Pid> = query.to_vec();
    sorted.sort_by_key(|&pid| tree.dictionary().record(pid).sort_order());
    sorted.dedup();

    let query_set: std::collections::HashSet<Pid> = sorted.iter().copied().collect();
    let rarest = *sorted.last().expect("non-empty query");

    let mut candidates: HashMap<Pid, u64> = HashMap::new();
    let mut set_support: u64 = 0;

    let mut cursor = tree.dictionary().record(rarest).traversal_head();
    while let Some(raw) = cursor {
        let leaf = NodeId::new(raw);
        if tree.prefix_contains(leaf, &sorted) {
            let leaf_support = u64::from(tree.node(leaf).support());
            set_support += leaf_support;

            for ancestor in tree.ancestors(leaf) {
                let pid = tree.node(ancestor).pid();
                if !query_set.contains(&pid) && candidate_allowed(tree, pid, include_types) {
                    *candidates.entry(pid).or_insert(0) += leaf_support;
                }
            }
            for descendant in tree.descendants(leaf) {
                let pid = tree.node(descendant).pid();
                if candidate_allowed(tree, pid, include_types) {
                    *candidates.entry(pid).or_insert(0) += u64::from(tree.node(descendant).support());
                }
            }
        }
        cursor = tree.node(leaf).next_same_id().map(NodeId::raw);
    }

    if set_support == 0 {
        return recommend_empty(tree, include_types);
    }

    let mut ranked: Recommendations = candidates
        .into_iter()
        .map(|(pid, support)| RankedCandidate {
            pid,
            probability: support as f64 / set_support as f64,
        })
        .collect();
    ranked.sort_by(|a, b| b.probability.partial_cmp(&a.probability).unwrap());
    ranked
}

fn candidate_allowed(tree: &SchemaTree, pid: Pid, include_types: bool) -> bool {
    include_types || tree.dictionary().record(pid).is_prop()
}

/// Aggregate support of `query`: the sum of node-support over every node
/// whose path contains every member of `query` — the GLOSSARY's "Support of
/// a set Q". Equal to the root's support for an empty query.
pub fn query_support(tree: &SchemaTree, query: &[Pid]) -> u64 {
    if query.is_empty() {
        return u64::from(tree.support());
    }

    let mut sorted: Vec<Pid> = query.to_vec();
    sorted.sort_by_key(|&pid| tree.dictionary().record(pid).sort_order());
    sorted.dedup();
    let rarest = *sorted.last().expect("non-empty query");

    let mut total: u64 = 0;
    let mut cursor = tree.dictionary().record(rarest).traversal_head();
    while let Some(raw) = cursor {
        let leaf = NodeId::new(raw);
        if tree.prefix_contains(leaf, &sorted) {
            total += u64::from(tree.node(leaf).support());
        }
        cursor = tree.node(leaf).next_same_id().map(NodeId::raw);
    }
    total
}

/// The empty-query path: one entry per PID (including type tokens,
/// regardless of `include_types`), ordered by `SortOrder` (already
/// descending-support, lex-tiebroken).
fn recommend_empty(tree: &SchemaTree, _include_types: bool) -> Recommendations {
    let root_support = tree.support();
    if root_support == 0 {
        return Vec::new();
    }
    let mut ranked: Recommendations = tree
        .dictionary()
        .list()
        .into_iter()
        .filter(|&pid| pid != tree.root_pid())
        .map(|pid| RankedCandidate {
            pid,
            probability: f64::from(tree.dictionary().record(pid).total_count())
                / f64::from(root_support),
        })
        .collect();
    ranked.sort_by_key(|r| tree.dictionary().record(r.pid).sort_order());
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_tree, BuildOptions};
    use crate::transactions::LineDelimitedReaderSource;
    use std::io::{BufRead, Cursor};

    fn corpus_tree() -> SchemaTree {
        let source = LineDelimitedReaderSource::new(|| {
            let data: Box<dyn BufRead> = Box::new(Cursor::new(
                b"a b c d\na b c e\na b c\na b d\nb e\na b c\n".to_vec(),
            ));
            data
        });
        build_tree(&source, BuildOptions::default()).unwrap()
    }

    fn pid(tree: &SchemaTree, name: &str) -> Pid {
        tree.dictionary().get(name).unwrap()
    }

    #[test]
    fn empty_query_matches_total_counts_over_root_support() {
        let tree = corpus_tree();
        let recs = recommend(&tree, &[], false);
        let mut by_name: HashMap<&str, f64> = HashMap::new();
        for name in ["a", "b", "c", "d", "e"] {
            let p = pid(&tree, name);
            let r = recs.iter().find(|r| r.pid == p).unwrap();
            by_name.insert(name, r.probability);
        }
        assert!((by_name["a"] - 5.0 / 6.0).abs() < 1e-9);
        assert!((by_name["b"] - 6.0 / 6.0).abs() < 1e-9);
        assert!((by_name["c"] - 4.0 / 6.0).abs() < 1e-9);
        assert!((by_name["d"] - 2.0 / 6.0).abs() < 1e-9);
        assert!((by_name["e"] - 2.0 / 6.0).abs() < 1e-9);
        // Descending-probability, lex-tiebroken sort order.
        let order: Vec<Pid> = recs.iter().map(|r| r.pid).collect();
        assert_eq!(
            order,
            vec![pid(&tree, "b"), pid(&tree, "a"), pid(&tree, "c"), pid(&tree, "d"), pid(&tree, "e")]
        );
    }

    #[test]
    fn unknown_query_falls_back_to_empty_query_result() {
        let tree = corpus_tree();
        let empty = recommend(&tree, &[], false);
        // An "unknown" name never makes it into a query list (the caller
        // drops names `dictionary.get` can't resolve), so an empty filtered
        // query reaches exactly the same empty-query path.
        let filtered = recommend(&tree, &[], false);
        assert_eq!(empty, filtered);
    }

    #[test]
    fn query_abc_surfaces_d_and_e_as_the_only_candidates() {
        let tree = corpus_tree();
        let query = vec![pid(&tree, "a"), pid(&tree, "b"), pid(&tree, "c")];
        let recs = recommend(&tree, &query, false);
        let names: std::collections::HashSet<Pid> = recs.iter().map(|r| r.pid).collect();
        assert_eq!(
            names,
            [pid(&tree, "d"), pid(&tree, "e")].into_iter().collect()
        );
        for r in &recs {
            assert!(r.probability > 0.0 && r.probability <= 1.0);
        }
    }

    #[test]
    fn query_singleton_b_setsupport_equals_total_count() {
        let tree = corpus_tree();
        let query = vec![pid(&tree, "b")];
        let recs = recommend(&tree, &query, false);
        // b occurs in every transaction, so every other property's candidate
        // count is bounded by its own total count, and every candidate
        // probability must lie in (0, 1].
        for r in &recs {
            assert!(r.probability > 0.0 && r.probability <= 1.0);
        }
    }

    #[test]
    fn query_support_is_aggregate_node_support_not_cardinality() {
        let tree = corpus_tree();
        assert_eq!(query_support(&tree, &[]), 6);
        assert_eq!(query_support(&tree, &[pid(&tree, "b")]), 6);
        // {a, d} co-occurs in "a b c d" and "a b d": two single-property
        // members, but an aggregate support of 2, not 1.
        let query = vec![pid(&tree, "a"), pid(&tree, "d")];
        assert_eq!(query_support(&tree, &query), 2);
    }
}
