//! Backoff procedures that widen or narrow a query when the direct
//! recommendation isn't good enough. Grounded on `backoff/splitProperty_test.go`
//! (`BackoffSplitPropertySet`, `AvgMerger`/`MaxMerger` numeric behavior) and on
//! `configuration/reader.go`'s `ConfigToWorkflow` switch statements, which name
//! every splitter/merger/stepsize this module must provide even though the
//! backoff package's own non-test sources aren't part of this retrieval pack.

use std::collections::HashMap;

use crate::dictionary::Pid;
use crate::recommend::{query_support, recommend, Recommendations};
use crate::tree::SchemaTree;

/// Splits a query into two subsets to be recommended against independently
/// and merged back together (`SplitterFunc`).
pub type SplitterFn = fn(&SchemaTree, &[Pid]) -> (Vec<Pid>, Vec<Pid>);

/// Combines the per-subset recommendation lists a splitter produced back
/// into one ranked list (`MergerFunc`).
pub type MergerFn = fn(&[Recommendations]) -> Recommendations;

/// Alternates query members (sorted by `SortOrder`) into two subsets.
pub fn every_second_item_splitter(tree: &SchemaTree, query: &[Pid]) -> (Vec<Pid>, Vec<Pid>) {
    let mut sorted: Vec<Pid> = query.to_vec();
    sorted.sort_by_key(|&p| tree.dictionary().record(p).sort_order());
    let mut a = Vec::new();
    let mut b = Vec::new();
    for (i, pid) in sorted.into_iter().enumerate() {
        if i % 2 == 0 {
            a.push(pid);
        } else {
            b.push(pid);
        }
    }
    (a, b)
}

/// Splits the query at its median `TotalCount`: the more frequent half
/// (likelier to share a single densely-populated subtree) versus the rarer
/// half.
pub fn two_support_ranges_splitter(tree: &SchemaTree, query: &[Pid]) -> (Vec<Pid>, Vec<Pid>) {
    let mut sorted: Vec<Pid> = query.to_vec();
    sorted.sort_by_key(|&p| std::cmp::Reverse(tree.dictionary().record(p).total_count()));
    let mid = sorted.len() / 2;
    let (high, low) = sorted.split_at(mid);
    (high.to_vec(), low.to_vec())
}

/// Averages each property's probability across all subset recommendations,
/// treating a property's absence from one subset's list as probability 0
/// (confirmed by `TestAvgMerger`: p1 appears in 2 of 4 lists at 0.2 and 0.8,
/// and is reported at `(0.2+0.8)/4 = 0.25`, not `/2`).
pub fn avg_merger(recommendations: &[Recommendations]) -> Recommendations {
    let mut sums: HashMap<Pid, f64> = HashMap::new();
    for recs in recommendations {
        for r in recs {
            *sums.entry(r.pid).or_insert(0.0) += r.probability;
        }
    }
    let divisor = recommendations.len().max(1) as f64;
    let mut merged: Recommendations = sums
        .into_iter()
        .map(|(pid, sum)| crate::recommend::RankedCandidate {
            pid,
            probability: sum / divisor,
        })
        .collect();
    merged.sort_by(|a, b| b.probability.partial_cmp(&a.probability).unwrap());
    merged
}

/// Takes each property's maximum probability across all subset
/// recommendations (confirmed by `TestMaxMerger`).
pub fn max_merger(recommendations: &[Recommendations]) -> Recommendations {
    let mut maxima: HashMap<Pid, f64> = HashMap::new();
    for recs in recommendations {
        for r in recs {
            let entry = maxima.entry(r.pid).or_insert(r.probability);
            if r.probability > *entry {
                *entry = r.probability;
            }
        }
    }
    let mut merged: Recommendations = maxima
        .into_iter()
        .map(|(pid, probability)| crate::recommend::RankedCandidate { pid, probability })
        .collect();
    merged.sort_by(|a, b| b.probability.partial_cmp(&a.probability).unwrap());
    merged
}

/// A placeholder merger used only to exercise `BackoffSplitPropertySet`
/// construction in `splitProperty_test.go` without caring about the merged
/// values: the first subset's recommendations, unmodified.
pub fn dummy_merger(recommendations: &[Recommendations]) -> Recommendations {
    recommendations.first().cloned().unwrap_or_default()
}

/// Runs `splitter` over `query`, recommends each half independently against
/// `tree`, and combines the two result lists with `merger`.
pub fn split_property(
    tree: &SchemaTree,
    query: &[Pid],
    include_types: bool,
    splitter: SplitterFn,
    merger: MergerFn,
) -> Recommendations {
    let (first, second) = splitter(tree, query);
    let recs = [
        recommend(tree, &first, include_types),
        recommend(tree, &second, include_types),
    ];
    merger(&recs)
}

/// How many of the rarest remaining query properties [`delete_low_frequency`]
/// drops per round.
pub type StepsizeFn = fn(remaining: usize) -> usize;

/// Removes exactly one property per round.
pub fn stepsize_linear(_remaining: usize) -> usize {
    1
}

/// Removes roughly a tenth of what remains each round, at least one.
pub fn stepsize_proportional(remaining: usize) -> usize {
    (remaining / 10).max(1)
}

/// Inner stopping condition for [`delete_low_frequency`]: keep removing
/// properties only while the remaining query's aggregate support — the sum
/// of node-support over every node whose path contains it, not the number
/// of properties left — is more than `threshold`.
pub fn more_than_internal(threshold: u64) -> impl Fn(u64) -> bool {
    move |remaining_support| remaining_support > threshold
}

/// Repeatedly drops the least-frequent remaining query properties (by
/// `TotalCount`) and retries recommendation, stopping as soon as a non-empty
/// result is found or `keep_going` (typically [`more_than_internal`]),
/// evaluated against the remaining query's aggregate support, refuses to
/// let the query shrink further. `parallel_executions` bounds how many
/// candidate step sizes are evaluated concurrently per round — rounds
/// themselves remain sequential since each depends on the previous round's
/// surviving query.
pub fn delete_low_frequency(
    tree: &SchemaTree,
    query: &[Pid],
    include_types: bool,
    parallel_executions: usize,
    stepsize: StepsizeFn,
    keep_going: impl Fn(u64) -> bool + Sync,
) -> Recommendations {
    let mut remaining: Vec<Pid> = query.to_vec();
    remaining.sort_by_key(|&p| std::cmp::Reverse(tree.dictionary().record(p).total_count()));

    loop {
        let recs = recommend(tree, &remaining, include_types);
        let remaining_support = query_support(tree, &remaining);
        if !recs.is_empty() || remaining.is_empty() || !keep_going(remaining_support) {
            return recs;
        }

        let drop_count = stepsize(remaining.len()).min(remaining.len());
        let attempts = parallel_executions.max(1);
        let results: Vec<(usize, Recommendations)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..attempts)
                .map(|i| {
                    let count = drop_count.saturating_sub(i).max(1).min(remaining.len());
                    let query: Vec<Pid> = remaining[..remaining.len() - count].to_vec();
                    scope.spawn(move || (count, recommend(tree, &query, include_types)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let chosen = results
            .into_iter()
            .find(|(_, recs)| !recs.is_empty())
            .unwrap_or((drop_count, Recommendations::new()));
        let new_len = remaining.len() - chosen.0;
        remaining.truncate(new_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_tree, BuildOptions};
    use crate::dictionary::PropertyDictionary;
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

    #[test]
    fn more_than_internal_gates_on_aggregate_support_not_property_count() {
        let tree = corpus_tree();
        // {a, d} has aggregate support 2 even though only two properties
        // are in the query — a property-count threshold of 1 would keep
        // both thresholds below open, while a support-based gate correctly
        // distinguishes threshold 1 (keep going) from threshold 2 (stop).
        let query = vec![
            tree.dictionary().get("a").unwrap(),
            tree.dictionary().get("d").unwrap(),
        ];
        let support = query_support(&tree, &query);
        assert_eq!(support, 2, "a/d co-occur in both 'a b c d' and 'a b d'");

        let keep_going_at_1 = more_than_internal(1);
        assert!(keep_going_at_1(support));
        let keep_going_at_2 = more_than_internal(2);
        assert!(!keep_going_at_2(support));
    }

    #[test]
    fn delete_low_frequency_stops_once_support_threshold_is_reached() {
        let tree = corpus_tree();
        let query = vec![
            tree.dictionary().get("a").unwrap(),
            tree.dictionary().get("b").unwrap(),
            tree.dictionary().get("c").unwrap(),
            tree.dictionary().get("d").unwrap(),
            tree.dictionary().get("e").unwrap(),
        ];
        // This combination never occurs together, so a threshold that
        // refuses to shrink below a high aggregate support must return an
        // empty result rather than looping until the query is exhausted.
        let result = delete_low_frequency(
            &tree,
            &query,
            false,
            1,
            stepsize_linear,
            more_than_internal(100),
        );
        assert!(result.is_empty());
    }

    fn make_recs(dict: &PropertyDictionary, pairs: &[(&str, f64)]) -> Recommendations {
        pairs
            .iter()
            .map(|(name, probability)| crate::recommend::RankedCandidate {
                pid: dict.get_or_create(name, false),
                probability: *probability,
            })
            .collect()
    }

    #[test]
    fn avg_merger_matches_worked_example() {
        let dict = PropertyDictionary::new();
        let rec1 = make_recs(&dict, &[("p1", 0.2), ("p2", 0.5)]);
        let rec2 = make_recs(&dict, &[("p1", 0.8), ("p3", 0.4)]);
        let rec3 = make_recs(&dict, &[("p2", 0.2)]);
        let rec4 = make_recs(&dict, &[("p2", 0.3)]);
        let merged = avg_merger(&[rec1, rec2, rec3, rec4]);

        let p1 = dict.get("p1").unwrap();
        let p2 = dict.get("p2").unwrap();
        let p3 = dict.get("p3").unwrap();
        let by_pid = |pid: Pid| merged.iter().find(|r| r.pid == pid).unwrap().probability;
        assert!((by_pid(p1) - 0.25).abs() < 1e-9);
        assert!((by_pid(p2) - 0.25).abs() < 1e-9);
        assert!((by_pid(p3) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn max_merger_matches_worked_example() {
        let dict = PropertyDictionary::new();
        let rec1 = make_recs(&dict, &[("p1", 0.2), ("p2", 0.5)]);
        let rec2 = make_recs(&dict, &[("p1", 0.8), ("p3", 0.4)]);
        let rec3 = make_recs(&dict, &[("p2", 0.2)]);
        let merged = max_merger(&[rec1, rec2, rec3]);

        let p1 = dict.get("p1").unwrap();
        let p2 = dict.get("p2").unwrap();
        let p3 = dict.get("p3").unwrap();
        let by_pid = |pid: Pid| merged.iter().find(|r| r.pid == pid).unwrap().probability;
        assert!((by_pid(p1) - 0.8).abs() < 1e-9);
        assert!((by_pid(p2) - 0.5).abs() < 1e-9);
        assert!((by_pid(p3) - 0.4).abs() < 1e-9);
    }
}
