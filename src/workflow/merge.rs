//! Priority merge at the recommendation boundary, grounded on
//! `server/mergeRecommendations.go`'s generic `SimpleMerge`/`FasterMerge`.

use crate::recommend::RankedCandidate;

/// Places `higher_priority` first, then every entry of `lower_priority`
/// whose PID does not already appear in `higher_priority`, preserving
/// `lower_priority`'s relative order. Assumes `lower_priority` is a superset
/// of `higher_priority` by identity, matching `mergeRecommendations.go`'s
/// documented assumption.
pub fn simple_merge(
    higher_priority: &[RankedCandidate],
    lower_priority: &[RankedCandidate],
) -> Vec<RankedCandidate> {
    let mut result = Vec::with_capacity(lower_priority.len().max(higher_priority.len()));
    result.extend_from_slice(higher_priority);
    for candidate in lower_priority {
        if !higher_priority.iter().any(|h| h.pid == candidate.pid) {
            result.push(*candidate);
        }
    }
    result
}

/// Must produce output identical to [`simple_merge`] for every valid input
/// pair, but assumes both lists are already in roughly corresponding order
/// to avoid the O(n·m) worst case: each `higher_priority` entry is searched
/// for starting from where the previous search left off, wrapping once.
pub fn faster_merge(
    higher_priority: &[RankedCandidate],
    lower_priority: &[RankedCandidate],
) -> Vec<RankedCandidate> {
    if higher_priority.is_empty() {
        return lower_priority.to_vec();
    }

    let mut hit_indices = Vec::with_capacity(higher_priority.len());
    let mut cursor = 0usize;
    for entry in higher_priority {
        let search_start = cursor;
        let found = (cursor..lower_priority.len())
            .find(|&i| lower_priority[i].pid == entry.pid)
            .or_else(|| (0..search_start).find(|&i| lower_priority[i].pid == entry.pid))
            .expect("higher_priority entry must exist in lower_priority");
        hit_indices.push(found);
        cursor = found + 1;
    }
    hit_indices.sort_unstable();

    let mut result = Vec::with_capacity(lower_priority.len());
    result.extend_from_slice(higher_priority);
    result.extend_from_slice(&lower_priority[0..hit_indices[0]]);
    for window in hit_indices.windows(2) {
        result.extend_from_slice(&lower_priority[window[0] + 1..window[1]]);
    }
    result.extend_from_slice(&lower_priority[hit_indices[hit_indices.len() - 1] + 1..]);
    result
}
