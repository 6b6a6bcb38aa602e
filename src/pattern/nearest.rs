//! Node-level distances for the nearest and closest tiers.

use crate::config::DistanceMetric;
use crate::entities::{EntityIndex, Signature};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Distance between a decomposed input and a signature, in nodes.
pub(crate) fn distance(metric: DistanceMetric, input: &[EntityIndex], candidate: &[EntityIndex]) -> usize {
    match metric {
        DistanceMetric::NodeEdit => node_edit_distance(input, candidate),
        DistanceMetric::NodeSetDifference => node_set_difference(input, candidate),
    }
}

/// Levenshtein distance over node indices.
pub(crate) fn node_edit_distance(a: &[EntityIndex], b: &[EntityIndex]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, &x) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &y) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(x != y);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Number of nodes present in exactly one of the two sequences.
pub(crate) fn node_set_difference(a: &[EntityIndex], b: &[EntityIndex]) -> usize {
    let mut a: Vec<_> = a.to_vec();
    let mut b: Vec<_> = b.to_vec();
    a.sort_unstable();
    a.dedup();
    b.sort_unstable();
    b.dedup();

    let (mut i, mut j, mut difference) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                difference += 1;
                i += 1;
            }
            Ordering::Greater => {
                difference += 1;
                j += 1;
            }
        }
    }
    difference + (a.len() - i) + (b.len() - j)
}

pub(crate) fn common_prefix_len(a: &[EntityIndex], b: &[EntityIndex]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Signatures sharing at least one node, most shared first, then by index.
pub(crate) fn rank_candidates(
    node_signatures: impl IntoIterator<Item = impl AsRef<[EntityIndex]>>,
    limit: usize,
) -> Vec<EntityIndex> {
    let mut shared: HashMap<EntityIndex, usize> = HashMap::new();
    for signatures in node_signatures {
        for &signature in signatures.as_ref() {
            *shared.entry(signature).or_default() += 1;
        }
    }

    let mut ranked: Vec<(EntityIndex, usize)> = shared.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked.into_iter().map(|(signature, _)| signature).collect()
}

/// Tie-break among signatures at the same minimum distance: longest
/// common node prefix with the input, then lowest rank, then lowest index.
pub(crate) fn closest_of<'a>(input: &[EntityIndex], tied: &'a [std::sync::Arc<Signature>]) -> Option<&'a std::sync::Arc<Signature>> {
    tied.iter().min_by(|a, b| {
        common_prefix_len(input, &b.nodes)
            .cmp(&common_prefix_len(input, &a.nodes))
            .then(a.rank.cmp(&b.rank))
            .then(a.index.cmp(&b.index))
    })
}
