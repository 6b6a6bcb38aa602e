//! Multi-pattern search over node fragments.
//!
//! Two automata are built over the same nodes: one over the raw fragments
//! for exact decomposition and one over their digit-normalized forms for
//! the numeric tier. Fragments sharing text share one automaton pattern.

use super::numeric::{normalize_fragment, numeric_delta, NormalizedText};
use crate::entities::{EntityIndex, Node};
use crate::error::{DetectionError, Result};
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// What the index needs to know about a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FragmentEntry {
    pub node: EntityIndex,
    pub fragment: String,
    pub position: Option<u32>,
    pub rank: u32,
}

impl From<&Node> for FragmentEntry {
    fn from(node: &Node) -> Self {
        Self {
            node: node.index,
            fragment: node.fragment.clone(),
            position: node.position,
            rank: node.rank,
        }
    }
}

#[derive(Debug, Clone)]
struct NodeInfo {
    node: EntityIndex,
    position: Option<u32>,
    rank: u32,
    numbers: Vec<u64>,
}

/// The result of splitting an input into nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decomposition {
    /// Chosen nodes in input order
    pub nodes: Vec<EntityIndex>,
    /// Summed numeric drift of the chosen nodes; 0 for exact decomposition
    pub difference: u64,
    /// Node occurrences considered
    pub evaluated: u64,
}

/// A node occurrence competing for a start offset.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize,
    end: usize,
    delta: u64,
    rank: u32,
    node: EntityIndex,
}

impl Candidate {
    /// Longer span wins, then smaller numeric drift, then lower rank, then
    /// lower node index.
    fn preference(&self, other: &Candidate) -> Ordering {
        (other.end - other.start)
            .cmp(&(self.end - self.start))
            .then(self.delta.cmp(&other.delta))
            .then(self.rank.cmp(&other.rank))
            .then(self.node.cmp(&other.node))
    }
}

/// Aho-Corasick automata over every node fragment of a dataset.
#[derive(Debug, Clone)]
pub struct FragmentIndex {
    infos: Vec<NodeInfo>,
    exact: AhoCorasick,
    exact_groups: Vec<Vec<usize>>,
    numeric: AhoCorasick,
    numeric_groups: Vec<Vec<usize>>,
}

impl FragmentIndex {
    pub(crate) fn new(entries: impl IntoIterator<Item = FragmentEntry>) -> Result<Self> {
        let mut infos = Vec::new();
        let mut exact_patterns: Vec<String> = Vec::new();
        let mut exact_groups: Vec<Vec<usize>> = Vec::new();
        let mut exact_lookup: HashMap<String, usize> = HashMap::new();
        let mut numeric_patterns: Vec<String> = Vec::new();
        let mut numeric_groups: Vec<Vec<usize>> = Vec::new();
        let mut numeric_lookup: HashMap<String, usize> = HashMap::new();

        for entry in entries {
            if entry.fragment.is_empty() {
                continue;
            }
            let slot = infos.len();
            let (normalized, numbers) = normalize_fragment(&entry.fragment);

            let pattern = *exact_lookup.entry(entry.fragment.clone()).or_insert_with(|| {
                exact_patterns.push(entry.fragment.clone());
                exact_groups.push(Vec::new());
                exact_patterns.len() - 1
            });
            exact_groups[pattern].push(slot);

            let pattern = *numeric_lookup.entry(normalized.clone()).or_insert_with(|| {
                numeric_patterns.push(normalized);
                numeric_groups.push(Vec::new());
                numeric_patterns.len() - 1
            });
            numeric_groups[pattern].push(slot);

            infos.push(NodeInfo {
                node: entry.node,
                position: entry.position,
                rank: entry.rank,
                numbers,
            });
        }

        Ok(Self {
            infos,
            exact: build_automaton(&exact_patterns)?,
            exact_groups,
            numeric: build_automaton(&numeric_patterns)?,
            numeric_groups,
        })
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Split `input` into nodes whose fragments occur verbatim and satisfy
    /// their position constraints.
    pub fn decompose(&self, input: &str) -> Decomposition {
        let mut best: BTreeMap<usize, Candidate> = BTreeMap::new();
        let mut evaluated = 0u64;

        for found in self.exact.find_overlapping_iter(input) {
            let (start, end) = (found.start(), found.end());
            for &slot in &self.exact_groups[found.pattern().as_usize()] {
                evaluated += 1;
                let info = &self.infos[slot];
                if info.position.map_or(false, |p| p as usize != start) {
                    continue;
                }
                offer(
                    &mut best,
                    Candidate {
                        start,
                        end,
                        delta: 0,
                        rank: info.rank,
                        node: info.node,
                    },
                );
            }
        }

        walk(best, evaluated)
    }

    /// Split `input` into nodes whose fragments match once digit runs are
    /// ignored. Positions may drift by up to `tolerance` bytes.
    pub fn decompose_numeric(&self, input: &str, tolerance: u32) -> Decomposition {
        let normalized = NormalizedText::new(input);
        let mut best: BTreeMap<usize, Candidate> = BTreeMap::new();
        let mut evaluated = 0u64;

        for found in self.numeric.find_overlapping_iter(&normalized.text) {
            let (start, end) = normalized.original_span(found.start(), found.end());
            for &slot in &self.numeric_groups[found.pattern().as_usize()] {
                evaluated += 1;
                let info = &self.infos[slot];
                if info
                    .position
                    .map_or(false, |p| (p as usize).abs_diff(start) > tolerance as usize)
                {
                    continue;
                }
                let delta = numeric_delta(
                    &info.numbers,
                    normalized.numbers_in(found.start(), found.end()),
                );
                offer(
                    &mut best,
                    Candidate {
                        start,
                        end,
                        delta,
                        rank: info.rank,
                        node: info.node,
                    },
                );
            }
        }

        walk(best, evaluated)
    }
}

fn build_automaton(patterns: &[String]) -> Result<AhoCorasick> {
    AhoCorasickBuilder::new()
        .match_kind(MatchKind::Standard)
        .build(patterns)
        .map_err(|e| DetectionError::DataFormat(format!("unable to index node fragments: {e}")))
}

fn offer(best: &mut BTreeMap<usize, Candidate>, candidate: Candidate) {
    best.entry(candidate.start)
        .and_modify(|current| {
            if candidate.preference(current) == Ordering::Less {
                *current = candidate;
            }
        })
        .or_insert(candidate);
}

/// Greedy left-to-right walk taking the preferred candidate at each start
/// offset not covered by the previous choice.
fn walk(best: BTreeMap<usize, Candidate>, evaluated: u64) -> Decomposition {
    let mut decomposition = Decomposition {
        evaluated,
        ..Default::default()
    };
    let mut cursor = 0;
    for (start, candidate) in best {
        if start < cursor {
            continue;
        }
        decomposition.nodes.push(candidate.node);
        decomposition.difference = decomposition.difference.saturating_add(candidate.delta);
        cursor = candidate.end;
    }
    decomposition
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(node: u32, fragment: &str, position: Option<u32>, rank: u32) -> FragmentEntry {
        FragmentEntry {
            node,
            fragment: fragment.to_string(),
            position,
            rank,
        }
    }

    fn index() -> FragmentIndex {
        FragmentIndex::new(vec![
            entry(0, "Mozilla/5.0 (", Some(0), 1),
            entry(1, "iPhone;", None, 1),
            entry(2, "CPU iPhone OS 6_0", None, 1),
            entry(3, "iPhone", None, 4),
            entry(4, "Safari/8536.25", None, 2),
            entry(5, "Safari/537.36", None, 3),
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_decomposition_prefers_longest() {
        let result = index().decompose("Mozilla/5.0 (iPhone; CPU iPhone OS 6_0 like Mac OS X)");
        assert_eq!(result.nodes, vec![0, 1, 2]);
        assert_eq!(result.difference, 0);
        assert!(result.evaluated >= 4);
    }

    #[test]
    fn test_position_constraint_rejects_other_offsets() {
        let result = index().decompose("x Mozilla/5.0 (iPhone;");
        assert_eq!(result.nodes, vec![1]);
    }

    #[test]
    fn test_no_fragments_gives_empty_key() {
        let result = index().decompose("curl/7.68.0");
        assert!(result.nodes.is_empty());
    }

    #[test]
    fn test_equal_length_tie_prefers_rank() {
        let index = FragmentIndex::new(vec![
            entry(0, "Android", None, 9),
            entry(1, "Android", None, 2),
        ])
        .unwrap();
        assert_eq!(index.decompose("Linux; Android").nodes, vec![1]);
    }

    #[test]
    fn test_numeric_decomposition_tolerates_versions() {
        let result = index().decompose_numeric(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X) Safari/8536.25",
            8,
        );
        assert_eq!(result.nodes, vec![0, 1, 2, 4]);
        assert_eq!(result.difference, 2);
    }

    #[test]
    fn test_numeric_tie_prefers_smallest_delta() {
        let result = index().decompose_numeric("Safari/537.30", 8);
        assert_eq!(result.nodes, vec![5]);
        assert_eq!(result.difference, 6);
    }

    #[test]
    fn test_numeric_position_drift() {
        let index = FragmentIndex::new(vec![entry(0, "Opera/9", Some(0), 1)]).unwrap();
        assert_eq!(index.decompose_numeric("xx Opera/10", 8).nodes, vec![0]);
        assert_eq!(index.decompose_numeric("xx Opera/10", 3).nodes, vec![0]);
        assert!(index.decompose_numeric("xx Opera/10", 2).nodes.is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = FragmentIndex::new(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.decompose("anything").nodes.is_empty());
    }
}
