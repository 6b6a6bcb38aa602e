//! Signature matching with ranked fallbacks.
//!
//! An input is split into nodes (known fragments) and the resulting node
//! sequence is looked up among the dataset's sorted signatures. When no
//! signature has exactly that sequence, the tiers below are tried in order
//! and the first one that produces a signature wins:
//!
//! | Tier | Accepts |
//! |------|---------|
//! | exact | the node sequence itself |
//! | numeric | the sequence found when digit runs are ignored |
//! | nearest | the unique signature at the smallest node distance |
//! | closest | the best of several signatures tied at that distance |
//! | none | the default profile of every component |
//!
//! The outcome depends only on the dataset contents and the input, never on
//! load mode or cache state.

pub mod fragments;
pub(crate) mod nearest;
pub(crate) mod numeric;

pub use fragments::{Decomposition, FragmentIndex};

use crate::config::MatchConfig;
use crate::dataset::Dataset;
use crate::entities::{EntityIndex, Node, Signature};
use crate::error::Result;
use crate::result::{Match, MatchCost, MatchMethod};
use fragments::FragmentEntry;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Detections per tier since the provider was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub detections: u64,
    pub exact: u64,
    pub numeric: u64,
    pub nearest: u64,
    pub closest: u64,
    pub none: u64,
}

#[derive(Debug, Default)]
struct MethodCounters {
    exact: AtomicU64,
    numeric: AtomicU64,
    nearest: AtomicU64,
    closest: AtomicU64,
    none: AtomicU64,
}

impl MethodCounters {
    fn record(&self, method: MatchMethod) {
        let counter = match method {
            MatchMethod::Exact => &self.exact,
            MatchMethod::Numeric => &self.numeric,
            MatchMethod::Nearest => &self.nearest,
            MatchMethod::Closest => &self.closest,
            MatchMethod::None => &self.none,
        };
        counter.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

/// Pattern matcher over one dataset.
///
/// Cheap to share: wrap it in an `Arc` and call [`detect`](Self::detect)
/// from any number of threads.
#[derive(Debug)]
pub struct PatternProvider {
    dataset: Arc<Dataset>,
    fragments: FragmentIndex,
    config: MatchConfig,
    counters: MethodCounters,
}

/// A tier's pick before it becomes a [`Match`].
struct Outcome {
    method: MatchMethod,
    signature: Option<Arc<Signature>>,
    difference: u64,
}

impl PatternProvider {
    pub fn new(dataset: Arc<Dataset>) -> Result<Self> {
        Self::with_config(dataset, MatchConfig::default())
    }

    /// Build the fragment index over every node of `dataset`.
    ///
    /// Every node is read here, also for a streamed dataset, and the
    /// automata built from their fragments live as long as the provider.
    pub fn with_config(dataset: Arc<Dataset>, config: MatchConfig) -> Result<Self> {
        let nodes = (0..dataset.node_count())
            .map(|index| dataset.node(index))
            .collect::<Result<Vec<Arc<Node>>>>()?;
        let fragments = FragmentIndex::new(nodes.iter().map(|node| FragmentEntry::from(node.as_ref())))?;

        debug!(
            dataset = %dataset.name(),
            fragments = fragments.len(),
            "Pattern provider ready"
        );

        Ok(Self {
            dataset,
            fragments,
            config,
            counters: MethodCounters::default(),
        })
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Find the best profile set for `input`.
    ///
    /// Unrecognizable input is not an error: it yields a match with method
    /// [`MatchMethod::None`] carrying the default profiles. Errors come only
    /// from reading a streamed dataset.
    pub fn detect(&self, input: &str) -> Result<Match> {
        let started = Instant::now();
        let mut cost = MatchCost::default();

        let outcome = self.find(input, &mut cost)?;
        cost.difference = outcome.difference;

        let profiles = match &outcome.signature {
            Some(signature) => signature
                .profiles
                .iter()
                .map(|&index| self.dataset.profile(index))
                .collect::<Result<Vec<_>>>()?,
            None => self.dataset.default_profiles()?,
        };

        self.counters.record(outcome.method);
        debug!(
            method = %outcome.method,
            difference = cost.difference,
            signatures_compared = cost.signatures_compared,
            "Pattern detection"
        );

        Ok(Match::new(
            Arc::clone(&self.dataset),
            input,
            outcome.method,
            outcome.signature,
            profiles,
            cost,
            started.elapsed(),
        ))
    }

    /// Detect many inputs, in parallel once the batch is large enough.
    pub fn detect_batch<S>(&self, inputs: &[S]) -> Vec<Result<Match>>
    where
        S: AsRef<str> + Sync,
    {
        if inputs.len() >= self.config.min_batch_size_for_parallelism {
            inputs.par_iter().map(|input| self.detect(input.as_ref())).collect()
        } else {
            inputs.iter().map(|input| self.detect(input.as_ref())).collect()
        }
    }

    fn find(&self, input: &str, cost: &mut MatchCost) -> Result<Outcome> {
        let exact = self.fragments.decompose(input);
        cost.nodes_evaluated += exact.evaluated;

        if !exact.nodes.is_empty() {
            if let Some(signature) = self.find_signature(&exact.nodes, cost)? {
                return Ok(Outcome {
                    method: MatchMethod::Exact,
                    signature: Some(signature),
                    difference: 0,
                });
            }
        }

        let numeric = self
            .fragments
            .decompose_numeric(input, self.config.numeric_position_tolerance);
        cost.nodes_evaluated += numeric.evaluated;

        if !numeric.nodes.is_empty() && numeric.nodes != exact.nodes {
            if let Some(signature) = self.find_signature(&numeric.nodes, cost)? {
                return Ok(Outcome {
                    method: MatchMethod::Numeric,
                    signature: Some(signature),
                    difference: numeric.difference,
                });
            }
        }

        // Nodes recognised only after digit normalization still count
        // towards the nearest tier. The smaller distance wins, the exact key
        // on a tie.
        let mut fallback = self.nearest(&exact.nodes, cost)?;
        if numeric.nodes != exact.nodes {
            if let Some(outcome) = self.nearest(&numeric.nodes, cost)? {
                if fallback
                    .as_ref()
                    .map_or(true, |current| outcome.difference < current.difference)
                {
                    fallback = Some(outcome);
                }
            }
        }

        Ok(fallback.unwrap_or(Outcome {
            method: MatchMethod::None,
            signature: None,
            difference: 0,
        }))
    }

    /// Binary search of the signatures, which are sorted by node sequence.
    fn find_signature(
        &self,
        key: &[EntityIndex],
        cost: &mut MatchCost,
    ) -> Result<Option<Arc<Signature>>> {
        let (mut lo, mut hi) = (0u32, self.dataset.signature_count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let signature = self.dataset.signature(mid)?;
            cost.signatures_compared += 1;
            match signature.compare_key(key) {
                Ordering::Equal => return Ok(Some(signature)),
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }
        Ok(None)
    }

    /// Nearest and closest tiers over signatures sharing nodes with `key`.
    fn nearest(&self, key: &[EntityIndex], cost: &mut MatchCost) -> Result<Option<Outcome>> {
        if key.is_empty() {
            return Ok(None);
        }

        let nodes = key
            .iter()
            .map(|&index| self.dataset.node(index))
            .collect::<Result<Vec<_>>>()?;
        let candidates = nearest::rank_candidates(
            nodes.iter().map(|node| node.signatures.as_slice()),
            self.config.nearest_candidate_limit,
        );

        let mut best_distance = usize::MAX;
        let mut tied: Vec<Arc<Signature>> = Vec::new();
        for index in candidates {
            let signature = self.dataset.signature(index)?;
            cost.signatures_compared += 1;
            let distance = nearest::distance(self.config.distance_metric, key, &signature.nodes);
            match distance.cmp(&best_distance) {
                Ordering::Less => {
                    best_distance = distance;
                    tied.clear();
                    tied.push(signature);
                }
                Ordering::Equal => tied.push(signature),
                Ordering::Greater => {}
            }
        }

        let method = match tied.len() {
            0 => return Ok(None),
            1 => MatchMethod::Nearest,
            _ => MatchMethod::Closest,
        };
        let chosen = nearest::closest_of(key, &tied).cloned();
        Ok(chosen.map(|signature| Outcome {
            method,
            signature: Some(signature),
            difference: best_distance as u64,
        }))
    }

    /// Detections per tier so far.
    pub fn stats(&self) -> ProviderStats {
        let exact = self.counters.exact.load(AtomicOrdering::Relaxed);
        let numeric = self.counters.numeric.load(AtomicOrdering::Relaxed);
        let nearest = self.counters.nearest.load(AtomicOrdering::Relaxed);
        let closest = self.counters.closest.load(AtomicOrdering::Relaxed);
        let none = self.counters.none.load(AtomicOrdering::Relaxed);
        ProviderStats {
            detections: exact + numeric + nearest + closest + none,
            exact,
            numeric,
            nearest,
            closest,
            none,
        }
    }
}
