//! Index-to-entity resolution for the two load modes.
//!
//! The matchers are written once against [`EntityStore`]; whether a record
//! was decoded at load time or is read from the source on demand is decided
//! when the dataset is built.

mod resident;
mod streamed;

pub use resident::ResidentStore;
pub use streamed::StreamedStore;

use crate::cache::CacheStats;
use crate::config::LoadMode;
use crate::entities::{EntityIndex, Node, Profile, Signature, Value};
use crate::error::{DetectionError, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Resolves entity indices to decoded entities.
///
/// Implementations return identical entities for the same index. An index
/// past the end of its section is a `DataFormat` error in both modes.
pub trait EntityStore: Send + Sync + fmt::Debug {
    fn mode(&self) -> LoadMode;

    fn value(&self, index: EntityIndex) -> Result<Arc<Value>>;

    fn profile(&self, index: EntityIndex) -> Result<Arc<Profile>>;

    fn signature(&self, index: EntityIndex) -> Result<Arc<Signature>>;

    fn node(&self, index: EntityIndex) -> Result<Arc<Node>>;

    /// Per-kind cache statistics, when the store caches anything.
    fn cache_stats(&self) -> Option<StoreCacheStats> {
        None
    }

    /// Drop cached entities. A no-op for stores without caches.
    fn clear_caches(&self) {}
}

/// Cache statistics for every entity kind of a streamed store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreCacheStats {
    pub values: CacheStats,
    pub profiles: CacheStats,
    pub signatures: CacheStats,
    pub nodes: CacheStats,
}

impl StoreCacheStats {
    /// Sum over all kinds.
    pub fn total(&self) -> CacheStats {
        [&self.values, &self.profiles, &self.signatures, &self.nodes]
            .into_iter()
            .fold(CacheStats::default(), |mut acc, stats| {
                acc.lookups += stats.lookups;
                acc.hits += stats.hits;
                acc.misses += stats.misses;
                acc.inserts += stats.inserts;
                acc.evictions += stats.evictions;
                acc
            })
    }
}

pub(crate) fn out_of_range(kind: &str, index: EntityIndex, count: usize) -> DetectionError {
    DetectionError::DataFormat(format!(
        "{kind} index {index} out of range ({count} records)"
    ))
}
