//! Bounded entity caches for streamed datasets.
//!
//! A streamed dataset decodes values, profiles, signatures and nodes on
//! demand by seeking into the data file. These caches keep recently decoded
//! entities so that hot signatures and nodes are read from disk once.
//!
//! # Thread Safety
//!
//! Each cache is an LRU behind a mutex. The mutex is held only for the map
//! operation itself, never while decoding. Two threads missing on the same
//! key may both decode it; entities are immutable and decoding is
//! idempotent, so the second insert simply replaces an equal value.
//!
//! Entries are handed out as `Arc`s. Evicting an entry drops only the cache's
//! reference, so a reader holding an entity is never affected by eviction.

use crate::error::Result;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Per-kind cache capacities, in entities. A capacity of 0 disables that
/// cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached values
    pub values: usize,

    /// Maximum number of cached profiles
    pub profiles: usize,

    /// Maximum number of cached signatures
    pub signatures: usize,

    /// Maximum number of cached nodes
    pub nodes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            values: 5_000,
            profiles: 5_000,
            signatures: 20_000,
            nodes: 20_000,
        }
    }
}

impl CacheConfig {
    /// All caches off. Every access decodes from the source.
    pub fn disabled() -> Self {
        Self {
            values: 0,
            profiles: 0,
            signatures: 0,
            nodes: 0,
        }
    }
}

/// Cache performance statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total cache lookups
    pub lookups: u64,

    /// Cache hits
    pub hits: u64,

    /// Cache misses
    pub misses: u64,

    /// Entries inserted after a miss
    pub inserts: u64,

    /// Entries evicted to make room
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_ratio(&self) -> f64 {
        if self.lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / self.lookups as f64
    }
}

#[derive(Debug, Default)]
struct Counters {
    lookups: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

/// LRU cache of decoded entities keyed by record index.
#[derive(Debug)]
pub struct EntityCache<V> {
    kind: &'static str,
    capacity: usize,
    storage: Option<Mutex<LruCache<u32, Arc<V>>>>,
    counters: Counters,
}

impl<V> EntityCache<V> {
    /// Create a cache for one entity kind. `capacity == 0` yields a cache
    /// that never stores anything.
    pub fn new(kind: &'static str, capacity: usize) -> Self {
        Self {
            kind,
            capacity,
            storage: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            counters: Counters::default(),
        }
    }

    /// Entity kind this cache holds, for diagnostics.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.storage.is_some()
    }

    /// Return the cached entity or decode it with `load` and remember it.
    ///
    /// A failed load is not cached; the next call retries.
    pub fn get_or_load<F>(&self, key: u32, load: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        let Some(storage) = &self.storage else {
            return load().map(Arc::new);
        };

        self.counters.lookups.fetch_add(1, Ordering::Relaxed);
        let cached = storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(entity) = cached {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entity);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let entity = Arc::new(load()?);

        let displaced = storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key, Arc::clone(&entity));
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
        if matches!(displaced, Some((old_key, _)) if old_key != key) {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }

        Ok(entity)
    }

    /// Get cache statistics for monitoring.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.counters.lookups.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    /// Get cache hit ratio for performance monitoring.
    pub fn hit_ratio(&self) -> f64 {
        self.stats().hit_ratio()
    }

    /// Drop every entry and reset the statistics.
    pub fn clear(&self) {
        if let Some(storage) = &self.storage {
            storage.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
        self.counters.lookups.store(0, Ordering::Relaxed);
        self.counters.hits.store(0, Ordering::Relaxed);
        self.counters.misses.store(0, Ordering::Relaxed);
        self.counters.inserts.store(0, Ordering::Relaxed);
        self.counters.evictions.store(0, Ordering::Relaxed);
    }

    /// Get current number of cached entries.
    pub fn len(&self) -> usize {
        self.storage
            .as_ref()
            .map(|storage| storage.lock().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectionError;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cache_basic_functionality() {
        let cache: EntityCache<String> = EntityCache::new("strings", 4);

        let first = cache.get_or_load(1, || Ok("one".to_string())).unwrap();
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);

        let second = cache
            .get_or_load(1, || panic!("should be served from cache"))
            .unwrap();
        assert_eq!(cache.stats().hits, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cache_eviction() {
        let cache: EntityCache<u32> = EntityCache::new("numbers", 3);

        for key in 0..4 {
            cache.get_or_load(key, || Ok(key * 10)).unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_lru_order_protects_recent_entries() {
        let cache: EntityCache<u32> = EntityCache::new("numbers", 2);
        let loads = AtomicUsize::new(0);
        let load = |v: u32| {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(v)
        };

        cache.get_or_load(1, || load(1)).unwrap();
        cache.get_or_load(2, || load(2)).unwrap();
        cache.get_or_load(1, || load(1)).unwrap(); // 1 is now most recent
        cache.get_or_load(3, || load(3)).unwrap(); // evicts 2
        cache.get_or_load(1, || load(1)).unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_evicted_entry_stays_valid_for_holder() {
        let cache: EntityCache<String> = EntityCache::new("strings", 1);

        let held = cache.get_or_load(1, || Ok("kept".to_string())).unwrap();
        cache.get_or_load(2, || Ok("other".to_string())).unwrap();

        assert_eq!(held.as_str(), "kept");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_disabled_cache_always_loads() {
        let cache: EntityCache<u32> = EntityCache::new("numbers", 0);
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .get_or_load(7, || {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .unwrap();
        }

        assert!(!cache.is_enabled());
        assert_eq!(loads.load(Ordering::SeqCst), 3);
        assert_eq!(cache.stats(), CacheStats::default());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache: EntityCache<u32> = EntityCache::new("numbers", 4);

        let result = cache.get_or_load(5, || Err(DetectionError::DataAccess("eof".to_string())));
        assert!(result.is_err());
        assert_eq!(cache.len(), 0);

        let value = cache.get_or_load(5, || Ok(50)).unwrap();
        assert_eq!(*value, 50);
    }

    #[test]
    fn test_clear_resets_stats() {
        let cache: EntityCache<u32> = EntityCache::new("numbers", 4);
        cache.get_or_load(1, || Ok(1)).unwrap();
        cache.get_or_load(1, || Ok(1)).unwrap();
        assert!(cache.hit_ratio() > 0.0);

        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(cache.hit_ratio(), 0.0);
    }

    #[test]
    fn test_concurrent_population() {
        let cache: Arc<EntityCache<u32>> = Arc::new(EntityCache::new("numbers", 64));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for key in 0..128u32 {
                        let value = cache.get_or_load((key + t) % 128, || Ok(key)).unwrap();
                        assert!(*value < 128);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 64);
        let stats = cache.stats();
        assert_eq!(stats.lookups, 8 * 128);
        assert_eq!(stats.hits + stats.misses, stats.lookups);
    }
}
