use super::{out_of_range, EntityStore, StoreCacheStats};
use crate::cache::{CacheConfig, EntityCache};
use crate::config::LoadMode;
use crate::entities::{EntityIndex, Node, Profile, Signature, Value};
use crate::error::{DetectionError, Result};
use crate::format::decode::Decoder;
use crate::format::{ByteSource, Header, SectionKind};
use std::sync::Arc;
use tracing::warn;

/// Entities decoded on demand from an open source, behind per-kind LRU
/// caches.
///
/// A failed read surfaces as `DataAccess` to the calling operation only;
/// nothing is cached for it and later calls retry the read.
#[derive(Debug)]
pub struct StreamedStore {
    source: Arc<dyn ByteSource>,
    header: Header,
    values: EntityCache<Value>,
    profiles: EntityCache<Profile>,
    signatures: EntityCache<Signature>,
    nodes: EntityCache<Node>,
}

impl StreamedStore {
    pub fn new(source: Arc<dyn ByteSource>, header: Header, cache: &CacheConfig) -> Self {
        Self {
            source,
            header,
            values: EntityCache::new("values", cache.values),
            profiles: EntityCache::new("profiles", cache.profiles),
            signatures: EntityCache::new("signatures", cache.signatures),
            nodes: EntityCache::new("nodes", cache.nodes),
        }
    }

    fn resolve<V, F>(
        &self,
        cache: &EntityCache<V>,
        kind: SectionKind,
        index: EntityIndex,
        decode: F,
    ) -> Result<Arc<V>>
    where
        F: FnOnce(&Decoder<'_>) -> Result<V>,
    {
        let count = self.header.count(kind);
        if index >= count {
            return Err(out_of_range(kind.name(), index, count as usize));
        }

        cache
            .get_or_load(index, || decode(&Decoder::new(&*self.source, &self.header)))
            .map_err(|err| {
                if let DetectionError::DataAccess(_) = &err {
                    warn!(error = %err, kind = cache.kind(), index, "Streamed read failed");
                }
                err
            })
    }
}

impl EntityStore for StreamedStore {
    fn mode(&self) -> LoadMode {
        LoadMode::Streamed
    }

    fn value(&self, index: EntityIndex) -> Result<Arc<Value>> {
        self.resolve(&self.values, SectionKind::Values, index, |d| d.value(index))
    }

    fn profile(&self, index: EntityIndex) -> Result<Arc<Profile>> {
        self.resolve(&self.profiles, SectionKind::Profiles, index, |d| {
            d.profile(index)
        })
    }

    fn signature(&self, index: EntityIndex) -> Result<Arc<Signature>> {
        self.resolve(&self.signatures, SectionKind::Signatures, index, |d| {
            d.signature(index)
        })
    }

    fn node(&self, index: EntityIndex) -> Result<Arc<Node>> {
        self.resolve(&self.nodes, SectionKind::Nodes, index, |d| d.node(index))
    }

    fn cache_stats(&self) -> Option<StoreCacheStats> {
        Some(StoreCacheStats {
            values: self.values.stats(),
            profiles: self.profiles.stats(),
            signatures: self.signatures.stats(),
            nodes: self.nodes.stats(),
        })
    }

    fn clear_caches(&self) {
        self.values.clear();
        self.profiles.clear();
        self.signatures.clear();
        self.nodes.clear();
    }
}
