//! A loaded data file.
//!
//! Components and properties are small and always decoded at load time.
//! Values, profiles, signatures and nodes go through an [`EntityStore`],
//! which either holds them all (resident) or reads them on demand (streamed).

use crate::cache::CacheConfig;
use crate::config::{DetectionConfig, LoadMode};
use crate::entities::{Component, EntityIndex, Node, Profile, Property, Signature, Value};
use crate::error::{DetectionError, Result};
use crate::format::decode::Decoder;
use crate::format::{ByteSource, FileSource, Header, MemorySource, SectionKind};
use crate::store::{EntityStore, ResidentStore, StoreCacheStats, StreamedStore};
use crate::trie::TrieIndex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Record counts per section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DatasetCounts {
    pub components: u32,
    pub properties: u32,
    pub values: u32,
    pub profiles: u32,
    pub signatures: u32,
    pub nodes: u32,
}

/// An immutable, shareable device detection dataset.
#[derive(Debug)]
pub struct Dataset {
    header: Header,
    name: String,
    tier: String,
    components: Vec<Component>,
    properties: Vec<Property>,
    property_lookup: HashMap<String, EntityIndex>,
    profile_ids: Vec<u32>,
    store: Box<dyn EntityStore>,
    trie: Option<TrieIndex>,
}

/// Metadata shared by both load modes.
struct Metadata {
    name: String,
    tier: String,
    components: Vec<Component>,
    properties: Vec<Property>,
    profile_ids: Vec<u32>,
}

impl Metadata {
    fn read(decoder: &Decoder<'_>, header: &Header) -> Result<Self> {
        let name = decoder.string(header.name)?;
        let tier = decoder.string(header.tier)?;

        let components = (0..header.count(SectionKind::Components))
            .map(|i| decoder.component(i))
            .collect::<Result<Vec<_>>>()?;
        let properties = (0..header.count(SectionKind::Properties))
            .map(|i| decoder.property(i))
            .collect::<Result<Vec<_>>>()?;

        for component in &components {
            for index in component.property_indices() {
                let owner = properties[index as usize].component_index;
                if owner != component.index {
                    return Err(DetectionError::DataFormat(format!(
                        "property {index} is listed under component {} but owned by {owner}",
                        component.index
                    )));
                }
            }
        }

        let profile_ids = decoder.profile_ids()?;
        if profile_ids.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(DetectionError::DataFormat(
                "profile table is not sorted by unique id".to_string(),
            ));
        }

        Ok(Self {
            name,
            tier,
            components,
            properties,
            profile_ids,
        })
    }
}

impl Dataset {
    fn assemble(
        header: Header,
        metadata: Metadata,
        store: Box<dyn EntityStore>,
        trie: Option<TrieIndex>,
    ) -> Self {
        let property_lookup = metadata
            .properties
            .iter()
            .map(|property| (property.name.clone(), property.index))
            .collect();

        Self {
            header,
            name: metadata.name,
            tier: metadata.tier,
            components: metadata.components,
            properties: metadata.properties,
            property_lookup,
            profile_ids: metadata.profile_ids,
            store,
            trie,
        }
    }

    /// Decode every record of `source` into memory.
    ///
    /// Any read failure or inconsistency is reported as `DataFormat`; no
    /// partial dataset is returned.
    pub fn load_resident(source: &dyn ByteSource) -> Result<Self> {
        let started = Instant::now();
        let header = Header::parse(source)?;
        let decoder = Decoder::new(source, &header);

        let load = || -> Result<(Metadata, ResidentStore)> {
            let metadata = Metadata::read(&decoder, &header)?;
            let values = (0..header.count(SectionKind::Values))
                .map(|i| decoder.value(i))
                .collect::<Result<Vec<_>>>()?;
            let profiles = (0..header.count(SectionKind::Profiles))
                .map(|i| decoder.profile(i))
                .collect::<Result<Vec<_>>>()?;
            let signatures = (0..header.count(SectionKind::Signatures))
                .map(|i| decoder.signature(i))
                .collect::<Result<Vec<_>>>()?;
            let nodes = (0..header.count(SectionKind::Nodes))
                .map(|i| decoder.node(i))
                .collect::<Result<Vec<_>>>()?;

            if let Some(pair) = signatures
                .windows(2)
                .find(|pair| pair[0].nodes >= pair[1].nodes)
            {
                return Err(DetectionError::DataFormat(format!(
                    "signatures {} and {} are out of order",
                    pair[0].index, pair[1].index
                )));
            }

            Ok((
                metadata,
                ResidentStore::new(values, profiles, signatures, nodes),
            ))
        };
        let (metadata, store) = load().map_err(DetectionError::into_format)?;

        let trie = if header.has_trie() {
            Some(TrieIndex::resident(source, header.section(SectionKind::Trie))?)
        } else {
            None
        };

        let dataset = Self::assemble(header, metadata, Box::new(store), trie);
        dataset.log_loaded(started);
        Ok(dataset)
    }

    /// Read metadata from `source` and keep it open for on-demand decoding.
    pub fn load_streamed(source: Arc<dyn ByteSource>, cache: &CacheConfig) -> Result<Self> {
        let started = Instant::now();
        let header = Header::parse(&*source)?;
        let metadata = Metadata::read(&Decoder::new(&*source, &header), &header)
            .map_err(DetectionError::into_format)?;

        let trie = if header.has_trie() {
            Some(TrieIndex::streamed(
                Arc::clone(&source),
                header.section(SectionKind::Trie),
            )?)
        } else {
            None
        };

        let store = StreamedStore::new(source, header.clone(), cache);
        let dataset = Self::assemble(header, metadata, Box::new(store), trie);
        dataset.log_loaded(started);
        Ok(dataset)
    }

    /// Load a resident dataset from an in-memory file image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::load_resident(&MemorySource::new(bytes))
    }

    /// Open a data file in the mode chosen by `config`.
    pub fn open(path: impl AsRef<Path>, config: &DetectionConfig) -> Result<Self> {
        config.validate()?;
        match config.load_mode {
            LoadMode::Resident => Self::from_bytes(std::fs::read(path)?),
            LoadMode::Streamed => {
                let source: Arc<dyn ByteSource> = Arc::new(FileSource::open(path)?);
                Self::load_streamed(source, &config.cache)
            }
        }
    }

    fn log_loaded(&self, started: Instant) {
        let counts = self.counts();
        info!(
            name = %self.name,
            tier = %self.tier,
            mode = ?self.mode(),
            properties = counts.properties,
            profiles = counts.profiles,
            signatures = counts.signatures,
            nodes = counts.nodes,
            trie = self.trie.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dataset loaded"
        );
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data tier, such as Lite or Premium.
    pub fn tier(&self) -> &str {
        &self.tier
    }

    pub fn version(&self) -> u32 {
        self.header.version
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn mode(&self) -> LoadMode {
        self.store.mode()
    }

    pub fn counts(&self) -> DatasetCounts {
        DatasetCounts {
            components: self.header.count(SectionKind::Components),
            properties: self.header.count(SectionKind::Properties),
            values: self.header.count(SectionKind::Values),
            profiles: self.header.count(SectionKind::Profiles),
            signatures: self.header.count(SectionKind::Signatures),
            nodes: self.header.count(SectionKind::Nodes),
        }
    }

    pub fn signature_count(&self) -> u32 {
        self.header.count(SectionKind::Signatures)
    }

    pub fn node_count(&self) -> u32 {
        self.header.count(SectionKind::Nodes)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, index: EntityIndex) -> Option<&Component> {
        self.components.get(index as usize)
    }

    pub fn component_by_name(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn property(&self, index: EntityIndex) -> Option<&Property> {
        self.properties.get(index as usize)
    }

    pub fn property_by_name(&self, name: &str) -> Option<&Property> {
        self.property_lookup
            .get(name)
            .and_then(|&index| self.property(index))
    }

    /// Properties owned by `component`.
    pub fn properties_of(&self, component: &Component) -> &[Property] {
        let range = component.property_indices();
        &self.properties[range.start as usize..range.end as usize]
    }

    pub fn value(&self, index: EntityIndex) -> Result<Arc<Value>> {
        self.store.value(index)
    }

    pub fn profile(&self, index: EntityIndex) -> Result<Arc<Profile>> {
        self.store.profile(index)
    }

    pub fn signature(&self, index: EntityIndex) -> Result<Arc<Signature>> {
        self.store.signature(index)
    }

    pub fn node(&self, index: EntityIndex) -> Result<Arc<Node>> {
        self.store.node(index)
    }

    /// Every candidate value of `property`, sorted by payload.
    pub fn values_of(&self, property: &Property) -> Result<Vec<Arc<Value>>> {
        property
            .value_indices()
            .map(|index| self.value(index))
            .collect()
    }

    /// Values `profile` selects for `property`. Empty when the profile
    /// belongs to another component or selects nothing.
    pub fn property_values(&self, profile: &Profile, property: &Property) -> Result<Vec<Arc<Value>>> {
        if profile.component_index != property.component_index {
            return Ok(Vec::new());
        }
        profile
            .values_in(property.value_indices())
            .iter()
            .map(|&index| self.value(index))
            .collect()
    }

    /// Record index of the profile with external id `profile_id`.
    pub fn profile_index_by_id(&self, profile_id: u32) -> Option<EntityIndex> {
        self.profile_ids
            .binary_search(&profile_id)
            .ok()
            .map(|index| index as EntityIndex)
    }

    pub fn profile_by_id(&self, profile_id: u32) -> Result<Option<Arc<Profile>>> {
        self.profile_index_by_id(profile_id)
            .map(|index| self.profile(index))
            .transpose()
    }

    /// The default profile of every component that declares one.
    pub fn default_profiles(&self) -> Result<Vec<Arc<Profile>>> {
        self.components
            .iter()
            .filter_map(|component| component.default_profile)
            .map(|index| self.profile(index))
            .collect()
    }

    pub fn trie(&self) -> Option<&TrieIndex> {
        self.trie.as_ref()
    }

    pub fn cache_stats(&self) -> Option<StoreCacheStats> {
        self.store.cache_stats()
    }

    pub fn clear_caches(&self) {
        self.store.clear_caches()
    }
}
