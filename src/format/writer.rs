//! Serialization of explicit entity descriptions into the binary format.
//!
//! [`DatasetBuilder`] takes components, properties, values, profiles, nodes
//! and signatures as already decided and lays them out the way the reader
//! expects: properties grouped by component, values grouped by property and
//! sorted by payload, profiles sorted by id, signatures sorted by node
//! sequence, and every back reference filled in.
//!
//! ```rust
//! use device_detection::format::DatasetBuilder;
//! use device_detection::entities::PropertyValueType;
//! use device_detection::{Dataset, PatternProvider, MatchMethod};
//! use std::sync::Arc;
//!
//! let mut builder = DatasetBuilder::new("Example", "Lite");
//! let hardware = builder.add_component("HardwarePlatform", 1);
//! let is_mobile = builder.add_property(hardware, "IsMobile", PropertyValueType::Bool, None);
//! let mobile = builder.add_value(is_mobile, "True");
//! let phone = builder.add_profile(hardware, 100, &[mobile]);
//! let node = builder.add_node("Phone", None);
//! builder.add_signature(&[node], &[phone], 1);
//!
//! let dataset = Arc::new(Dataset::from_bytes(builder.build()?)?);
//! let provider = PatternProvider::new(dataset)?;
//! let result = provider.detect("My Phone 1.0")?;
//! assert_eq!(result.method(), MatchMethod::Exact);
//! # Ok::<(), device_detection::DetectionError>(())
//! ```

use super::{Header, SectionEntry, FLAG_HAS_TRIE, FORMAT_VERSION, HEADER_SIZE, NONE, SECTION_COUNT};
use crate::entities::PropertyValueType;
use crate::error::{DetectionError, Result};
use crate::pattern::fragments::{FragmentEntry, FragmentIndex};
use std::collections::{BTreeMap, HashMap};

/// Handle to an entity added to a [`DatasetBuilder`], in insertion order.
pub type BuilderId = usize;

#[derive(Debug, Clone)]
struct ComponentSpec {
    name: String,
    component_id: u32,
    default_profile: Option<BuilderId>,
}

#[derive(Debug, Clone)]
struct PropertySpec {
    component: BuilderId,
    name: String,
    value_type: PropertyValueType,
    description: Option<String>,
    category: Option<String>,
    default_value: Option<BuilderId>,
}

#[derive(Debug, Clone)]
struct ValueSpec {
    property: BuilderId,
    payload: String,
    description: Option<String>,
}

#[derive(Debug, Clone)]
struct ProfileSpec {
    component: BuilderId,
    profile_id: u32,
    values: Vec<BuilderId>,
}

#[derive(Debug, Clone)]
struct NodeSpec {
    fragment: String,
    position: Option<u32>,
}

#[derive(Debug, Clone)]
enum SignatureNodes {
    Explicit(Vec<BuilderId>),
    Sample(String),
}

#[derive(Debug, Clone)]
struct SignatureSpec {
    nodes: SignatureNodes,
    profiles: Vec<BuilderId>,
    rank: u32,
}

#[derive(Debug, Clone)]
struct TrieEntrySpec {
    key: String,
    profiles: Vec<BuilderId>,
}

/// Builds a data file image from explicit entities.
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder {
    name: String,
    tier: String,
    components: Vec<ComponentSpec>,
    properties: Vec<PropertySpec>,
    values: Vec<ValueSpec>,
    profiles: Vec<ProfileSpec>,
    nodes: Vec<NodeSpec>,
    signatures: Vec<SignatureSpec>,
    trie_entries: Vec<TrieEntrySpec>,
}

impl DatasetBuilder {
    pub fn new(name: impl Into<String>, tier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tier: tier.into(),
            ..Default::default()
        }
    }

    pub fn add_component(&mut self, name: impl Into<String>, component_id: u32) -> BuilderId {
        self.components.push(ComponentSpec {
            name: name.into(),
            component_id,
            default_profile: None,
        });
        self.components.len() - 1
    }

    pub fn add_property(
        &mut self,
        component: BuilderId,
        name: impl Into<String>,
        value_type: PropertyValueType,
        description: Option<&str>,
    ) -> BuilderId {
        self.properties.push(PropertySpec {
            component,
            name: name.into(),
            value_type,
            description: description.map(str::to_string),
            category: None,
            default_value: None,
        });
        self.properties.len() - 1
    }

    pub fn set_property_category(&mut self, property: BuilderId, category: impl Into<String>) {
        if let Some(spec) = self.properties.get_mut(property) {
            spec.category = Some(category.into());
        }
    }

    /// Add a candidate value. The payload is stored in the canonical form
    /// of the property's type.
    pub fn add_value(&mut self, property: BuilderId, payload: impl Into<String>) -> BuilderId {
        self.values.push(ValueSpec {
            property,
            payload: payload.into(),
            description: None,
        });
        self.values.len() - 1
    }

    pub fn set_value_description(&mut self, value: BuilderId, description: impl Into<String>) {
        if let Some(spec) = self.values.get_mut(value) {
            spec.description = Some(description.into());
        }
    }

    pub fn set_default_value(&mut self, property: BuilderId, value: BuilderId) {
        if let Some(spec) = self.properties.get_mut(property) {
            spec.default_value = Some(value);
        }
    }

    pub fn add_profile(
        &mut self,
        component: BuilderId,
        profile_id: u32,
        values: &[BuilderId],
    ) -> BuilderId {
        self.profiles.push(ProfileSpec {
            component,
            profile_id,
            values: values.to_vec(),
        });
        self.profiles.len() - 1
    }

    pub fn set_default_profile(&mut self, component: BuilderId, profile: BuilderId) {
        if let Some(spec) = self.components.get_mut(component) {
            spec.default_profile = Some(profile);
        }
    }

    /// Add a fragment. `position` pins it to a byte offset of the input.
    pub fn add_node(&mut self, fragment: impl Into<String>, position: Option<u32>) -> BuilderId {
        self.nodes.push(NodeSpec {
            fragment: fragment.into(),
            position,
        });
        self.nodes.len() - 1
    }

    /// Add a signature over an explicit node sequence.
    pub fn add_signature(&mut self, nodes: &[BuilderId], profiles: &[BuilderId], rank: u32) -> BuilderId {
        self.signatures.push(SignatureSpec {
            nodes: SignatureNodes::Explicit(nodes.to_vec()),
            profiles: profiles.to_vec(),
            rank,
        });
        self.signatures.len() - 1
    }

    /// Add a signature whose node sequence is whatever `sample` decomposes
    /// into against the builder's nodes.
    pub fn add_signature_from_sample(
        &mut self,
        sample: impl Into<String>,
        profiles: &[BuilderId],
        rank: u32,
    ) -> BuilderId {
        self.signatures.push(SignatureSpec {
            nodes: SignatureNodes::Sample(sample.into()),
            profiles: profiles.to_vec(),
            rank,
        });
        self.signatures.len() - 1
    }

    /// Map inputs starting with `key` to a trie device selecting `profiles`.
    pub fn add_trie_entry(&mut self, key: impl Into<String>, profiles: &[BuilderId]) {
        self.trie_entries.push(TrieEntrySpec {
            key: key.into(),
            profiles: profiles.to_vec(),
        });
    }

    /// Lay out and encode the data file.
    pub fn build(&self) -> Result<Vec<u8>> {
        self.check_references()?;

        let property_order = order_by(self.properties.len(), |p| {
            (self.properties[p].component, p)
        });
        let property_map = invert(&property_order);

        let payloads = self
            .values
            .iter()
            .map(|value| {
                self.properties[value.property]
                    .value_type
                    .normalize(&value.payload)
                    .map_err(|e| build_error(format!("value '{}': {e}", value.payload)))
            })
            .collect::<Result<Vec<_>>>()?;
        let value_order = order_by(self.values.len(), |v| {
            (property_map[self.values[v].property], payloads[v].clone())
        });
        for pair in value_order.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if self.values[a].property == self.values[b].property && payloads[a] == payloads[b] {
                return Err(build_error(format!(
                    "duplicate value '{}' for property '{}'",
                    payloads[a], self.properties[self.values[a].property].name
                )));
            }
        }
        let value_map = invert(&value_order);

        let profile_order = order_by(self.profiles.len(), |p| self.profiles[p].profile_id);
        if let Some(pair) = profile_order
            .windows(2)
            .find(|pair| self.profiles[pair[0]].profile_id == self.profiles[pair[1]].profile_id)
        {
            return Err(build_error(format!(
                "duplicate profile id {}",
                self.profiles[pair[0]].profile_id
            )));
        }
        let profile_map = invert(&profile_order);

        let keys = self.signature_keys()?;
        let signature_order = order_by(self.signatures.len(), |s| keys[s].clone());
        if let Some(pair) = signature_order
            .windows(2)
            .find(|pair| keys[pair[0]] == keys[pair[1]])
        {
            return Err(build_error(format!(
                "signatures {} and {} share the node sequence {:?}",
                pair[0], pair[1], keys[pair[0]]
            )));
        }
        let signature_map = invert(&signature_order);

        let ranks: Vec<u32> = self.signatures.iter().map(|s| s.rank).collect();
        let node_ranks = node_ranks(self.nodes.len(), &keys, &ranks);

        let mut node_signatures = vec![Vec::new(); self.nodes.len()];
        let mut profile_signatures = vec![Vec::new(); self.profiles.len()];
        for (old, key) in keys.iter().enumerate() {
            let new = signature_map[old] as u32;
            for &node in key {
                node_signatures[node as usize].push(new);
            }
            for &profile in &self.signatures[old].profiles {
                profile_signatures[profile].push(new);
            }
        }
        for list in node_signatures.iter_mut().chain(profile_signatures.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }

        let mut strings = StringTable::default();
        let name_ref = strings.add(&self.name)?;
        let tier_ref = strings.add(&self.tier)?;

        // Components keep insertion order; properties follow them in blocks.
        let mut property_ranges = vec![(0u32, 0u32); self.components.len()];
        for (new, &old) in property_order.iter().enumerate() {
            let range = &mut property_ranges[self.properties[old].component];
            if range.1 == 0 {
                range.0 = new as u32;
            }
            range.1 += 1;
        }
        let mut value_ranges = vec![(0u32, 0u32); self.properties.len()];
        for (new, &old) in value_order.iter().enumerate() {
            let range = &mut value_ranges[self.values[old].property];
            if range.1 == 0 {
                range.0 = new as u32;
            }
            range.1 += 1;
        }

        let mut components = Vec::new();
        for (index, component) in self.components.iter().enumerate() {
            let (first, count) = property_ranges[index];
            put(&mut components, strings.add(&component.name)?);
            put(&mut components, map_optional(component.default_profile, &profile_map));
            put(&mut components, first);
            put(&mut components, count);
            put(&mut components, component.component_id);
        }

        let mut properties = Vec::new();
        for &old in &property_order {
            let property = &self.properties[old];
            let (first, count) = value_ranges[old];
            put(&mut properties, property.component as u32);
            put(&mut properties, strings.add(&property.name)?);
            put(&mut properties, strings.add_optional(property.description.as_deref())?);
            put(&mut properties, strings.add_optional(property.category.as_deref())?);
            put(&mut properties, property.value_type.code());
            put(&mut properties, map_optional(property.default_value, &value_map));
            put(&mut properties, first);
            put(&mut properties, count);
        }

        let mut values = Vec::new();
        for &old in &value_order {
            let value = &self.values[old];
            put(&mut values, property_map[value.property] as u32);
            put(&mut values, strings.add(&payloads[old])?);
            put(&mut values, strings.add_optional(value.description.as_deref())?);
        }

        let profile_table = profile_order.len() * 8;
        let mut profile_bodies = Vec::new();
        let mut profiles = Vec::new();
        for &old in &profile_order {
            let profile = &self.profiles[old];
            let mut value_indices: Vec<u32> =
                profile.values.iter().map(|&v| value_map[v] as u32).collect();
            value_indices.sort_unstable();
            value_indices.dedup();

            put(&mut profiles, profile.profile_id);
            put(&mut profiles, to_u32(profile_table + profile_bodies.len())?);
            put(&mut profile_bodies, profile.component as u32);
            put(&mut profile_bodies, profile.profile_id);
            put(&mut profile_bodies, value_indices.len() as u32);
            put(&mut profile_bodies, profile_signatures[old].len() as u32);
            value_indices
                .iter()
                .chain(&profile_signatures[old])
                .for_each(|&v| put(&mut profile_bodies, v));
        }
        profiles.extend_from_slice(&profile_bodies);

        let signature_table = signature_order.len() * 4;
        let mut signature_bodies = Vec::new();
        let mut signatures = Vec::new();
        for &old in &signature_order {
            let signature = &self.signatures[old];
            let mut profile_indices: Vec<u32> = signature
                .profiles
                .iter()
                .map(|&p| profile_map[p] as u32)
                .collect();
            profile_indices.sort_unstable();

            put(&mut signatures, to_u32(signature_table + signature_bodies.len())?);
            put(&mut signature_bodies, signature.rank);
            put(&mut signature_bodies, keys[old].len() as u32);
            put(&mut signature_bodies, profile_indices.len() as u32);
            keys[old]
                .iter()
                .chain(&profile_indices)
                .for_each(|&v| put(&mut signature_bodies, v));
        }
        signatures.extend_from_slice(&signature_bodies);

        let node_table = self.nodes.len() * 4;
        let mut node_bodies = Vec::new();
        let mut nodes = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            put(&mut nodes, to_u32(node_table + node_bodies.len())?);
            put(&mut node_bodies, strings.add(&node.fragment)?);
            put(&mut node_bodies, node.position.unwrap_or(NONE));
            put(&mut node_bodies, node_ranks[index]);
            put(&mut node_bodies, node_signatures[index].len() as u32);
            node_signatures[index]
                .iter()
                .for_each(|&v| put(&mut node_bodies, v));
        }
        nodes.extend_from_slice(&node_bodies);

        let trie = self.encode_trie(&profile_map)?;

        let sections: [(Vec<u8>, usize); SECTION_COUNT] = [
            (strings.bytes, strings.count),
            (components, self.components.len()),
            (properties, self.properties.len()),
            (values, self.values.len()),
            (profiles, self.profiles.len()),
            (signatures, self.signatures.len()),
            (nodes, self.nodes.len()),
            (trie, 0),
        ];

        let mut entries = [SectionEntry::default(); SECTION_COUNT];
        let mut offset = HEADER_SIZE;
        for (entry, (bytes, count)) in entries.iter_mut().zip(&sections) {
            *entry = SectionEntry {
                offset: to_u32(offset)?,
                length: to_u32(bytes.len())?,
                count: to_u32(*count)?,
            };
            offset += bytes.len();
        }
        to_u32(offset)?;

        let flags = if self.trie_entries.is_empty() {
            0
        } else {
            FLAG_HAS_TRIE
        };
        let header = Header::new(FORMAT_VERSION, flags, name_ref, tier_ref, entries);

        let mut out = header.to_bytes();
        out.reserve(offset - HEADER_SIZE);
        for (bytes, _) in &sections {
            out.extend_from_slice(bytes);
        }
        Ok(out)
    }

    fn check_references(&self) -> Result<()> {
        for (index, component) in self.components.iter().enumerate() {
            if let Some(profile) = component.default_profile {
                let owner = self.profiles.get(profile).map(|p| p.component);
                if owner != Some(index) {
                    return Err(build_error(format!(
                        "default profile {profile} of component '{}' belongs elsewhere",
                        component.name
                    )));
                }
            }
        }
        for property in &self.properties {
            if property.component >= self.components.len() {
                return Err(build_error(format!(
                    "property '{}' references missing component {}",
                    property.name, property.component
                )));
            }
        }
        for (index, value) in self.values.iter().enumerate() {
            if value.property >= self.properties.len() {
                return Err(build_error(format!(
                    "value {index} references missing property {}",
                    value.property
                )));
            }
        }
        for (index, property) in self.properties.iter().enumerate() {
            if let Some(default) = property.default_value {
                if self.values.get(default).map(|v| v.property) != Some(index) {
                    return Err(build_error(format!(
                        "default value {default} does not belong to property '{}'",
                        property.name
                    )));
                }
            }
        }
        for profile in &self.profiles {
            if profile.component >= self.components.len() {
                return Err(build_error(format!(
                    "profile {} references missing component {}",
                    profile.profile_id, profile.component
                )));
            }
            for &value in &profile.values {
                let component = self
                    .values
                    .get(value)
                    .map(|v| self.properties[v.property].component);
                if component != Some(profile.component) {
                    return Err(build_error(format!(
                        "profile {} selects value {value} from another component",
                        profile.profile_id
                    )));
                }
            }
        }
        if let Some(node) = self.nodes.iter().find(|n| n.fragment.is_empty()) {
            return Err(build_error(format!(
                "node at position {:?} has an empty fragment",
                node.position
            )));
        }
        for (index, signature) in self.signatures.iter().enumerate() {
            self.check_profile_set(&format!("signature {index}"), &signature.profiles)?;
            if let SignatureNodes::Explicit(nodes) = &signature.nodes {
                if let Some(node) = nodes.iter().find(|&&n| n >= self.nodes.len()) {
                    return Err(build_error(format!(
                        "signature {index} references missing node {node}"
                    )));
                }
            }
        }
        for entry in &self.trie_entries {
            self.check_profile_set(&format!("trie entry '{}'", entry.key), &entry.profiles)?;
        }
        Ok(())
    }

    /// At most one profile per component.
    fn check_profile_set(&self, owner: &str, profiles: &[BuilderId]) -> Result<()> {
        let mut seen = HashMap::new();
        for &profile in profiles {
            let spec = self
                .profiles
                .get(profile)
                .ok_or_else(|| build_error(format!("{owner} references missing profile {profile}")))?;
            if seen.insert(spec.component, profile).is_some() {
                return Err(build_error(format!(
                    "{owner} has two profiles for component {}",
                    spec.component
                )));
            }
        }
        Ok(())
    }

    /// Node sequence of every signature.
    ///
    /// Sample decomposition breaks equal-length ties by node rank, which
    /// itself depends on the signatures. Samples are decomposed once with
    /// flat ranks and again with the resulting ranks; a difference means the
    /// sample is ambiguous.
    fn signature_keys(&self) -> Result<Vec<Vec<u32>>> {
        let provisional = self.decompose_signatures(&vec![0; self.nodes.len()])?;
        let ranks: Vec<u32> = self.signatures.iter().map(|s| s.rank).collect();
        let settled = self.decompose_signatures(&node_ranks(self.nodes.len(), &provisional, &ranks))?;

        for (index, (first, second)) in provisional.iter().zip(&settled).enumerate() {
            if first != second {
                return Err(build_error(format!(
                    "signature {index} sample decomposes differently once node ranks are known"
                )));
            }
            if second.is_empty() {
                return Err(build_error(format!("signature {index} has no nodes")));
            }
        }
        Ok(settled)
    }

    fn decompose_signatures(&self, node_ranks: &[u32]) -> Result<Vec<Vec<u32>>> {
        let index = FragmentIndex::new(self.nodes.iter().enumerate().map(|(i, node)| {
            FragmentEntry {
                node: i as u32,
                fragment: node.fragment.clone(),
                position: node.position,
                rank: node_ranks[i],
            }
        }))?;

        Ok(self
            .signatures
            .iter()
            .map(|signature| match &signature.nodes {
                SignatureNodes::Explicit(nodes) => nodes.iter().map(|&n| n as u32).collect(),
                SignatureNodes::Sample(sample) => index.decompose(sample).nodes,
            })
            .collect())
    }

    fn encode_trie(&self, profile_map: &[usize]) -> Result<Vec<u8>> {
        if self.trie_entries.is_empty() {
            return Ok(Vec::new());
        }

        struct TrieNode {
            device: u32,
            children: BTreeMap<u8, usize>,
        }
        let mut trie = vec![TrieNode {
            device: NONE,
            children: BTreeMap::new(),
        }];

        for (device, entry) in self.trie_entries.iter().enumerate() {
            if entry.key.is_empty() {
                return Err(build_error("trie entries need a non-empty key".to_string()));
            }
            let mut current = 0;
            for &byte in entry.key.as_bytes() {
                let existing = trie[current].children.get(&byte).copied();
                current = match existing {
                    Some(child) => child,
                    None => {
                        trie.push(TrieNode {
                            device: NONE,
                            children: BTreeMap::new(),
                        });
                        let child = trie.len() - 1;
                        trie[current].children.insert(byte, child);
                        child
                    }
                };
            }
            if trie[current].device != NONE {
                return Err(build_error(format!("duplicate trie key '{}'", entry.key)));
            }
            trie[current].device = device as u32;
        }

        let component_count = self.components.len();
        let table_len = self.trie_entries.len() * component_count * 4;
        let mut offsets = Vec::with_capacity(trie.len());
        let mut next = 12 + table_len;
        for node in &trie {
            offsets.push(to_u32(next)?);
            next += 8 + node.children.len() * 8;
        }

        let mut out = Vec::with_capacity(next);
        put(&mut out, self.trie_entries.len() as u32);
        put(&mut out, component_count as u32);
        put(&mut out, offsets[0]);
        for entry in &self.trie_entries {
            let mut row = vec![NONE; component_count];
            for &profile in &entry.profiles {
                row[self.profiles[profile].component] = profile_map[profile] as u32;
            }
            row.into_iter().for_each(|v| put(&mut out, v));
        }
        for node in &trie {
            put(&mut out, node.device);
            put(&mut out, node.children.len() as u32);
            for (&byte, &child) in &node.children {
                put(&mut out, byte as u32);
                put(&mut out, offsets[child]);
            }
        }
        Ok(out)
    }
}

/// Deduplicated strings section.
#[derive(Debug, Default)]
struct StringTable {
    bytes: Vec<u8>,
    offsets: HashMap<String, u32>,
    count: usize,
}

impl StringTable {
    fn add(&mut self, text: &str) -> Result<u32> {
        if let Some(&offset) = self.offsets.get(text) {
            return Ok(offset);
        }
        let len = u16::try_from(text.len())
            .map_err(|_| build_error(format!("string of {} bytes is too long", text.len())))?;
        let offset = to_u32(self.bytes.len())?;
        self.bytes.extend_from_slice(&len.to_le_bytes());
        self.bytes.extend_from_slice(text.as_bytes());
        self.offsets.insert(text.to_string(), offset);
        self.count += 1;
        Ok(offset)
    }

    fn add_optional(&mut self, text: Option<&str>) -> Result<u32> {
        text.map_or(Ok(NONE), |text| self.add(text))
    }
}

fn build_error(message: String) -> DetectionError {
    DetectionError::Build(message)
}

fn put(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| build_error(format!("{value} does not fit the file format")))
}

fn map_optional(id: Option<BuilderId>, map: &[usize]) -> u32 {
    id.map_or(NONE, |id| map[id] as u32)
}

/// Insertion ids sorted by `key`; ties keep insertion order.
fn order_by<K: Ord>(len: usize, key: impl Fn(usize) -> K) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.sort_by_key(|&id| key(id));
    order
}

/// Old id to new position.
fn invert(order: &[usize]) -> Vec<usize> {
    let mut map = vec![0; order.len()];
    for (new, &old) in order.iter().enumerate() {
        map[old] = new;
    }
    map
}

/// Best signature rank per node; `u32::MAX` for nodes no signature uses.
fn node_ranks(node_count: usize, keys: &[Vec<u32>], signature_ranks: &[u32]) -> Vec<u32> {
    let mut ranks = vec![u32::MAX; node_count];
    for (key, &rank) in keys.iter().zip(signature_ranks) {
        for &node in key {
            let slot = &mut ranks[node as usize];
            *slot = (*slot).min(rank);
        }
    }
    ranks
}
