//! Byte-wise trie matching.
//!
//! The trie section maps input prefixes straight to a device index, which
//! in turn selects one profile per component from the device table. There
//! are no fallbacks: an input either completes a path or is unmatched.
//!
//! # Section Layout
//!
//! ```text
//! device count | component count | root offset
//! device table: device count x component count profile indices
//! nodes:        device index | child count | child count x (byte, offset)
//! ```
//!
//! Offsets are relative to the start of the section. Children are sorted by
//! byte so each step is a binary search.

use crate::dataset::Dataset;
use crate::entities::Profile;
use crate::error::{DetectionError, Result};
use crate::format::{optional_ref, read_u32_le, ByteSource, MemorySource, SectionEntry, NONE};
use std::fmt;
use std::sync::Arc;

const TRIE_HEADER_SIZE: u32 = 12;
const TRIE_NODE_HEADER_SIZE: u32 = 8;
const TRIE_CHILD_SIZE: u32 = 8;

/// Device resolved by a trie walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIndex(pub u32);

impl DeviceIndex {
    /// No trie path matched the input.
    pub const UNMATCHED: DeviceIndex = DeviceIndex(NONE);

    pub fn is_matched(self) -> bool {
        self != Self::UNMATCHED
    }
}

impl fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_matched() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("unmatched")
        }
    }
}

/// Read access to the trie section of a data file.
#[derive(Debug)]
pub struct TrieIndex {
    source: Arc<dyn ByteSource>,
    base: u64,
    length: u32,
    device_count: u32,
    component_count: u32,
    root: u32,
}

impl TrieIndex {
    /// Copy the trie section into memory.
    pub(crate) fn resident(source: &dyn ByteSource, section: SectionEntry) -> Result<Self> {
        let bytes = source
            .read_vec(section.offset as u64, section.length as usize)
            .map_err(|e| DetectionError::DataFormat(format!("unable to read trie section: {e}")))?;
        Self::open(Arc::new(MemorySource::new(bytes)), 0, section.length)
    }

    /// Read the trie section from `source` on every walk.
    pub(crate) fn streamed(source: Arc<dyn ByteSource>, section: SectionEntry) -> Result<Self> {
        Self::open(source, section.offset as u64, section.length)
            .map_err(DetectionError::into_format)
    }

    fn open(source: Arc<dyn ByteSource>, base: u64, length: u32) -> Result<Self> {
        let mut trie = Self {
            source,
            base,
            length,
            device_count: 0,
            component_count: 0,
            root: 0,
        };

        let head = trie.read(0, TRIE_HEADER_SIZE as usize)?;
        trie.device_count = read_u32_le(&head, 0);
        trie.component_count = read_u32_le(&head, 4);
        trie.root = read_u32_le(&head, 8);

        let table_end =
            TRIE_HEADER_SIZE as u64 + trie.device_count as u64 * trie.component_count as u64 * 4;
        if table_end > length as u64 {
            return Err(DetectionError::DataFormat(format!(
                "trie device table of {} x {} entries exceeds the {length}-byte section",
                trie.device_count, trie.component_count
            )));
        }
        if (trie.root as u64) < table_end || trie.root as u64 + TRIE_NODE_HEADER_SIZE as u64 > length as u64 {
            return Err(DetectionError::DataFormat(format!(
                "trie root offset {} outside the node area",
                trie.root
            )));
        }

        Ok(trie)
    }

    fn read(&self, offset: u32, len: usize) -> Result<Vec<u8>> {
        if offset as u64 + len as u64 > self.length as u64 {
            return Err(DetectionError::DataFormat(format!(
                "trie read of {len} bytes at {offset} runs past the {}-byte section",
                self.length
            )));
        }
        self.source
            .read_vec(self.base + offset as u64, len)
            .map_err(|e| DetectionError::DataAccess(format!("trie read at {offset} failed: {e}")))
    }

    pub fn device_count(&self) -> u32 {
        self.device_count
    }

    pub fn component_count(&self) -> u32 {
        self.component_count
    }

    /// Walk the trie with the bytes of `input`.
    ///
    /// A node without children ends the walk with its device, whatever input
    /// remains. A missing transition ends it unmatched. Running out of input
    /// yields the current node's device, if it has one.
    pub fn device_index(&self, input: &str) -> Result<DeviceIndex> {
        let mut offset = self.root;
        let mut remaining = input.as_bytes().iter();

        loop {
            let head = self.read(offset, TRIE_NODE_HEADER_SIZE as usize)?;
            let device = DeviceIndex(read_u32_le(&head, 0));
            let child_count = read_u32_le(&head, 4);

            if child_count == 0 {
                return Ok(device);
            }
            let Some(&byte) = remaining.next() else {
                return Ok(device);
            };

            let children = self.read(
                offset + TRIE_NODE_HEADER_SIZE,
                child_count as usize * TRIE_CHILD_SIZE as usize,
            )?;
            match find_child(&children, child_count as usize, byte) {
                Some(next) => offset = next,
                None => return Ok(DeviceIndex::UNMATCHED),
            }
        }
    }

    /// Profile indices of a device, one per component that has one.
    pub fn device_profiles(&self, device: DeviceIndex) -> Result<Vec<u32>> {
        if !device.is_matched() || device.0 >= self.device_count {
            return Ok(Vec::new());
        }
        let row = TRIE_HEADER_SIZE + device.0 * self.component_count * 4;
        let bytes = self.read(row, self.component_count as usize * 4)?;
        Ok((0..self.component_count as usize)
            .filter_map(|i| optional_ref(read_u32_le(&bytes, i * 4)))
            .collect())
    }
}

fn find_child(children: &[u8], count: usize, byte: u8) -> Option<u32> {
    let (mut lo, mut hi) = (0usize, count);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let key = read_u32_le(children, mid * TRIE_CHILD_SIZE as usize);
        match key.cmp(&(byte as u32)) {
            std::cmp::Ordering::Equal => {
                return Some(read_u32_le(children, mid * TRIE_CHILD_SIZE as usize + 4))
            }
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
        }
    }
    None
}

/// Trie matcher over a dataset that carries a trie section.
#[derive(Debug, Clone)]
pub struct TrieProvider {
    dataset: Arc<Dataset>,
}

impl TrieProvider {
    pub fn new(dataset: Arc<Dataset>) -> Result<Self> {
        if dataset.trie().is_none() {
            return Err(DetectionError::DataFormat(format!(
                "dataset '{}' has no trie section",
                dataset.name()
            )));
        }
        Ok(Self { dataset })
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    fn trie(&self) -> Result<&TrieIndex> {
        self.dataset
            .trie()
            .ok_or_else(|| DetectionError::DataFormat("dataset has no trie section".to_string()))
    }

    /// Device index for `input`, or [`DeviceIndex::UNMATCHED`].
    pub fn device_index(&self, input: &str) -> Result<DeviceIndex> {
        self.trie()?.device_index(input)
    }

    /// Profiles selected by a device.
    pub fn device_profiles(&self, device: DeviceIndex) -> Result<Vec<Arc<Profile>>> {
        self.trie()?
            .device_profiles(device)?
            .into_iter()
            .map(|index| self.dataset.profile(index))
            .collect()
    }

    /// Value of property `name` for `device`, with multiple values joined
    /// by `|`.
    ///
    /// Returns `None` for an unmatched device, an unknown property, or a
    /// property with neither a value nor a default.
    pub fn property_value(&self, device: DeviceIndex, name: &str) -> Result<Option<String>> {
        let Some(property) = self.dataset.property_by_name(name) else {
            return Ok(None);
        };
        if !device.is_matched() {
            return Ok(None);
        }

        let profile = self
            .device_profiles(device)?
            .into_iter()
            .find(|profile| profile.component_index == property.component_index);

        let mut values = match &profile {
            Some(profile) => self.dataset.property_values(profile, property)?,
            None => Vec::new(),
        };
        if values.is_empty() {
            if let Some(default) = property.default_value {
                values.push(self.dataset.value(default)?);
            }
        }
        if values.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            values
                .iter()
                .map(|value| value.name.as_str())
                .collect::<Vec<_>>()
                .join("|"),
        ))
    }
}
