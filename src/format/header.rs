//! Fixed file header and section table.

use super::source::ByteSource;
use super::{
    read_u32_le, SectionKind, FLAG_HAS_TRIE, HEADER_SIZE, MAGIC, SECTION_COUNT, SUPPORTED_VERSIONS,
};
use crate::error::{DetectionError, Result};

/// Location and size of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionEntry {
    /// Absolute byte offset of the section
    pub offset: u32,
    /// Section length in bytes
    pub length: u32,
    /// Number of records in the section
    pub count: u32,
}

impl SectionEntry {
    /// Absolute offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.length as u64
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Parsed and validated file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub flags: u32,
    /// String reference to the dataset name
    pub name: u32,
    /// String reference to the data tier
    pub tier: u32,
    sections: [SectionEntry; SECTION_COUNT],
}

impl Header {
    pub(crate) fn new(
        version: u32,
        flags: u32,
        name: u32,
        tier: u32,
        sections: [SectionEntry; SECTION_COUNT],
    ) -> Self {
        Self {
            version,
            flags,
            name,
            tier,
            sections,
        }
    }

    /// Read the header from the start of `source` and validate it against the
    /// source's size.
    pub fn parse(source: &dyn ByteSource) -> Result<Self> {
        let source_len = source.len();
        if source_len < HEADER_SIZE as u64 {
            return Err(DetectionError::DataFormat(format!(
                "source is {source_len} bytes, smaller than the {HEADER_SIZE}-byte header"
            )));
        }

        let bytes = source
            .read_vec(0, HEADER_SIZE)
            .map_err(|e| DetectionError::DataFormat(format!("unable to read header: {e}")))?;
        Self::from_bytes(&bytes, source_len)
    }

    /// Decode and validate a header from its raw bytes.
    pub fn from_bytes(bytes: &[u8], source_len: u64) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DetectionError::DataFormat(format!(
                "header truncated to {} bytes",
                bytes.len()
            )));
        }
        if &bytes[0..8] != MAGIC {
            return Err(DetectionError::DataFormat(
                "missing data file magic".to_string(),
            ));
        }

        let version = read_u32_le(bytes, 8);
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(DetectionError::UnsupportedVersion(version));
        }

        let section_count = read_u32_le(bytes, 24);
        if section_count as usize != SECTION_COUNT {
            return Err(DetectionError::DataFormat(format!(
                "expected {SECTION_COUNT} sections, header declares {section_count}"
            )));
        }

        let mut sections = [SectionEntry::default(); SECTION_COUNT];
        for (slot, entry) in sections.iter_mut().enumerate() {
            let base = 28 + slot * 12;
            *entry = SectionEntry {
                offset: read_u32_le(bytes, base),
                length: read_u32_le(bytes, base + 4),
                count: read_u32_le(bytes, base + 8),
            };
        }

        let header = Self {
            version,
            flags: read_u32_le(bytes, 12),
            name: read_u32_le(bytes, 16),
            tier: read_u32_le(bytes, 20),
            sections,
        };
        header.validate(source_len)?;
        Ok(header)
    }

    fn validate(&self, source_len: u64) -> Result<()> {
        let mut previous_end = HEADER_SIZE as u64;

        for kind in SectionKind::ALL {
            let entry = self.section(kind);

            if (entry.offset as u64) < previous_end {
                return Err(DetectionError::DataFormat(format!(
                    "{kind} section at offset {} overlaps the preceding data ending at {previous_end}",
                    entry.offset
                )));
            }
            if entry.end() > source_len {
                return Err(DetectionError::DataFormat(format!(
                    "{kind} section declares {} bytes at offset {} but the source is only {source_len} bytes",
                    entry.length, entry.offset
                )));
            }
            if let Some(size) = kind.fixed_record_size() {
                if entry.length as u64 != entry.count as u64 * size as u64 {
                    return Err(DetectionError::DataFormat(format!(
                        "{kind} section is {} bytes, expected {} records of {size} bytes",
                        entry.length, entry.count
                    )));
                }
            }
            if let Some(size) = kind.table_entry_size() {
                if (entry.length as u64) < entry.count as u64 * size as u64 {
                    return Err(DetectionError::DataFormat(format!(
                        "{kind} section is {} bytes, too small for its {}-entry table",
                        entry.length, entry.count
                    )));
                }
            }

            previous_end = entry.end();
        }

        let trie = self.section(SectionKind::Trie);
        if self.has_trie() == trie.is_empty() {
            return Err(DetectionError::DataFormat(
                "trie flag disagrees with trie section length".to_string(),
            ));
        }

        Ok(())
    }

    /// Section table entry for `kind`.
    pub fn section(&self, kind: SectionKind) -> SectionEntry {
        self.sections[kind.slot()]
    }

    /// Number of records in `kind`.
    pub fn count(&self, kind: SectionKind) -> u32 {
        self.section(kind).count
    }

    pub fn has_trie(&self) -> bool {
        self.flags & FLAG_HAS_TRIE != 0
    }

    /// Encode the header into its on-disk form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.extend_from_slice(MAGIC);
        for word in [
            self.version,
            self.flags,
            self.name,
            self.tier,
            SECTION_COUNT as u32,
        ] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        for entry in &self.sections {
            out.extend_from_slice(&entry.offset.to_le_bytes());
            out.extend_from_slice(&entry.length.to_le_bytes());
            out.extend_from_slice(&entry.count.to_le_bytes());
        }
        out
    }
}
