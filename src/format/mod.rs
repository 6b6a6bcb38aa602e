//! Binary data file layout.
//!
//! All integers are little-endian `u32` unless noted. Entities reference each
//! other by record index; strings are referenced by byte offset into the
//! strings section. `NONE` (`u32::MAX`) marks an absent reference.
//!
//! # High-Level Layout
//!
//! ```text
//! [Header: 124 bytes]
//!   magic "DDETECT\0" | version | flags | name ref | tier ref | section count
//!   8 x (offset, length, record count)
//! [Strings]     u16 length + UTF-8 bytes, back to back
//! [Components]  20-byte records
//! [Properties]  32-byte records, grouped by component
//! [Values]      12-byte records, grouped by property, sorted by payload
//! [Profiles]    (profile id, body offset) table sorted by id, then bodies
//! [Signatures]  body offset table, then bodies; sorted by node sequence
//! [Nodes]       body offset table, then bodies
//! [Trie]        optional; device table then trie nodes
//! ```
//!
//! Data tiers (Lite, Premium, Enterprise) share this layout and differ only
//! in how many properties and values are populated and whether the trie
//! section is present.

pub(crate) mod decode;
pub mod header;
pub mod source;
pub mod writer;

pub use header::{Header, SectionEntry};
pub use source::{ByteSource, FileSource, MemorySource};
pub use writer::{BuilderId, DatasetBuilder};

/// Magic bytes identifying a device detection data file
pub const MAGIC: &[u8; 8] = b"DDETECT\0";

/// Format version written by [`DatasetBuilder`]
pub const FORMAT_VERSION: u32 = 32;

/// Format versions this crate can read
pub const SUPPORTED_VERSIONS: &[u32] = &[FORMAT_VERSION];

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 28 + SECTION_COUNT * 12;

/// Number of entries in the section table
pub const SECTION_COUNT: usize = 8;

/// Absent reference marker
pub const NONE: u32 = u32::MAX;

/// Header flag: the trie section is populated
pub const FLAG_HAS_TRIE: u32 = 1;

pub const COMPONENT_RECORD_SIZE: u32 = 20;
pub const PROPERTY_RECORD_SIZE: u32 = 32;
pub const VALUE_RECORD_SIZE: u32 = 12;

/// Profile table entry: profile id + body offset
pub const PROFILE_TABLE_ENTRY_SIZE: u32 = 8;

/// Signature and node table entry: body offset
pub const OFFSET_TABLE_ENTRY_SIZE: u32 = 4;

/// Sections of the data file, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Strings,
    Components,
    Properties,
    Values,
    Profiles,
    Signatures,
    Nodes,
    Trie,
}

impl SectionKind {
    pub const ALL: [SectionKind; SECTION_COUNT] = [
        SectionKind::Strings,
        SectionKind::Components,
        SectionKind::Properties,
        SectionKind::Values,
        SectionKind::Profiles,
        SectionKind::Signatures,
        SectionKind::Nodes,
        SectionKind::Trie,
    ];

    /// Position of this section in the header's section table.
    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SectionKind::Strings => "strings",
            SectionKind::Components => "components",
            SectionKind::Properties => "properties",
            SectionKind::Values => "values",
            SectionKind::Profiles => "profiles",
            SectionKind::Signatures => "signatures",
            SectionKind::Nodes => "nodes",
            SectionKind::Trie => "trie",
        }
    }

    /// Record size for sections made only of fixed-size records.
    pub fn fixed_record_size(self) -> Option<u32> {
        match self {
            SectionKind::Components => Some(COMPONENT_RECORD_SIZE),
            SectionKind::Properties => Some(PROPERTY_RECORD_SIZE),
            SectionKind::Values => Some(VALUE_RECORD_SIZE),
            _ => None,
        }
    }

    /// Size of one lookup-table entry for variable-length sections.
    pub fn table_entry_size(self) -> Option<u32> {
        match self {
            SectionKind::Profiles => Some(PROFILE_TABLE_ENTRY_SIZE),
            SectionKind::Signatures | SectionKind::Nodes => Some(OFFSET_TABLE_ENTRY_SIZE),
            _ => None,
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
pub(crate) fn read_u32_le(bytes: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
}

/// Map a stored `u32` reference to `None` when it is the absent marker.
#[inline]
pub(crate) fn optional_ref(raw: u32) -> Option<u32> {
    (raw != NONE).then_some(raw)
}
