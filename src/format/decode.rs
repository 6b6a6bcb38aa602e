//! Record decoding shared by resident and streamed datasets.
//!
//! Both load modes go through these routines, so an entity decoded eagerly
//! at load time is identical to one decoded on demand later.

use super::source::ByteSource;
use super::{
    optional_ref, read_u32_le, Header, SectionKind, COMPONENT_RECORD_SIZE, OFFSET_TABLE_ENTRY_SIZE,
    PROFILE_TABLE_ENTRY_SIZE, PROPERTY_RECORD_SIZE, VALUE_RECORD_SIZE,
};
use crate::entities::{Component, Node, Profile, Property, PropertyValueType, Signature, Value};
use crate::error::{DetectionError, Result};

pub(crate) struct Decoder<'a> {
    source: &'a dyn ByteSource,
    header: &'a Header,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(source: &'a dyn ByteSource, header: &'a Header) -> Self {
        Self { source, header }
    }

    /// Read `len` bytes at `offset` relative to the start of `kind`.
    fn read(&self, kind: SectionKind, offset: u32, len: usize) -> Result<Vec<u8>> {
        let section = self.header.section(kind);
        if offset as u64 + len as u64 > section.length as u64 {
            return Err(DetectionError::DataFormat(format!(
                "read of {len} bytes at {offset} runs past the {kind} section ({} bytes)",
                section.length
            )));
        }
        self.source
            .read_vec(section.offset as u64 + offset as u64, len)
            .map_err(|e| {
                DetectionError::DataAccess(format!("{kind} section read at {offset} failed: {e}"))
            })
    }

    fn check_index(&self, kind: SectionKind, index: u32) -> Result<()> {
        let count = self.header.count(kind);
        if index >= count {
            return Err(DetectionError::DataFormat(format!(
                "{kind} index {index} out of range ({count} records)"
            )));
        }
        Ok(())
    }

    fn check_optional(&self, kind: SectionKind, raw: u32) -> Result<Option<u32>> {
        let index = optional_ref(raw);
        if let Some(index) = index {
            self.check_index(kind, index)?;
        }
        Ok(index)
    }

    fn check_range(&self, kind: SectionKind, first: u32, count: u32) -> Result<()> {
        let total = self.header.count(kind);
        if first as u64 + count as u64 > total as u64 {
            return Err(DetectionError::DataFormat(format!(
                "{kind} range {first}+{count} exceeds {total} records"
            )));
        }
        Ok(())
    }

    pub(crate) fn string(&self, offset: u32) -> Result<String> {
        let prefix = self.read(SectionKind::Strings, offset, 2)?;
        let len = u16::from_le_bytes([prefix[0], prefix[1]]) as usize;
        let bytes = self.read(SectionKind::Strings, offset + 2, len)?;
        String::from_utf8(bytes).map_err(|_| {
            DetectionError::DataFormat(format!("string at offset {offset} is not valid UTF-8"))
        })
    }

    pub(crate) fn optional_string(&self, raw: u32) -> Result<Option<String>> {
        optional_ref(raw).map(|offset| self.string(offset)).transpose()
    }

    pub(crate) fn component(&self, index: u32) -> Result<Component> {
        self.check_index(SectionKind::Components, index)?;
        let bytes = self.read(
            SectionKind::Components,
            index * COMPONENT_RECORD_SIZE,
            COMPONENT_RECORD_SIZE as usize,
        )?;

        let first_property = read_u32_le(&bytes, 8);
        let property_count = read_u32_le(&bytes, 12);
        self.check_range(SectionKind::Properties, first_property, property_count)?;

        Ok(Component {
            index,
            name: self.string(read_u32_le(&bytes, 0))?,
            default_profile: self.check_optional(SectionKind::Profiles, read_u32_le(&bytes, 4))?,
            first_property,
            property_count,
            component_id: read_u32_le(&bytes, 16),
        })
    }

    pub(crate) fn property(&self, index: u32) -> Result<Property> {
        self.check_index(SectionKind::Properties, index)?;
        let bytes = self.read(
            SectionKind::Properties,
            index * PROPERTY_RECORD_SIZE,
            PROPERTY_RECORD_SIZE as usize,
        )?;

        let component_index = read_u32_le(&bytes, 0);
        self.check_index(SectionKind::Components, component_index)?;

        let type_code = read_u32_le(&bytes, 16);
        let value_type = PropertyValueType::from_code(type_code).ok_or_else(|| {
            DetectionError::DataFormat(format!("property {index} has unknown type code {type_code}"))
        })?;

        let first_value = read_u32_le(&bytes, 24);
        let value_count = read_u32_le(&bytes, 28);
        self.check_range(SectionKind::Values, first_value, value_count)?;

        let default_value = self.check_optional(SectionKind::Values, read_u32_le(&bytes, 20))?;
        if let Some(default) = default_value {
            if default < first_value || default >= first_value + value_count {
                return Err(DetectionError::DataFormat(format!(
                    "property {index} default value {default} belongs to another property"
                )));
            }
        }

        Ok(Property {
            index,
            component_index,
            name: self.string(read_u32_le(&bytes, 4))?,
            description: self.optional_string(read_u32_le(&bytes, 8))?,
            category: self.optional_string(read_u32_le(&bytes, 12))?,
            value_type,
            default_value,
            first_value,
            value_count,
        })
    }

    pub(crate) fn value(&self, index: u32) -> Result<Value> {
        self.check_index(SectionKind::Values, index)?;
        let bytes = self.read(
            SectionKind::Values,
            index * VALUE_RECORD_SIZE,
            VALUE_RECORD_SIZE as usize,
        )?;

        let property_index = read_u32_le(&bytes, 0);
        self.check_index(SectionKind::Properties, property_index)?;

        Ok(Value::new(
            index,
            property_index,
            self.string(read_u32_le(&bytes, 4))?,
            self.optional_string(read_u32_le(&bytes, 8))?,
        ))
    }

    /// Profile ids in table order.
    pub(crate) fn profile_ids(&self) -> Result<Vec<u32>> {
        let count = self.header.count(SectionKind::Profiles);
        let bytes = self.read(
            SectionKind::Profiles,
            0,
            (count * PROFILE_TABLE_ENTRY_SIZE) as usize,
        )?;
        Ok((0..count as usize)
            .map(|i| read_u32_le(&bytes, i * PROFILE_TABLE_ENTRY_SIZE as usize))
            .collect())
    }

    pub(crate) fn profile(&self, index: u32) -> Result<Profile> {
        self.check_index(SectionKind::Profiles, index)?;
        let entry = self.read(
            SectionKind::Profiles,
            index * PROFILE_TABLE_ENTRY_SIZE,
            PROFILE_TABLE_ENTRY_SIZE as usize,
        )?;
        let table_id = read_u32_le(&entry, 0);
        let body = read_u32_le(&entry, 4);

        let head = self.read(SectionKind::Profiles, body, 16)?;
        let component_index = read_u32_le(&head, 0);
        let profile_id = read_u32_le(&head, 4);
        let value_count = read_u32_le(&head, 8);
        let signature_count = read_u32_le(&head, 12);

        if profile_id != table_id {
            return Err(DetectionError::DataFormat(format!(
                "profile {index} body id {profile_id} disagrees with table id {table_id}"
            )));
        }
        self.check_index(SectionKind::Components, component_index)?;

        let lists = self.u32_list(
            SectionKind::Profiles,
            body + 16,
            value_count as u64 + signature_count as u64,
        )?;
        let (values, signatures) = lists.split_at(value_count as usize);
        self.check_all(SectionKind::Values, values)?;
        self.check_all(SectionKind::Signatures, signatures)?;

        Ok(Profile {
            index,
            profile_id,
            component_index,
            values: values.to_vec(),
            signatures: signatures.to_vec(),
        })
    }

    pub(crate) fn signature(&self, index: u32) -> Result<Signature> {
        self.check_index(SectionKind::Signatures, index)?;
        let body = self.table_offset(SectionKind::Signatures, index)?;

        let head = self.read(SectionKind::Signatures, body, 12)?;
        let rank = read_u32_le(&head, 0);
        let node_count = read_u32_le(&head, 4);
        let profile_count = read_u32_le(&head, 8);

        let lists = self.u32_list(
            SectionKind::Signatures,
            body + 12,
            node_count as u64 + profile_count as u64,
        )?;
        let (nodes, profiles) = lists.split_at(node_count as usize);
        self.check_all(SectionKind::Nodes, nodes)?;
        self.check_all(SectionKind::Profiles, profiles)?;

        Ok(Signature {
            index,
            rank,
            nodes: nodes.to_vec(),
            profiles: profiles.to_vec(),
        })
    }

    pub(crate) fn node(&self, index: u32) -> Result<Node> {
        self.check_index(SectionKind::Nodes, index)?;
        let body = self.table_offset(SectionKind::Nodes, index)?;

        let head = self.read(SectionKind::Nodes, body, 16)?;
        let signature_count = read_u32_le(&head, 12);
        let signatures = self.u32_list(SectionKind::Nodes, body + 16, signature_count as u64)?;
        self.check_all(SectionKind::Signatures, &signatures)?;

        Ok(Node {
            index,
            fragment: self.string(read_u32_le(&head, 0))?,
            position: optional_ref(read_u32_le(&head, 4)),
            rank: read_u32_le(&head, 8),
            signatures,
        })
    }

    fn table_offset(&self, kind: SectionKind, index: u32) -> Result<u32> {
        let entry = self.read(
            kind,
            index * OFFSET_TABLE_ENTRY_SIZE,
            OFFSET_TABLE_ENTRY_SIZE as usize,
        )?;
        Ok(read_u32_le(&entry, 0))
    }

    fn u32_list(&self, kind: SectionKind, offset: u32, count: u64) -> Result<Vec<u32>> {
        let len = usize::try_from(count * 4).map_err(|_| {
            DetectionError::DataFormat(format!("{kind} list of {count} entries is too large"))
        })?;
        let bytes = self.read(kind, offset, len)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    fn check_all(&self, kind: SectionKind, indices: &[u32]) -> Result<()> {
        indices
            .iter()
            .try_for_each(|&index| self.check_index(kind, index))
    }
}
