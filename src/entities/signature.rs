use super::EntityIndex;
use std::cmp::Ordering;

/// An ordered node sequence mapped to one profile per component.
///
/// Signatures are stored sorted by their node sequence so the pattern
/// engine can binary search a decomposed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub index: EntityIndex,
    /// Lower is more popular
    pub rank: u32,
    /// Node indices in input order
    pub nodes: Vec<EntityIndex>,
    pub profiles: Vec<EntityIndex>,
}

impl Signature {
    /// Compare this signature's node sequence with a decomposed input key.
    pub fn compare_key(&self, key: &[EntityIndex]) -> Ordering {
        self.nodes.as_slice().cmp(key)
    }

    pub fn contains_node(&self, node: EntityIndex) -> bool {
        self.nodes.contains(&node)
    }
}
