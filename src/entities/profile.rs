use super::EntityIndex;
use std::ops::Range;

/// One concrete device or software variant: a set of value selections
/// within a single component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub index: EntityIndex,
    /// Identifier assigned by the data publisher
    pub profile_id: u32,
    pub component_index: EntityIndex,
    /// Selected values, ascending
    pub values: Vec<EntityIndex>,
    /// Signatures resolving to this profile, ascending
    pub signatures: Vec<EntityIndex>,
}

impl Profile {
    /// Selected values whose index falls in `range`.
    ///
    /// Values are grouped by property in the file, so a property's value
    /// range selects exactly that property's values.
    pub fn values_in(&self, range: Range<EntityIndex>) -> &[EntityIndex] {
        let start = self.values.partition_point(|&v| v < range.start);
        let end = self.values.partition_point(|&v| v < range.end);
        &self.values[start..end]
    }
}
