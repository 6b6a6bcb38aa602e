use super::EntityIndex;
use std::ops::Range;

/// A named group of properties, such as hardware, software or browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub index: EntityIndex,
    /// Identifier assigned by the data publisher
    pub component_id: u32,
    pub name: String,
    /// Profile used when nothing matches
    pub default_profile: Option<EntityIndex>,
    pub first_property: EntityIndex,
    pub property_count: u32,
}

impl Component {
    /// Indices of the properties this component owns.
    pub fn property_indices(&self) -> Range<EntityIndex> {
        self.first_property..self.first_property + self.property_count
    }

    pub fn owns_property(&self, property: EntityIndex) -> bool {
        self.property_indices().contains(&property)
    }
}
