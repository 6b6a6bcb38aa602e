use super::EntityIndex;
use std::sync::OnceLock;

/// One payload a property may take.
#[derive(Debug, Clone)]
pub struct Value {
    pub index: EntityIndex,
    pub property_index: EntityIndex,
    /// String payload
    pub name: String,
    pub description: Option<String>,
    numeric: OnceLock<Option<f64>>,
}

impl Value {
    pub fn new(
        index: EntityIndex,
        property_index: EntityIndex,
        name: String,
        description: Option<String>,
    ) -> Self {
        Self {
            index,
            property_index,
            name,
            description,
            numeric: OnceLock::new(),
        }
    }

    /// Numeric reading of the payload, parsed once and remembered.
    pub fn to_double(&self) -> Option<f64> {
        *self
            .numeric
            .get_or_init(|| self.name.trim().parse::<f64>().ok())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.property_index == other.property_index
            && self.name == other.name
            && self.description == other.description
    }
}
