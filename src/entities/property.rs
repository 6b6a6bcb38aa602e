use super::EntityIndex;
use crate::error::{DetectionError, Result};
use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Declared type of a property's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValueType {
    Bool,
    Int,
    Double,
    String,
    /// Each value is one element; a profile may select several.
    StringList,
    /// A script snippet, treated as a plain string.
    JavaScript,
}

impl PropertyValueType {
    /// Code stored in the property record.
    pub fn code(self) -> u32 {
        match self {
            PropertyValueType::Bool => 0,
            PropertyValueType::Int => 1,
            PropertyValueType::Double => 2,
            PropertyValueType::String => 3,
            PropertyValueType::StringList => 4,
            PropertyValueType::JavaScript => 5,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(PropertyValueType::Bool),
            1 => Some(PropertyValueType::Int),
            2 => Some(PropertyValueType::Double),
            3 => Some(PropertyValueType::String),
            4 => Some(PropertyValueType::StringList),
            5 => Some(PropertyValueType::JavaScript),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PropertyValueType::Bool => "bool",
            PropertyValueType::Int => "int",
            PropertyValueType::Double => "double",
            PropertyValueType::String => "string",
            PropertyValueType::StringList => "string-list",
            PropertyValueType::JavaScript => "javascript",
        }
    }

    /// Parse a stored payload as this type.
    pub fn parse(self, payload: &str) -> Result<TypedValue> {
        match self {
            PropertyValueType::Bool => parse_bool(payload)
                .map(TypedValue::Bool)
                .ok_or_else(|| DetectionError::value_type(payload, "bool")),
            PropertyValueType::Int => payload
                .trim()
                .parse::<i64>()
                .map(TypedValue::Int)
                .map_err(|_| DetectionError::value_type(payload, "int")),
            PropertyValueType::Double => payload
                .trim()
                .parse::<f64>()
                .map(TypedValue::Double)
                .map_err(|_| DetectionError::value_type(payload, "double")),
            PropertyValueType::String
            | PropertyValueType::StringList
            | PropertyValueType::JavaScript => Ok(TypedValue::Text(payload.to_string())),
        }
    }

    /// Canonical string form of `payload`. Normalizing a canonical payload
    /// returns it unchanged.
    pub fn normalize(self, payload: &str) -> Result<String> {
        Ok(self.parse(payload)?.to_string())
    }
}

impl fmt::Display for PropertyValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A payload coerced to its property's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Bool(true) => f.write_str("True"),
            TypedValue::Bool(false) => f.write_str("False"),
            TypedValue::Int(v) => write!(f, "{v}"),
            TypedValue::Double(v) => write!(f, "{v}"),
            TypedValue::Text(v) => f.write_str(v),
        }
    }
}

pub(crate) fn parse_bool(payload: &str) -> Option<bool> {
    let trimmed = payload.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// A named, typed attribute of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub index: EntityIndex,
    pub component_index: EntityIndex,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub value_type: PropertyValueType,
    /// Value reported when a profile selects nothing for this property
    pub default_value: Option<EntityIndex>,
    pub first_value: EntityIndex,
    pub value_count: u32,
}

impl Property {
    /// Indices of the candidate values, which are contiguous and sorted by
    /// payload.
    pub fn value_indices(&self) -> Range<EntityIndex> {
        self.first_value..self.first_value + self.value_count
    }

    pub fn is_list(&self) -> bool {
        self.value_type == PropertyValueType::StringList
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for value_type in [
            PropertyValueType::Bool,
            PropertyValueType::Int,
            PropertyValueType::Double,
            PropertyValueType::String,
            PropertyValueType::StringList,
            PropertyValueType::JavaScript,
        ] {
            assert_eq!(PropertyValueType::from_code(value_type.code()), Some(value_type));
        }
        assert_eq!(PropertyValueType::from_code(42), None);
    }

    #[test]
    fn test_normalize_bool() {
        assert_eq!(PropertyValueType::Bool.normalize("true").unwrap(), "True");
        assert_eq!(PropertyValueType::Bool.normalize("FALSE").unwrap(), "False");
        assert!(matches!(
            PropertyValueType::Bool.normalize("yes"),
            Err(DetectionError::ValueType { target: "bool", .. })
        ));
    }

    #[test]
    fn test_normalize_numbers() {
        assert_eq!(PropertyValueType::Int.normalize("+640").unwrap(), "640");
        assert_eq!(PropertyValueType::Double.normalize("3.50").unwrap(), "3.5");
        assert_eq!(PropertyValueType::Double.normalize("2").unwrap(), "2");
        assert!(PropertyValueType::Int.normalize("6.0").is_err());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for (value_type, payload) in [
            (PropertyValueType::Double, "0.1"),
            (PropertyValueType::Double, "1e21"),
            (PropertyValueType::Int, "-12"),
            (PropertyValueType::String, " padded "),
        ] {
            let once = value_type.normalize(payload).unwrap();
            assert_eq!(value_type.normalize(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_value_range() {
        let property = Property {
            index: 2,
            component_index: 0,
            name: "ScreenPixelsWidth".to_string(),
            description: None,
            category: Some("Screen".to_string()),
            value_type: PropertyValueType::Int,
            default_value: None,
            first_value: 10,
            value_count: 4,
        };
        assert_eq!(property.value_indices(), 10..14);
        assert!(!property.is_list());
    }
}
