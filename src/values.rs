//! Typed access to the values a match resolved for one property.

use crate::entities::{parse_bool, PropertyValueType, Value};
use crate::error::{DetectionError, Result};
use std::fmt;
use std::sync::Arc;

/// Values of one property for a matched profile set.
///
/// Coercions read the first value; list properties expose every value
/// through [`Values::to_string_array`].
#[derive(Debug, Clone, PartialEq)]
pub struct Values {
    property: String,
    value_type: PropertyValueType,
    values: Vec<Arc<Value>>,
    is_default: bool,
}

impl Values {
    pub(crate) fn new(
        property: impl Into<String>,
        value_type: PropertyValueType,
        values: Vec<Arc<Value>>,
        is_default: bool,
    ) -> Self {
        Self {
            property: property.into(),
            value_type,
            values,
            is_default,
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn value_type(&self) -> PropertyValueType {
        self.value_type
    }

    /// Whether the profile selected nothing and the property default was
    /// used instead.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Value>> {
        self.values.iter()
    }

    fn first(&self, target: &'static str) -> Result<&Value> {
        self.values
            .first()
            .map(|value| value.as_ref())
            .ok_or_else(|| DetectionError::value_type("", target))
    }

    pub fn to_bool(&self) -> Result<bool> {
        let value = self.first("bool")?;
        parse_bool(&value.name).ok_or_else(|| DetectionError::value_type(&value.name, "bool"))
    }

    pub fn to_int(&self) -> Result<i64> {
        let value = self.first("int")?;
        value
            .name
            .trim()
            .parse::<i64>()
            .map_err(|_| DetectionError::value_type(&value.name, "int"))
    }

    pub fn to_double(&self) -> Result<f64> {
        let value = self.first("double")?;
        value
            .to_double()
            .ok_or_else(|| DetectionError::value_type(&value.name, "double"))
    }

    pub fn to_string_array(&self) -> Vec<String> {
        self.values.iter().map(|value| value.name.clone()).collect()
    }
}

impl fmt::Display for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&value.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(value_type: PropertyValueType, payloads: &[&str]) -> Values {
        let values = payloads
            .iter()
            .enumerate()
            .map(|(i, p)| Arc::new(Value::new(i as u32, 0, p.to_string(), None)))
            .collect();
        Values::new("Test", value_type, values, false)
    }

    #[test]
    fn test_bool_coercion() {
        assert!(values(PropertyValueType::Bool, &["True"]).to_bool().unwrap());
        assert!(!values(PropertyValueType::Bool, &["false"]).to_bool().unwrap());
        assert!(matches!(
            values(PropertyValueType::String, &["iPhone"]).to_bool(),
            Err(DetectionError::ValueType { target: "bool", .. })
        ));
    }

    #[test]
    fn test_numeric_coercion() {
        let width = values(PropertyValueType::Int, &["640"]);
        assert_eq!(width.to_int().unwrap(), 640);
        assert_eq!(width.to_double().unwrap(), 640.0);

        let model = values(PropertyValueType::String, &["iPhone"]);
        match model.to_double() {
            Err(DetectionError::ValueType { value, target }) => {
                assert_eq!(value, "iPhone");
                assert_eq!(target, "double");
            }
            other => panic!("Expected ValueType, got {other:?}"),
        }
    }

    #[test]
    fn test_list_and_display() {
        let accept = values(PropertyValueType::StringList, &["image/png", "text/html"]);
        assert_eq!(accept.to_string_array(), vec!["image/png", "text/html"]);
        assert_eq!(accept.to_string(), "image/png, text/html");
        assert_eq!(accept.len(), 2);
    }

    #[test]
    fn test_empty_values_fail_coercion() {
        let empty = values(PropertyValueType::Int, &[]);
        assert!(empty.is_empty());
        assert!(empty.to_int().is_err());
        assert_eq!(empty.to_string(), "");
    }
}
