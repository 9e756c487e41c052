//! Feature schema: the ordered feature-name contract shared by training and serving
//!
//! The schema is persisted with every artifact bundle. The JSON API (list
//! position or feature name) and the web form (`featureN` fields) both
//! resolve their inputs against it instead of assuming an order.

use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Current on-disk schema format
pub const SCHEMA_VERSION: u32 = 1;

/// Prefix of the positional form field names (`feature0`, `feature1`, ...)
pub const FORM_FIELD_PREFIX: &str = "feature";

/// Why a raw input was rejected before reaching the model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Exactly {expected} features are required, got {actual}")]
    WrongCount { expected: usize, actual: usize },

    #[error("Feature {index} ({name}) must be a finite number")]
    NonFinite { index: usize, name: String },

    #[error("Field {field} is not a number: {value:?}")]
    NotNumeric { field: String, value: String },

    #[error("Missing feature: {name}")]
    MissingFeature { name: String },

    #[error("Unknown feature: {name}")]
    UnknownFeature { name: String },
}

/// Raw feature payload as received from a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureInput {
    /// Values in schema order
    Ordered(Vec<f64>),
    /// Values keyed by feature name
    Named(BTreeMap<String, f64>),
}

impl From<Vec<f64>> for FeatureInput {
    fn from(values: Vec<f64>) -> Self {
        FeatureInput::Ordered(values)
    }
}

/// Ordered list of feature names a bundle was trained on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub schema_version: u32,
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            names,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Form field name for the feature at `index`
    pub fn form_field(index: usize) -> String {
        format!("{}{}", FORM_FIELD_PREFIX, index)
    }

    /// Validate any supported input shape into a [`FeatureVector`]
    pub fn validate(&self, input: &FeatureInput) -> Result<FeatureVector, ValidationError> {
        match input {
            FeatureInput::Ordered(values) => self.validate_ordered(values),
            FeatureInput::Named(map) => self.validate_named(map),
        }
    }

    /// Validate values given in schema order
    pub fn validate_ordered(&self, values: &[f64]) -> Result<FeatureVector, ValidationError> {
        if values.len() != self.len() {
            return Err(ValidationError::WrongCount {
                expected: self.len(),
                actual: values.len(),
            });
        }

        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::NonFinite {
                index,
                name: self.names[index].clone(),
            });
        }

        Ok(FeatureVector::new_unchecked(values.to_vec()))
    }

    /// Validate values keyed by feature name; every name must be present exactly once
    pub fn validate_named(
        &self,
        map: &BTreeMap<String, f64>,
    ) -> Result<FeatureVector, ValidationError> {
        if let Some(unknown) = map.keys().find(|k| self.index_of(k).is_none()) {
            return Err(ValidationError::UnknownFeature {
                name: unknown.clone(),
            });
        }

        let mut values = Vec::with_capacity(self.len());
        for name in &self.names {
            match map.get(name) {
                Some(v) => values.push(*v),
                None => {
                    return Err(ValidationError::MissingFeature { name: name.clone() });
                }
            }
        }

        self.validate_ordered(&values)
    }

    /// Validate the `featureN` string fields of a submitted form
    pub fn validate_form(
        &self,
        fields: &HashMap<String, String>,
    ) -> Result<FeatureVector, ValidationError> {
        let mut values = Vec::with_capacity(self.len());

        for index in 0..self.len() {
            let field = Self::form_field(index);
            let raw = fields
                .get(&field)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ValidationError::MissingFeature {
                    name: field.clone(),
                })?;

            let value = raw.parse::<f64>().map_err(|_| ValidationError::NotNumeric {
                field: field.clone(),
                value: raw.to_string(),
            })?;
            values.push(value);
        }

        self.validate_ordered(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(n: usize) -> FeatureSchema {
        FeatureSchema::new((0..n).map(|i| format!("f{}", i)).collect())
    }

    #[test]
    fn test_ordered_accepts_exact_length() {
        let s = schema(30);
        let v = s.validate_ordered(&[1.0; 30]).unwrap();
        assert_eq!(v.len(), 30);
    }

    #[test]
    fn test_ordered_rejects_wrong_length() {
        let s = schema(30);
        assert_eq!(
            s.validate_ordered(&[1.0; 29]),
            Err(ValidationError::WrongCount {
                expected: 30,
                actual: 29
            })
        );
        assert!(matches!(
            s.validate_ordered(&[1.0; 31]),
            Err(ValidationError::WrongCount { actual: 31, .. })
        ));
        assert!(s.validate_ordered(&[]).is_err());
    }

    #[test]
    fn test_ordered_rejects_non_finite() {
        let s = schema(30);
        let mut values = vec![0.5; 30];
        values[7] = f64::NAN;
        assert_eq!(
            s.validate_ordered(&values),
            Err(ValidationError::NonFinite {
                index: 7,
                name: "f7".to_string()
            })
        );

        values[7] = f64::INFINITY;
        assert!(s.validate_ordered(&values).is_err());
    }

    #[test]
    fn test_named_reorders_by_schema() {
        let s = schema(3);
        let mut map = BTreeMap::new();
        map.insert("f2".to_string(), 3.0);
        map.insert("f0".to_string(), 1.0);
        map.insert("f1".to_string(), 2.0);

        let v = s.validate_named(&map).unwrap();
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_named_rejects_missing_and_unknown() {
        let s = schema(2);
        let mut map = BTreeMap::new();
        map.insert("f0".to_string(), 1.0);
        assert_eq!(
            s.validate_named(&map),
            Err(ValidationError::MissingFeature {
                name: "f1".to_string()
            })
        );

        map.insert("f1".to_string(), 1.0);
        map.insert("bogus".to_string(), 1.0);
        assert_eq!(
            s.validate_named(&map),
            Err(ValidationError::UnknownFeature {
                name: "bogus".to_string()
            })
        );
    }

    #[test]
    fn test_form_fields() {
        let s = schema(2);
        let mut fields = HashMap::new();
        fields.insert("feature0".to_string(), " 1.5 ".to_string());
        fields.insert("feature1".to_string(), "2".to_string());
        assert_eq!(s.validate_form(&fields).unwrap().as_slice(), &[1.5, 2.0]);

        fields.insert("feature1".to_string(), "abc".to_string());
        assert!(matches!(
            s.validate_form(&fields),
            Err(ValidationError::NotNumeric { .. })
        ));

        fields.insert("feature1".to_string(), "".to_string());
        assert!(matches!(
            s.validate_form(&fields),
            Err(ValidationError::MissingFeature { .. })
        ));

        fields.insert("feature1".to_string(), "inf".to_string());
        assert!(matches!(
            s.validate_form(&fields),
            Err(ValidationError::NonFinite { index: 1, .. })
        ));
    }

    #[test]
    fn test_input_deserializes_both_shapes() {
        let ordered: FeatureInput = serde_json::from_str("[1.0, 2, 3.5]").unwrap();
        assert_eq!(ordered, FeatureInput::Ordered(vec![1.0, 2.0, 3.5]));

        let named: FeatureInput = serde_json::from_str(r#"{"f0": 1.0}"#).unwrap();
        assert!(matches!(named, FeatureInput::Named(_)));
    }
}
