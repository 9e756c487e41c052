//! Core data models for the classifier

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of clinical measurements per sample in the Wisconsin dataset
pub const NUM_FEATURES: usize = 30;

/// Decimal places kept on the benign-class probability in responses
pub const PROBABILITY_DECIMALS: i32 = 4;

/// Validated, ordered feature values for one tumor sample.
///
/// Only constructed through [`crate::schema::FeatureSchema`] validation, so
/// the length always matches the schema and every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub(crate) fn new_unchecked(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Human-readable diagnosis derived from the raw model label.
///
/// The mapping (0 = malignant, 1 = benign) is the target encoding of the
/// training dataset and is fixed for every bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diagnosis {
    Malignant,
    Benign,
}

impl Diagnosis {
    pub fn from_label(label: u8) -> Option<Self> {
        match label {
            0 => Some(Diagnosis::Malignant),
            1 => Some(Diagnosis::Benign),
            _ => None,
        }
    }

    pub fn label(&self) -> u8 {
        match self {
            Diagnosis::Malignant => 0,
            Diagnosis::Benign => 1,
        }
    }

    /// Metric label and API value
    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::Malignant => "malignant",
            Diagnosis::Benign => "benign",
        }
    }

    /// Capitalized form used by the web form
    pub fn display_name(&self) -> &'static str {
        match self {
            Diagnosis::Malignant => "Malignant",
            Diagnosis::Benign => "Benign",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single prediction, serialized as the `/predict` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: u8,
    pub diagnosis: Diagnosis,
    pub probability_benign: f64,
}

impl PredictionResult {
    pub fn new(diagnosis: Diagnosis, probability_benign: f64) -> Self {
        Self {
            prediction: diagnosis.label(),
            diagnosis,
            probability_benign: round_probability(probability_benign),
        }
    }
}

/// Round a probability to [`PROBABILITY_DECIMALS`] places, clamped to [0, 1]
pub fn round_probability(p: f64) -> f64 {
    let factor = 10f64.powi(PROBABILITY_DECIMALS);
    ((p * factor).round() / factor).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping_is_fixed() {
        assert_eq!(Diagnosis::from_label(0), Some(Diagnosis::Malignant));
        assert_eq!(Diagnosis::from_label(1), Some(Diagnosis::Benign));
        assert_eq!(Diagnosis::from_label(2), None);
        assert_eq!(Diagnosis::Malignant.label(), 0);
        assert_eq!(Diagnosis::Benign.label(), 1);
    }

    #[test]
    fn test_prediction_result_serialization() {
        let result = PredictionResult::new(Diagnosis::Benign, 0.987_654);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["prediction"], 1);
        assert_eq!(json["diagnosis"], "benign");
        assert_eq!(json["probability_benign"], 0.9877);
    }

    #[test]
    fn test_round_probability() {
        assert_eq!(round_probability(0.123_449), 0.1234);
        assert_eq!(round_probability(0.000_04), 0.0);
        assert_eq!(round_probability(1.000_000_1), 1.0);
    }
}
