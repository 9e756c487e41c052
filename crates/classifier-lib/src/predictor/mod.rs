//! Prediction engine shared by the JSON API and the form UI

mod service;

pub use service::{PredictionService, PredictionServiceBuilder};

use crate::models::{FeatureVector, PredictionResult};
use crate::schema::{FeatureInput, FeatureSchema, ValidationError};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    /// Input rejected before reaching the model
    #[error("{0}")]
    Invalid(#[from] ValidationError),

    /// Scaling or inference failed on a validated input
    #[error("Prediction error: {0}")]
    Inference(String),
}

impl PredictError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::Invalid(_))
    }
}

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Feature contract inputs are validated against
    fn schema(&self) -> &FeatureSchema;

    /// Run the model on an already validated vector
    fn predict_vector(&self, features: &FeatureVector) -> Result<PredictionResult, PredictError>;

    /// Validate a JSON payload and predict
    fn predict(&self, input: &FeatureInput) -> Result<PredictionResult, PredictError> {
        let features = self.schema().validate(input)?;
        self.predict_vector(&features)
    }

    /// Validate submitted `featureN` form fields and predict
    fn predict_form(
        &self,
        fields: &HashMap<String, String>,
    ) -> Result<PredictionResult, PredictError> {
        let features = self.schema().validate_form(fields)?;
        self.predict_vector(&features)
    }
}
