//! Prediction service built once from a loaded artifact bundle

use super::{PredictError, Predictor};
use crate::artifacts::ArtifactBundle;
use crate::models::{Diagnosis, FeatureVector, PredictionResult};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::scaler::StandardScaler;
use crate::schema::FeatureSchema;
use crate::svm::{SvcModel, SvcOutput};
use anyhow::Result;
use std::time::Instant;

/// Immutable service context: scaler, model, schema and metrics handle.
///
/// Shared by every request handler behind an `Arc`; inference takes `&self`
/// and never locks.
pub struct PredictionService {
    scaler: StandardScaler,
    model: SvcModel,
    schema: FeatureSchema,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    pub fn n_support(&self) -> usize {
        self.model.n_support()
    }

    fn infer(&self, features: &FeatureVector) -> Result<SvcOutput, PredictError> {
        let scaled = self
            .scaler
            .transform_row(features.as_slice())
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        self.model
            .predict(scaled.view())
            .map_err(|e| PredictError::Inference(e.to_string()))
    }
}

impl Predictor for PredictionService {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_vector(&self, features: &FeatureVector) -> Result<PredictionResult, PredictError> {
        let started = Instant::now();
        let output = self.infer(features);
        let latency = started.elapsed().as_secs_f64();
        self.metrics.observe_prediction_latency(latency);

        let output = output?;
        let diagnosis = Diagnosis::from_label(output.label).ok_or_else(|| {
            PredictError::Inference(format!("model produced unknown label {}", output.label))
        })?;

        let result = PredictionResult::new(diagnosis, output.probability);
        self.metrics.inc_prediction(diagnosis);
        self.logger
            .log_prediction("service", diagnosis, result.probability_benign, latency);

        Ok(result)
    }
}

/// Builder for [`PredictionService`]
pub struct PredictionServiceBuilder {
    bundle: Option<ArtifactBundle>,
    metrics: Option<ServiceMetrics>,
    logger: Option<StructuredLogger>,
}

impl PredictionServiceBuilder {
    pub fn new() -> Self {
        Self {
            bundle: None,
            metrics: None,
            logger: None,
        }
    }

    /// Set the loaded artifact bundle
    pub fn bundle(mut self, bundle: ArtifactBundle) -> Self {
        self.bundle = Some(bundle);
        self
    }

    /// Set the metrics handle
    pub fn metrics(mut self, metrics: ServiceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<PredictionService> {
        let bundle = self
            .bundle
            .ok_or_else(|| anyhow::anyhow!("Artifact bundle is required"))?;
        let metrics = self
            .metrics
            .ok_or_else(|| anyhow::anyhow!("Metrics handle is required"))?;
        let logger = self
            .logger
            .unwrap_or_else(|| StructuredLogger::new("prediction-service"));

        Ok(PredictionService {
            scaler: bundle.scaler,
            model: bundle.model,
            schema: bundle.schema,
            metrics,
            logger,
        })
    }
}

impl Default for PredictionServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
