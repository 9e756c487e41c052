//! Breast cancer classifier library
//!
//! This crate provides the core functionality for:
//! - Training a calibrated RBF support vector classifier on the Wisconsin dataset
//! - Persisting and verifying the scaler/model/schema artifact bundle
//! - Validating inputs and serving predictions
//! - Metrics and structured logging

pub mod artifacts;
pub mod dataset;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod scaler;
pub mod schema;
pub mod svm;
pub mod training;

pub use artifacts::{resolve_model_dir, ArtifactBundle, ArtifactError, ArtifactStore, BundleManifest};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{PredictError, PredictionService, PredictionServiceBuilder, Predictor};
pub use schema::{FeatureInput, FeatureSchema, ValidationError};
pub use training::{TrainingConfig, TrainingPipeline, TrainingReport};
