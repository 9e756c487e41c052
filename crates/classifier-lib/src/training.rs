//! Offline training pipeline: split, scale, fit, evaluate, persist

use crate::artifacts::{ArtifactBundle, ArtifactError, ArtifactStore, BundleManifest};
use crate::dataset::{self, Dataset, DatasetError};
use crate::scaler::{ScalingError, StandardScaler};
use crate::schema::FeatureSchema;
use crate::svm::{Gamma, SvcModel, SvcParams, SvmError};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Scaling error: {0}")]
    Scaling(#[from] ScalingError),

    #[error("SVM error: {0}")]
    Svm(#[from] SvmError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seed for the split shuffle and the calibration folds
    pub seed: u64,
    /// Fraction of each class held out for evaluation
    pub test_fraction: f64,
    /// SVM regularization
    pub c: f64,
    pub gamma: Gamma,
    /// Solver stopping tolerance on the KKT gap
    pub tol: f64,
    pub calibration_folds: usize,
    pub max_iter: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let svc = SvcParams::default();
        Self {
            seed: 42,
            test_fraction: 0.2,
            c: svc.c,
            gamma: svc.gamma,
            tol: svc.tol,
            calibration_folds: svc.calibration_folds,
            max_iter: svc.max_iter,
        }
    }
}

impl TrainingConfig {
    fn svc_params(&self) -> SvcParams {
        SvcParams {
            c: self.c,
            gamma: self.gamma,
            tol: self.tol,
            max_iter: self.max_iter,
            calibration_folds: self.calibration_folds,
            seed: self.seed,
        }
    }
}

/// Summary of a training run, stored in the bundle manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub seed: u64,
    pub test_accuracy: f64,
    pub support_vectors: usize,
    pub gamma: f64,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Per class, indexed by label
    pub train_class_counts: [usize; 2],
    pub test_class_counts: [usize; 2],
    pub duration_ms: u64,
}

/// Scaler, model and schema fit together, plus the evaluation that produced them
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ArtifactBundle,
    pub report: TrainingReport,
}

pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit on `dataset` without touching disk
    pub fn fit(&self, dataset: &Dataset) -> Result<TrainingOutcome, TrainingError> {
        let started = Instant::now();
        let split = dataset.stratified_split(self.config.test_fraction, self.config.seed)?;
        debug!(
            train = split.train.n_samples(),
            test = split.test.n_samples(),
            "Split dataset"
        );

        // Scaler sees the training partition only
        let scaler = StandardScaler::fit(&split.train.records)?;
        let x_train = scaler.transform(&split.train.records)?;

        let model = SvcModel::fit(&x_train, &split.train.targets, &self.config.svc_params())?;

        let x_test = scaler.transform(&split.test.records)?;
        let mut correct = 0usize;
        for (row, &target) in x_test.outer_iter().zip(&split.test.targets) {
            if model.predict_label(row)? == target {
                correct += 1;
            }
        }
        let test_accuracy = if split.test.n_samples() == 0 {
            0.0
        } else {
            correct as f64 / split.test.n_samples() as f64
        };

        let report = TrainingReport {
            seed: self.config.seed,
            test_accuracy,
            support_vectors: model.n_support(),
            gamma: model.gamma(),
            train_samples: split.train.n_samples(),
            test_samples: split.test.n_samples(),
            train_class_counts: split.train.class_counts(),
            test_class_counts: split.test.class_counts(),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        let schema = FeatureSchema::new(dataset.feature_names.clone());
        let bundle = ArtifactBundle::new(scaler, model, schema)?;

        Ok(TrainingOutcome { bundle, report })
    }

    /// Train on the embedded dataset and persist the bundle
    pub fn run(
        &self,
        store: &ArtifactStore,
    ) -> Result<(TrainingOutcome, BundleManifest), TrainingError> {
        let dataset = dataset::load_breast_cancer()?;
        let outcome = self.fit(&dataset)?;
        let manifest = store.save(&outcome.bundle, Some(&outcome.report))?;

        info!(
            dir = %store.dir().display(),
            test_accuracy = outcome.report.test_accuracy,
            support_vectors = outcome.report.support_vectors,
            "Training run persisted"
        );

        Ok((outcome, manifest))
    }
}

impl Default for TrainingPipeline {
    fn default() -> Self {
        Self::new(TrainingConfig::default())
    }
}
