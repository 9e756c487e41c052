//! Embedded Breast Cancer Wisconsin (Diagnostic) dataset
//!
//! 569 samples, 30 real-valued features computed from digitized images of
//! fine needle aspirates. Target encoding: 0 = malignant, 1 = benign.

use crate::models::NUM_FEATURES;
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Deserialize;
use thiserror::Error;

const BREAST_CANCER_JSON: &str = include_str!("../data/breast_cancer.json");

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to parse embedded dataset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Sample {index} has {actual} features, expected {expected}")]
    Shape {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Sample {index} has invalid target {target}")]
    Target { index: usize, target: u8 },

    #[error("Test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),
}

#[derive(Deserialize)]
struct RawDataset {
    feature_names: Vec<String>,
    target_names: Vec<String>,
    samples: Vec<RawSample>,
}

#[derive(Deserialize)]
struct RawSample {
    target: u8,
    features: Vec<f64>,
}

/// Feature matrix with binary targets
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Array2<f64>,
    pub targets: Vec<u8>,
    pub feature_names: Vec<String>,
    pub target_names: Vec<String>,
}

/// Train/test partition of a [`Dataset`]
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

impl Dataset {
    pub fn n_samples(&self) -> usize {
        self.records.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.records.ncols()
    }

    /// Number of samples per class, indexed by label
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for &t in &self.targets {
            counts[t as usize] += 1;
        }
        counts
    }

    /// Subset of rows, in the order given
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            records: self.records.select(Axis(0), indices),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
            feature_names: self.feature_names.clone(),
            target_names: self.target_names.clone(),
        }
    }

    /// Stratified split preserving the class balance in both partitions.
    ///
    /// Per class, indices are shuffled with a seeded Xoshiro256++ and the
    /// first `round(n_class * test_fraction)` go to the test partition. Both
    /// partitions keep ascending original row order.
    pub fn stratified_split(&self, test_fraction: f64, seed: u64) -> Result<Split, DatasetError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(DatasetError::InvalidFraction(test_fraction));
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut train_idx = Vec::with_capacity(self.n_samples());
        let mut test_idx = Vec::new();

        for class in 0..2u8 {
            let mut members: Vec<usize> = self
                .targets
                .iter()
                .enumerate()
                .filter(|&(_, &t)| t == class)
                .map(|(i, _)| i)
                .collect();
            members.shuffle(&mut rng);

            let n_test = (members.len() as f64 * test_fraction).round() as usize;
            test_idx.extend_from_slice(&members[..n_test]);
            train_idx.extend_from_slice(&members[n_test..]);
        }

        train_idx.sort_unstable();
        test_idx.sort_unstable();

        Ok(Split {
            train: self.select(&train_idx),
            test: self.select(&test_idx),
        })
    }
}

/// Load the embedded Wisconsin diagnostic dataset
pub fn load_breast_cancer() -> Result<Dataset, DatasetError> {
    let raw: RawDataset = serde_json::from_str(BREAST_CANCER_JSON)?;

    let n = raw.samples.len();
    let mut flat = Vec::with_capacity(n * NUM_FEATURES);
    let mut targets = Vec::with_capacity(n);

    for (index, sample) in raw.samples.into_iter().enumerate() {
        if sample.features.len() != NUM_FEATURES {
            return Err(DatasetError::Shape {
                index,
                expected: NUM_FEATURES,
                actual: sample.features.len(),
            });
        }
        if sample.target > 1 {
            return Err(DatasetError::Target {
                index,
                target: sample.target,
            });
        }
        flat.extend(sample.features);
        targets.push(sample.target);
    }

    let records = Array2::from_shape_vec((n, NUM_FEATURES), flat).map_err(|_| {
        DatasetError::Shape {
            index: 0,
            expected: NUM_FEATURES,
            actual: 0,
        }
    })?;

    Ok(Dataset {
        records,
        targets,
        feature_names: raw.feature_names,
        target_names: raw.target_names,
    })
}
