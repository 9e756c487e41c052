//! Per-feature z-score standardization

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScalingError {
    #[error("Cannot fit scaler on an empty matrix")]
    Empty,

    #[error("Scaler expects {expected} features, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Scaled value for feature {index} is not finite")]
    NonFinite { index: usize },

    #[error("Invalid scaler parameter for feature {index}: {reason}")]
    InvalidParameter { index: usize, reason: &'static str },
}

/// Mean and population standard deviation per feature, fit once on training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit on the rows of `records`. Constant features get a scale of 1.0.
    pub fn fit(records: &Array2<f64>) -> Result<Self, ScalingError> {
        if records.nrows() == 0 || records.ncols() == 0 {
            return Err(ScalingError::Empty);
        }

        let mean = records.mean_axis(Axis(0)).ok_or(ScalingError::Empty)?;
        let scale = records
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });

        Ok(Self { mean, scale })
    }

    /// Rebuild from persisted parameters
    pub fn from_parts(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScalingError> {
        let scaler = Self {
            mean: Array1::from(mean),
            scale: Array1::from(scale),
        };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Check persisted parameters before the scaler is used
    pub fn validate(&self) -> Result<(), ScalingError> {
        if self.mean.is_empty() {
            return Err(ScalingError::Empty);
        }
        if self.mean.len() != self.scale.len() {
            return Err(ScalingError::Dimension {
                expected: self.mean.len(),
                actual: self.scale.len(),
            });
        }
        if let Some(index) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(ScalingError::InvalidParameter {
                index,
                reason: "mean is not finite",
            });
        }
        if let Some(index) = self.scale.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(ScalingError::InvalidParameter {
                index,
                reason: "scale must be finite and positive",
            });
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    pub fn scale(&self) -> ArrayView1<'_, f64> {
        self.scale.view()
    }

    /// Scale a single sample
    pub fn transform_row(&self, row: &[f64]) -> Result<Array1<f64>, ScalingError> {
        if row.len() != self.n_features() {
            return Err(ScalingError::Dimension {
                expected: self.n_features(),
                actual: row.len(),
            });
        }

        let scaled = (&ArrayView1::from(row) - &self.mean) / &self.scale;
        if let Some(index) = scaled.iter().position(|v| !v.is_finite()) {
            return Err(ScalingError::NonFinite { index });
        }
        Ok(scaled)
    }

    /// Scale every row of a matrix
    pub fn transform(&self, records: &Array2<f64>) -> Result<Array2<f64>, ScalingError> {
        if records.ncols() != self.n_features() {
            return Err(ScalingError::Dimension {
                expected: self.n_features(),
                actual: records.ncols(),
            });
        }
        Ok((records - &self.mean) / &self.scale)
    }
}
