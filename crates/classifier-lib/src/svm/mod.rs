//! Binary support vector classifier with an RBF kernel
//!
//! Decision function: `f(x) = Σ coefᵢ · exp(−γ‖svᵢ − x‖²) + intercept`.
//! Label 1 is predicted iff `f(x) > 0`. Probabilities come from a Platt
//! sigmoid fit on cross-validated decision values, so they are calibrated
//! on data each fold's model did not see.

pub mod platt;
pub mod solver;

pub use platt::PlattScaling;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use solver::SmoSolver;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SvmError {
    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Training set must contain both classes")]
    SingleClass,

    #[error("Got {labels} labels for {rows} rows")]
    LabelCount { rows: usize, labels: usize },

    #[error("Label {0} is not binary")]
    InvalidLabel(u8),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Model expects {expected} features, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Decision value is not finite")]
    NonFinite,
}

/// RBF kernel width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gamma {
    /// `1 / (n_features · Var(X))` over the training matrix
    Scale,
    Value(f64),
}

impl Gamma {
    fn resolve(&self, x: &Array2<f64>) -> Result<f64, SvmError> {
        match *self {
            Gamma::Value(g) if g > 0.0 && g.is_finite() => Ok(g),
            Gamma::Value(g) => Err(SvmError::InvalidParameter(format!(
                "gamma must be positive, got {}",
                g
            ))),
            Gamma::Scale => {
                let n = x.len() as f64;
                let mean = x.sum() / n;
                let var = x.mapv(|v| (v - mean) * (v - mean)).sum() / n;
                if var > 0.0 {
                    Ok(1.0 / (x.ncols() as f64 * var))
                } else {
                    Ok(1.0)
                }
            }
        }
    }
}

/// Hyperparameters for [`SvcModel::fit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvcParams {
    pub c: f64,
    pub gamma: Gamma,
    pub tol: f64,
    pub max_iter: usize,
    /// Folds used to collect decision values for Platt scaling
    pub calibration_folds: usize,
    pub seed: u64,
}

impl Default for SvcParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: Gamma::Scale,
            tol: 1e-3,
            max_iter: 1_000_000,
            calibration_folds: 5,
            seed: 42,
        }
    }
}

impl SvcParams {
    fn validate(&self) -> Result<(), SvmError> {
        if self.c <= 0.0 || !self.c.is_finite() {
            return Err(SvmError::InvalidParameter(format!(
                "C must be positive, got {}",
                self.c
            )));
        }
        if self.tol <= 0.0 || self.tol.is_nan() {
            return Err(SvmError::InvalidParameter(format!(
                "tol must be positive, got {}",
                self.tol
            )));
        }
        if self.calibration_folds < 2 {
            return Err(SvmError::InvalidParameter(format!(
                "calibration_folds must be at least 2, got {}",
                self.calibration_folds
            )));
        }
        if self.max_iter == 0 {
            return Err(SvmError::InvalidParameter("max_iter must be non-zero".into()));
        }
        Ok(())
    }
}

/// Output of a single-sample prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvcOutput {
    pub label: u8,
    pub decision: f64,
    /// Calibrated probability of label 1
    pub probability: f64,
}

/// Trained classifier: support vectors, dual coefficients and the Platt sigmoid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvcModel {
    gamma: f64,
    support_vectors: Array2<f64>,
    /// `αᵢ · yᵢ` per support vector
    dual_coef: Array1<f64>,
    intercept: f64,
    platt: PlattScaling,
}

struct DecisionFunction {
    support_vectors: Array2<f64>,
    dual_coef: Array1<f64>,
    intercept: f64,
}

impl DecisionFunction {
    fn eval(&self, gamma: f64, x: ArrayView1<'_, f64>) -> f64 {
        kernel_expansion(&self.support_vectors, &self.dual_coef, self.intercept, gamma, x)
    }
}

fn kernel_expansion(
    support_vectors: &Array2<f64>,
    dual_coef: &Array1<f64>,
    intercept: f64,
    gamma: f64,
    x: ArrayView1<'_, f64>,
) -> f64 {
    support_vectors
        .outer_iter()
        .zip(dual_coef.iter())
        .map(|(sv, &coef)| coef * rbf(sv, x, gamma))
        .sum::<f64>()
        + intercept
}

fn rbf(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>, gamma: f64) -> f64 {
    let dist: f64 = a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum();
    (-gamma * dist).exp()
}

fn gram_matrix(x: &Array2<f64>, gamma: f64) -> Array2<f64> {
    let n = x.nrows();
    let mut k = Array2::zeros((n, n));
    for i in 0..n {
        k[[i, i]] = 1.0;
        for j in (i + 1)..n {
            let v = rbf(x.row(i), x.row(j), gamma);
            k[[i, j]] = v;
            k[[j, i]] = v;
        }
    }
    k
}

fn signed_targets(labels: &[u8]) -> Vec<f64> {
    labels
        .iter()
        .map(|&l| if l == 1 { 1.0 } else { -1.0 })
        .collect()
}

fn train_decision(
    x: &Array2<f64>,
    labels: &[u8],
    gamma: f64,
    params: &SvcParams,
) -> DecisionFunction {
    let y = signed_targets(labels);
    let kernel = gram_matrix(x, gamma);
    let out = SmoSolver::new(&kernel, &y, params.c, params.tol, params.max_iter).solve();

    let support: Vec<usize> = out
        .alpha
        .iter()
        .enumerate()
        .filter(|&(_, &a)| a > 0.0)
        .map(|(i, _)| i)
        .collect();

    debug!(
        samples = x.nrows(),
        support_vectors = support.len(),
        iterations = out.iterations,
        "Fitted decision function"
    );

    DecisionFunction {
        support_vectors: x.select(Axis(0), &support),
        dual_coef: support.iter().map(|&i| out.alpha[i] * y[i]).collect(),
        intercept: -out.rho,
    }
}

/// Decision values for every sample, each produced by a model trained
/// without that sample's fold
fn cross_validated_decisions(
    x: &Array2<f64>,
    labels: &[u8],
    gamma: f64,
    params: &SvcParams,
) -> Vec<f64> {
    let n = x.nrows();
    let folds = params.calibration_folds.min(n);

    let mut perm: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(params.seed);
    perm.shuffle(&mut rng);

    let mut decisions = vec![0.0; n];
    for fold in 0..folds {
        let start = fold * n / folds;
        let end = (fold + 1) * n / folds;
        let held_out = &perm[start..end];
        let train_idx: Vec<usize> = perm[..start].iter().chain(&perm[end..]).copied().collect();
        let train_labels: Vec<u8> = train_idx.iter().map(|&i| labels[i]).collect();

        let positives = train_labels.iter().filter(|&&l| l == 1).count();
        let negatives = train_labels.len() - positives;

        if positives > 0 && negatives > 0 {
            let train_x = x.select(Axis(0), &train_idx);
            let decision = train_decision(&train_x, &train_labels, gamma, params);
            for &i in held_out {
                decisions[i] = decision.eval(gamma, x.row(i));
            }
        } else {
            let constant = match (positives, negatives) {
                (0, 0) => 0.0,
                (_, 0) => 1.0,
                _ => -1.0,
            };
            for &i in held_out {
                decisions[i] = constant;
            }
        }
    }
    decisions
}

impl SvcModel {
    /// Train on the rows of `x` with binary `labels`
    pub fn fit(x: &Array2<f64>, labels: &[u8], params: &SvcParams) -> Result<Self, SvmError> {
        params.validate()?;
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(SvmError::EmptyTrainingSet);
        }
        if labels.len() != x.nrows() {
            return Err(SvmError::LabelCount {
                rows: x.nrows(),
                labels: labels.len(),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&l| l > 1) {
            return Err(SvmError::InvalidLabel(bad));
        }
        if !labels.contains(&0) || !labels.contains(&1) {
            return Err(SvmError::SingleClass);
        }

        let gamma = params.gamma.resolve(x)?;
        debug!(gamma, c = params.c, "Training SVC");

        let cv_decisions = cross_validated_decisions(x, labels, gamma, params);
        let positive: Vec<bool> = labels.iter().map(|&l| l == 1).collect();
        let platt = PlattScaling::fit(&cv_decisions, &positive);

        let decision = train_decision(x, labels, gamma, params);

        Ok(Self {
            gamma,
            support_vectors: decision.support_vectors,
            dual_coef: decision.dual_coef,
            intercept: decision.intercept,
            platt,
        })
    }

    /// Assemble a model from explicit parameters
    pub fn from_parts(
        gamma: f64,
        support_vectors: Array2<f64>,
        dual_coef: Vec<f64>,
        intercept: f64,
        platt: PlattScaling,
    ) -> Result<Self, SvmError> {
        let model = Self {
            gamma,
            support_vectors,
            dual_coef: Array1::from(dual_coef),
            intercept,
            platt,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check internal consistency, e.g. after deserialization
    pub fn validate(&self) -> Result<(), SvmError> {
        if !(self.gamma > 0.0 && self.gamma.is_finite()) {
            return Err(SvmError::InvalidModel(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        if self.support_vectors.nrows() == 0 {
            return Err(SvmError::InvalidModel("no support vectors".into()));
        }
        if self.support_vectors.nrows() != self.dual_coef.len() {
            return Err(SvmError::InvalidModel(format!(
                "{} support vectors but {} dual coefficients",
                self.support_vectors.nrows(),
                self.dual_coef.len()
            )));
        }
        let finite = self.support_vectors.iter().all(|v| v.is_finite())
            && self.dual_coef.iter().all(|v| v.is_finite())
            && self.intercept.is_finite()
            && self.platt.a.is_finite()
            && self.platt.b.is_finite();
        if !finite {
            return Err(SvmError::InvalidModel("non-finite parameter".into()));
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.support_vectors.ncols()
    }

    pub fn n_support(&self) -> usize {
        self.support_vectors.nrows()
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn platt(&self) -> PlattScaling {
        self.platt
    }

    pub fn decision_function(&self, x: ArrayView1<'_, f64>) -> Result<f64, SvmError> {
        if x.len() != self.n_features() {
            return Err(SvmError::Dimension {
                expected: self.n_features(),
                actual: x.len(),
            });
        }
        let value = kernel_expansion(
            &self.support_vectors,
            &self.dual_coef,
            self.intercept,
            self.gamma,
            x,
        );

        if value.is_finite() {
            Ok(value)
        } else {
            Err(SvmError::NonFinite)
        }
    }

    /// Label, raw decision value and calibrated probability in one pass
    pub fn predict(&self, x: ArrayView1<'_, f64>) -> Result<SvcOutput, SvmError> {
        let decision = self.decision_function(x)?;
        Ok(SvcOutput {
            label: u8::from(decision > 0.0),
            decision,
            probability: self.platt.probability(decision),
        })
    }

    pub fn predict_label(&self, x: ArrayView1<'_, f64>) -> Result<u8, SvmError> {
        self.predict(x).map(|o| o.label)
    }

    pub fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Result<f64, SvmError> {
        self.predict(x).map(|o| o.probability)
    }
}
