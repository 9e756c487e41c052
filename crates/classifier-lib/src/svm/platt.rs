//! Platt scaling: maps SVM decision values to probabilities
//!
//! Fits `P(y = 1 | f) = 1 / (1 + exp(A·f + B))` by regularized maximum
//! likelihood with Newton's method and a backtracking line search
//! (Lin, Lin & Weng, 2007).

use serde::{Deserialize, Serialize};
use tracing::warn;

const MAX_ITER: usize = 100;
const MIN_STEP: f64 = 1e-10;
const SIGMA: f64 = 1e-12;
const EPS: f64 = 1e-5;

/// Sigmoid parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

impl PlattScaling {
    /// Fit on decision values with their true labels (`true` = positive class)
    pub fn fit(decision_values: &[f64], positive: &[bool]) -> Self {
        let prior1 = positive.iter().filter(|&&p| p).count() as f64;
        let prior0 = positive.len() as f64 - prior1;

        let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
        let lo_target = 1.0 / (prior0 + 2.0);
        let targets: Vec<f64> = positive
            .iter()
            .map(|&p| if p { hi_target } else { lo_target })
            .collect();

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
        let mut fval = objective(decision_values, &targets, a, b);

        for _ in 0..MAX_ITER {
            let mut h11 = SIGMA;
            let mut h22 = SIGMA;
            let mut h21 = 0.0;
            let mut g1 = 0.0;
            let mut g2 = 0.0;

            for (&f, &t) in decision_values.iter().zip(&targets) {
                let (p, q) = split_sigmoid(f * a + b);
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = t - p;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < EPS && g2.abs() < EPS {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            while step >= MIN_STEP {
                let new_a = a + step * da;
                let new_b = b + step * db;
                let new_f = objective(decision_values, &targets, new_a, new_b);
                if new_f < fval + 1e-4 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    break;
                }
                step /= 2.0;
            }

            if step < MIN_STEP {
                warn!("Platt scaling line search failed");
                break;
            }
        }

        Self { a, b }
    }

    /// Probability of the positive class
    pub fn probability(&self, decision_value: f64) -> f64 {
        split_sigmoid(decision_value * self.a + self.b).0
    }
}

/// Returns `(1 / (1 + e^x), e^x / (1 + e^x))` without overflow
fn split_sigmoid(x: f64) -> (f64, f64) {
    if x >= 0.0 {
        let e = (-x).exp();
        (e / (1.0 + e), 1.0 / (1.0 + e))
    } else {
        let e = x.exp();
        (1.0 / (1.0 + e), e / (1.0 + e))
    }
}

/// Negative log-likelihood
fn objective(decision_values: &[f64], targets: &[f64], a: f64, b: f64) -> f64 {
    decision_values
        .iter()
        .zip(targets)
        .map(|(&f, &t)| {
            let x = f * a + b;
            if x >= 0.0 {
                t * x + (1.0 + (-x).exp()).ln()
            } else {
                (t - 1.0) * x + (1.0 + x.exp()).ln()
            }
        })
        .sum()
}
