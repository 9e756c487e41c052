//! Sequential minimal optimization for the C-SVC dual problem
//!
//! Solves `min ½ αᵀQα − eᵀα` subject to `0 ≤ αᵢ ≤ C`, `yᵀα = 0`, with
//! `Qᵢⱼ = yᵢ yⱼ K(xᵢ, xⱼ)`. Working pairs are chosen with second-order
//! information (Fan, Chen & Lin, 2005). The kernel matrix is precomputed,
//! which is fine for the few hundred samples this crate trains on.

use ndarray::Array2;
use tracing::{debug, warn};

/// Floor for non-positive curvature along the working pair
const TAU: f64 = 1e-12;

/// Result of a solver run
#[derive(Debug, Clone)]
pub struct SolverOutput {
    /// Lagrange multipliers, one per training sample
    pub alpha: Vec<f64>,
    /// Offset such that `f(x) = Σ αᵢ yᵢ K(xᵢ, x) − rho`
    pub rho: f64,
    pub iterations: usize,
    pub converged: bool,
}

pub struct SmoSolver<'a> {
    kernel: &'a Array2<f64>,
    y: &'a [f64],
    c: f64,
    tol: f64,
    max_iter: usize,
    alpha: Vec<f64>,
    grad: Vec<f64>,
}

impl<'a> SmoSolver<'a> {
    /// `kernel` is the n×n Gram matrix, `y` holds ±1 targets
    pub fn new(kernel: &'a Array2<f64>, y: &'a [f64], c: f64, tol: f64, max_iter: usize) -> Self {
        let n = y.len();
        Self {
            kernel,
            y,
            c,
            tol,
            max_iter,
            alpha: vec![0.0; n],
            grad: vec![-1.0; n],
        }
    }

    fn q(&self, i: usize, j: usize) -> f64 {
        self.y[i] * self.y[j] * self.kernel[[i, j]]
    }

    fn is_upper_bound(&self, i: usize) -> bool {
        self.alpha[i] >= self.c
    }

    fn is_lower_bound(&self, i: usize) -> bool {
        self.alpha[i] <= 0.0
    }

    /// Index can move "up" along yᵢ
    fn in_up_set(&self, t: usize) -> bool {
        if self.y[t] > 0.0 {
            !self.is_upper_bound(t)
        } else {
            !self.is_lower_bound(t)
        }
    }

    /// Index can move "down" along yᵢ
    fn in_low_set(&self, t: usize) -> bool {
        if self.y[t] > 0.0 {
            !self.is_lower_bound(t)
        } else {
            !self.is_upper_bound(t)
        }
    }

    /// Second-order working set selection. `None` once the KKT gap is below tolerance.
    fn select_working_set(&self) -> Option<(usize, usize)> {
        let n = self.y.len();

        let mut g_max = f64::NEG_INFINITY;
        let mut i_sel = None;
        for t in 0..n {
            if self.in_up_set(t) {
                let v = -self.y[t] * self.grad[t];
                if v >= g_max {
                    g_max = v;
                    i_sel = Some(t);
                }
            }
        }
        let i = i_sel?;

        let mut g_max2 = f64::NEG_INFINITY;
        let mut obj_min = f64::INFINITY;
        let mut j_sel = None;
        for t in 0..n {
            if !self.in_low_set(t) {
                continue;
            }
            let y_grad = self.y[t] * self.grad[t];
            g_max2 = g_max2.max(y_grad);

            let grad_diff = g_max + y_grad;
            if grad_diff > 0.0 {
                let mut quad = self.kernel[[i, i]] + self.kernel[[t, t]]
                    - 2.0 * self.kernel[[i, t]];
                if quad <= 0.0 {
                    quad = TAU;
                }
                let obj = -(grad_diff * grad_diff) / quad;
                if obj <= obj_min {
                    obj_min = obj;
                    j_sel = Some(t);
                }
            }
        }

        if g_max + g_max2 < self.tol {
            return None;
        }
        j_sel.map(|j| (i, j))
    }

    /// Analytic update of the pair (i, j), clipped to the box
    fn update_pair(&mut self, i: usize, j: usize) {
        let c = self.c;
        let old_ai = self.alpha[i];
        let old_aj = self.alpha[j];

        let mut quad = self.kernel[[i, i]] + self.kernel[[j, j]] - 2.0 * self.kernel[[i, j]];
        if quad <= 0.0 {
            quad = TAU;
        }

        let (mut ai, mut aj);
        if self.y[i] != self.y[j] {
            let delta = (-self.grad[i] - self.grad[j]) / quad;
            let diff = old_ai - old_aj;
            ai = old_ai + delta;
            aj = old_aj + delta;

            if diff > 0.0 {
                if aj < 0.0 {
                    aj = 0.0;
                    ai = diff;
                }
            } else if ai < 0.0 {
                ai = 0.0;
                aj = -diff;
            }
            if diff > 0.0 {
                if ai > c {
                    ai = c;
                    aj = c - diff;
                }
            } else if aj > c {
                aj = c;
                ai = c + diff;
            }
        } else {
            let delta = (self.grad[i] - self.grad[j]) / quad;
            let sum = old_ai + old_aj;
            ai = old_ai - delta;
            aj = old_aj + delta;

            if sum > c {
                if ai > c {
                    ai = c;
                    aj = sum - c;
                }
            } else if aj < 0.0 {
                aj = 0.0;
                ai = sum;
            }
            if sum > c {
                if aj > c {
                    aj = c;
                    ai = sum - c;
                }
            } else if ai < 0.0 {
                ai = 0.0;
                aj = sum;
            }
        }

        self.alpha[i] = ai;
        self.alpha[j] = aj;

        let d_ai = ai - old_ai;
        let d_aj = aj - old_aj;
        for k in 0..self.y.len() {
            self.grad[k] += self.q(i, k) * d_ai + self.q(j, k) * d_aj;
        }
    }

    fn compute_rho(&self) -> f64 {
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;
        let mut free_sum = 0.0;
        let mut free_count = 0usize;

        for t in 0..self.y.len() {
            let y_grad = self.y[t] * self.grad[t];
            if self.is_upper_bound(t) {
                if self.y[t] < 0.0 {
                    upper = upper.min(y_grad);
                } else {
                    lower = lower.max(y_grad);
                }
            } else if self.is_lower_bound(t) {
                if self.y[t] > 0.0 {
                    upper = upper.min(y_grad);
                } else {
                    lower = lower.max(y_grad);
                }
            } else {
                free_count += 1;
                free_sum += y_grad;
            }
        }

        if free_count > 0 {
            free_sum / free_count as f64
        } else {
            (upper + lower) / 2.0
        }
    }

    pub fn solve(mut self) -> SolverOutput {
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iter {
            match self.select_working_set() {
                Some((i, j)) => self.update_pair(i, j),
                None => {
                    converged = true;
                    break;
                }
            }
            iterations += 1;
        }

        if converged {
            debug!(iterations, "SMO converged");
        } else {
            warn!(iterations, "SMO reached the iteration limit before converging");
        }

        let rho = self.compute_rho();
        SolverOutput {
            alpha: self.alpha,
            rho,
            iterations,
            converged,
        }
    }
}
