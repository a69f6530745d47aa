//! Autoregressive coefficient solvers.
//!
//! Fits `φ` so that the process
//! `ζ(t,x,y) = Σ_{k,i,j ≠ 0} φ(k,i,j)·ζ(t−k, x−i, y−j) + ε(t,x,y)`
//! has covariance matching the given ACF over the first `p` lags. The
//! Yule–Walker system is assembled as a block-Toeplitz matrix over the lag
//! lattice; with the first (lag zero) equation eliminated the remaining
//! system is symmetric positive definite and solved by Cholesky.

use ndarray::{s, Array1, Array2, Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use swell_core::{linalg, Real, SwellError, SwellResult};

use crate::acf_generator::chop_right;

/// Algorithm used to determine the AR coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ArAlgorithm {
    /// Assemble the full Yule–Walker system and solve it by Cholesky.
    #[default]
    GaussElimination,
    /// Grow the lag window order by order until the white-noise variance
    /// settles; determines the effective order automatically.
    ChoiRecursive,
}

/// A fitted AR process: coefficients and the driving noise variance.
#[derive(Debug, Clone)]
pub struct ArFit {
    /// Coefficient array of shape `p`; `phi[0,0,0]` is zero by convention.
    pub phi: Array3<Real>,
    /// White-noise variance `σ²_α`.
    pub var_wn: Real,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArSolver {
    /// Lag-window size per axis.
    pub order: [usize; 3],
    pub algorithm: ArAlgorithm,
    /// Assemble the system in least-squares form over the whole ACF window.
    pub least_squares: bool,
    /// Variance-convergence threshold for the order-recursive algorithm.
    pub eps: Real,
    /// Trim trailing coefficients below `max|φ|·ε` after an order-recursive
    /// fit. `None` disables trimming.
    pub chop_epsilon: Option<Real>,
}

impl Default for ArSolver {
    fn default() -> Self {
        Self {
            order: [7, 7, 7],
            algorithm: ArAlgorithm::GaussElimination,
            least_squares: false,
            eps: 1e-5,
            chop_epsilon: None,
        }
    }
}

impl ArSolver {
    pub fn fit(&self, acf: ArrayView3<Real>) -> SwellResult<ArFit> {
        let shape = acf.shape();
        for axis in 0..3 {
            if self.order[axis] > shape[axis] {
                return Err(SwellError::Validation(format!(
                    "AR model order {:?} is larger than ACF size {:?}",
                    self.order, shape
                )));
            }
            if self.order[axis] == 0 {
                return Err(SwellError::Validation(format!(
                    "bad \"ar_model.order\": {:?}",
                    self.order
                )));
            }
        }
        let fit = match self.algorithm {
            ArAlgorithm::GaussElimination => {
                solve_yule_walker(acf, self.order, self.least_squares)?
            }
            ArAlgorithm::ChoiRecursive => self.fit_order_recursive(acf)?,
        };
        validate_stationary(&fit.phi)?;
        Ok(fit)
    }

    /// Re-solve the Yule–Walker system on growing cubic lag windows until
    /// the white-noise variance changes by less than `eps`.
    fn fit_order_recursive(&self, acf: ArrayView3<Real>) -> SwellResult<ArFit> {
        let shape = acf.shape();
        let max_order = [
            self.order[0].min(shape[0]),
            self.order[1].min(shape[1]),
            self.order[2].min(shape[2]),
        ];
        let max_p = *max_order.iter().max().unwrap();
        let mut previous: Option<ArFit> = None;
        for p in 2..=max_p {
            let order = [
                p.min(max_order[0]),
                p.min(max_order[1]),
                p.min(max_order[2]),
            ];
            let fit = solve_yule_walker(acf, order, self.least_squares)?;
            if !fit.var_wn.is_finite() {
                return Err(SwellError::IterationFailure(format!(
                    "bad white noise variance = {}",
                    fit.var_wn
                )));
            }
            debug!(order = p, var_wn = fit.var_wn, "order-recursive iteration");
            if let Some(prev) = &previous {
                if (fit.var_wn - prev.var_wn).abs() < self.eps {
                    previous = Some(fit);
                    break;
                }
            }
            previous = Some(fit);
        }
        let mut fit = previous.ok_or_else(|| {
            SwellError::IterationFailure("order-recursive solver made no progress".into())
        })?;
        if let Some(eps) = self.chop_epsilon {
            let threshold = fit.phi.iter().fold(0.0 as Real, |m, v| m.max(v.abs())) * eps;
            let new_shape = chop_right(&fit.phi, threshold);
            fit.phi = fit
                .phi
                .slice(s![0..new_shape[0], 0..new_shape[1], 0..new_shape[2]])
                .to_owned();
            fit.var_wn = white_noise_variance(&fit.phi.view(), acf);
        }
        Ok(fit)
    }
}

/// White-noise variance of a fitted AR process,
/// `σ²_α = acf(0,0,0) − Σ φ·acf` over the coefficient support.
pub fn white_noise_variance(phi: &ArrayView3<Real>, acf: ArrayView3<Real>) -> Real {
    let (p0, p1, p2) = phi.dim();
    let mut sum = 0.0;
    for k in 0..p0 {
        for i in 0..p1 {
            for j in 0..p2 {
                sum += phi[[k, i, j]] * acf[[k, i, j]];
            }
        }
    }
    acf[[0, 0, 0]] - sum
}

/// Componentwise stationarity criterion: every coefficient lies strictly
/// inside the unit hypercube.
pub fn validate_stationary(phi: &Array3<Real>) -> SwellResult<()> {
    let magnitude = phi.iter().fold(0.0 as Real, |m, v| m.max(v.abs()));
    if magnitude < 1.0 {
        Ok(())
    } else {
        Err(SwellError::NonStationary {
            coefficient: "phi",
            magnitude: magnitude as f64,
        })
    }
}

fn unflatten(mut r: usize, order: [usize; 3]) -> [usize; 3] {
    let k = r % order[2];
    r /= order[2];
    let j = r % order[1];
    r /= order[1];
    [r, j, k]
}

fn abs_diff(a: usize, b: usize) -> usize {
    a.max(b) - a.min(b)
}

/// Block-Toeplitz autocovariance matrix over the lag lattice: entry
/// `(r, c)` is `acf(|r−c|)` with the absolute difference taken per axis.
fn ac_matrix(acf: ArrayView3<Real>, order: [usize; 3]) -> Array2<Real> {
    let m: usize = order.iter().product();
    Array2::from_shape_fn((m, m), |(r, c)| {
        let ri = unflatten(r, order);
        let ci = unflatten(c, order);
        acf[[
            abs_diff(ri[0], ci[0]),
            abs_diff(ri[1], ci[1]),
            abs_diff(ri[2], ci[2]),
        ]]
    })
}

fn ls_block2(acf: ArrayView3<Real>, i0: usize, j0: usize, n2: usize) -> Array2<Real> {
    let m2 = acf.shape()[2];
    let mut block = Array2::zeros((n2, n2));
    for k in 0..n2 {
        for i in 0..m2 {
            for j in 0..n2 {
                block[[k, j]] +=
                    acf[[i0, j0, abs_diff(i, k)]] * acf[[i0, j0, abs_diff(i, j)]];
            }
        }
    }
    block
}

fn add_block(dst: &mut Array2<Real>, row0: usize, col0: usize, block: &Array2<Real>) {
    let (r, c) = block.dim();
    let mut view = dst.slice_mut(s![row0..row0 + r, col0..col0 + c]);
    view += block;
}

fn ls_block1(acf: ArrayView3<Real>, i0: usize, order: [usize; 3]) -> Array2<Real> {
    let m1 = acf.shape()[1];
    let (n1, n2) = (order[1], order[2]);
    let blocks: Vec<Vec<Array2<Real>>> = (0..m1)
        .map(|i| {
            (0..n1)
                .map(|j| ls_block2(acf, i0, abs_diff(i, j), n2))
                .collect()
        })
        .collect();
    // Reduce the over-determined block rows to normal-equation form.
    let mut result = Array2::zeros((n1 * n2, n1 * n2));
    for k in 0..n1 {
        for j in 0..n1 {
            for row in &blocks {
                let product = row[k].dot(&row[j]);
                add_block(&mut result, k * n2, j * n2, &product);
            }
        }
    }
    result
}

fn ls_matrix(acf: ArrayView3<Real>, order: [usize; 3]) -> Array2<Real> {
    let m0 = acf.shape()[0];
    let (n0, n1, n2) = (order[0], order[1], order[2]);
    let inner = n1 * n2;
    let blocks: Vec<Vec<Array2<Real>>> = (0..m0)
        .map(|i| {
            (0..n0)
                .map(|j| ls_block1(acf, abs_diff(i, j), order))
                .collect()
        })
        .collect();
    let mut result = Array2::zeros((n0 * inner, n0 * inner));
    for k in 0..n0 {
        for j in 0..n0 {
            for row in &blocks {
                let product = row[k].dot(&row[j]);
                add_block(&mut result, k * inner, j * inner, &product);
            }
        }
    }
    result
}

/// Assemble and solve the Yule–Walker system for the given order.
///
/// The ACF is normalized by its variance before assembly to keep the matrix
/// well scaled; the solution is invariant under that scaling.
fn solve_yule_walker(
    acf: ArrayView3<Real>,
    order: [usize; 3],
    least_squares: bool,
) -> SwellResult<ArFit> {
    let variance = acf[[0, 0, 0]];
    if !(variance > 0.0) {
        return Err(SwellError::Validation(format!(
            "bad ACF variance: {variance}"
        )));
    }
    let normalized = acf.mapv(|v| v / variance);
    let acm = if least_squares {
        ls_matrix(normalized.view(), order)
    } else {
        ac_matrix(normalized.view(), order)
    };
    // Eliminate the lag-zero equation and move its column to the right-hand
    // side of the system.
    let rhs: Array1<Real> = acm.slice(s![1.., 0]).to_owned();
    let lhs: Array2<Real> = acm.slice(s![1.., 1..]).to_owned();
    debug_assert!(linalg::is_symmetric(lhs.view()));
    let solution = linalg::cholesky_solve(lhs.view(), rhs.view())?;
    let mut phi = Array3::zeros((order[0], order[1], order[2]));
    {
        let flat = phi.as_slice_mut().expect("phi is contiguous");
        flat[0] = 0.0;
        flat[1..].copy_from_slice(solution.as_slice().expect("solution is contiguous"));
    }
    let var_wn = white_noise_variance(&phi.view(), acf);
    Ok(ArFit { phi, var_wn })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::Array3;

    /// Separable exponential ACF of an AR(1)³-like process.
    fn exponential_acf(shape: [usize; 3], decay: [Real; 3]) -> Array3<Real> {
        Array3::from_shape_fn((shape[0], shape[1], shape[2]), |(i, j, k)| {
            decay[0].powi(i as i32) * decay[1].powi(j as i32) * decay[2].powi(k as i32)
        })
    }

    #[test]
    fn fit_matches_variance_identity() {
        let acf = exponential_acf([4, 4, 4], [0.9, 0.88, 0.95]);
        let solver = ArSolver {
            order: [3, 3, 3],
            ..ArSolver::default()
        };
        let fit = solver.fit(acf.view()).unwrap();
        assert_eq!(fit.phi[[0, 0, 0]], 0.0);
        let expected = white_noise_variance(&fit.phi.view(), acf.view());
        assert_abs_diff_eq!(fit.var_wn, expected, epsilon = 1e-6);
        assert!(fit.var_wn > 0.0);
    }

    #[test]
    fn one_dimensional_fit_recovers_ar1() {
        // acf(k) = r^k is exactly realized by ζ_t = r·ζ_{t−1} + ε.
        let r: Real = 0.5;
        let acf = exponential_acf([6, 1, 1], [r, 1.0, 1.0]);
        let solver = ArSolver {
            order: [2, 1, 1],
            ..ArSolver::default()
        };
        let fit = solver.fit(acf.view()).unwrap();
        assert_relative_eq!(fit.phi[[1, 0, 0]], r, epsilon = 1e-10);
        assert_relative_eq!(fit.var_wn, 1.0 - r * r, epsilon = 1e-10);
    }

    #[test]
    fn least_squares_variant_stays_close_to_plain_fit() {
        let acf = exponential_acf([5, 4, 4], [0.8, 0.7, 0.7]);
        let plain = ArSolver {
            order: [3, 2, 2],
            ..ArSolver::default()
        };
        let ls = ArSolver {
            order: [3, 2, 2],
            least_squares: true,
            ..ArSolver::default()
        };
        let fit_plain = plain.fit(acf.view()).unwrap();
        let fit_ls = ls.fit(acf.view()).unwrap();
        for (a, b) in fit_plain.phi.iter().zip(fit_ls.phi.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 0.2);
        }
    }

    #[test]
    fn order_recursive_settles() {
        let acf = exponential_acf([6, 6, 6], [0.9, 0.88, 0.95]);
        let solver = ArSolver {
            order: [5, 5, 5],
            algorithm: ArAlgorithm::ChoiRecursive,
            eps: 1e-4,
            ..ArSolver::default()
        };
        let fit = solver.fit(acf.view()).unwrap();
        assert!(fit.var_wn > 0.0 && fit.var_wn.is_finite());
        assert!(validate_stationary(&fit.phi).is_ok());
    }

    #[test]
    fn order_larger_than_acf_is_rejected() {
        let acf = exponential_acf([3, 3, 3], [0.9, 0.9, 0.9]);
        let solver = ArSolver {
            order: [4, 3, 3],
            ..ArSolver::default()
        };
        assert!(solver.fit(acf.view()).is_err());
    }

    #[test]
    fn non_realizable_acf_reports_not_positive_definite() {
        // Correlation above one at nonzero lag cannot come from a
        // stationary field.
        let mut acf = exponential_acf([3, 3, 3], [0.9, 0.9, 0.9]);
        acf[[1, 0, 0]] = 5.0;
        acf[[2, 0, 0]] = -4.9;
        let solver = ArSolver {
            order: [3, 3, 3],
            ..ArSolver::default()
        };
        match solver.fit(acf.view()) {
            Err(SwellError::NotPositiveDefinite(_)) | Err(SwellError::NonStationary { .. }) => {}
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
