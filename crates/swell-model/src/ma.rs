//! Moving-average coefficient solvers.
//!
//! Fits `θ` so that the process
//! `ζ(t,x,y) = ε(t,x,y) − Σ_{k,i,j ≠ 0} θ(k,i,j)·ε(t−k, x−i, y−j)`
//! matches the given ACF. `θ(0,0,0)` is stored as zero; the sign convention
//! substitutes `−1` for it inside the MA equation.

use ndarray::{Array1, Array2, Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use swell_core::{linalg, Real, SwellError, SwellResult};

use crate::ar::validate_stationary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MaAlgorithm {
    #[default]
    FixedPointIteration,
    NewtonRaphson,
}

/// A fitted MA process: coefficients and the driving noise variance.
#[derive(Debug, Clone)]
pub struct MaFit {
    /// Coefficient array of shape `q`; `theta[0,0,0]` is zero by convention.
    pub theta: Array3<Real>,
    /// White-noise variance `σ²_α`.
    pub var_wn: Real,
    /// Iterations used by the solver.
    pub iterations: usize,
    /// Final maximum lag-equation residual.
    pub residual: Real,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaSolver {
    /// Lag-window size per axis.
    pub order: [usize; 3],
    pub algorithm: MaAlgorithm,
    pub max_iterations: usize,
    /// Convergence threshold on the white-noise variance change.
    pub eps: Real,
    /// Variance floor; falling below it aborts the fit.
    pub min_var_wn: Real,
    /// Residual threshold; reaching it terminates the iteration.
    pub max_residual: Real,
}

impl Default for MaSolver {
    fn default() -> Self {
        Self {
            order: [0, 0, 0],
            algorithm: MaAlgorithm::FixedPointIteration,
            max_iterations: 1000,
            eps: 1e-5,
            min_var_wn: 1e-6,
            max_residual: 1e-5,
        }
    }
}

impl MaSolver {
    pub fn fit(&self, acf: ArrayView3<Real>) -> SwellResult<MaFit> {
        let shape = acf.shape();
        for axis in 0..3 {
            if self.order[axis] > shape[axis] {
                return Err(SwellError::Validation(format!(
                    "MA model order {:?} is larger than ACF size {:?}",
                    self.order, shape
                )));
            }
            if self.order[axis] == 0 {
                return Err(SwellError::Validation(format!(
                    "bad \"ma_model.order\": {:?}",
                    self.order
                )));
            }
        }
        let fit = match self.algorithm {
            MaAlgorithm::FixedPointIteration => self.fixed_point_iteration(acf)?,
            MaAlgorithm::NewtonRaphson => self.newton_raphson(acf)?,
        };
        validate_invertible(&fit.theta)?;
        Ok(fit)
    }

    /// Back-to-front coefficient updates from Box and Jenkins (1970),
    /// pp. 226–227:
    ///
    /// `θ(i,j,k) ← −acf(i,j,k)/σ²_α + Σ_{l≥i,m≥j,n≥k} θ(l,m,n)·θ(l−i,m−j,n−k)`
    ///
    /// with `θ(0,0,0) := 0` inside the sum, and the variance recomputed as
    /// `σ²_α = acf(0,0,0)/(1 + Σθ²)` each round.
    fn fixed_point_iteration(&self, acf: ArrayView3<Real>) -> SwellResult<MaFit> {
        let order = self.order;
        let (ni, nj, nk) = (order[0], order[1], order[2]);
        let mut theta = Array3::<Real>::zeros((ni, nj, nk));
        let mut var_wn = acf[[0, 0, 0]];
        let mut old_var_wn;
        let mut residual;
        let mut it = 0;
        loop {
            theta[[0, 0, 0]] = 0.0;
            for i in (0..ni).rev() {
                for j in (0..nj).rev() {
                    for k in (0..nk).rev() {
                        let update =
                            -acf[[i, j, k]] / var_wn + lag_product(&theta, [i, j, k]);
                        theta[[i, j, k]] = update;
                    }
                }
            }
            theta[[0, 0, 0]] = 0.0;
            if !theta.iter().all(|v| v.is_finite()) {
                return Err(SwellError::IterationFailure(format!(
                    "bad MA model coefficients at iteration {it}"
                )));
            }
            residual = max_residual(acf, &theta, var_wn);
            old_var_wn = var_wn;
            var_wn = white_noise_variance(&theta.view(), acf);
            if var_wn <= self.min_var_wn || !var_wn.is_finite() {
                return Err(SwellError::IterationFailure(format!(
                    "bad white noise variance = {var_wn}"
                )));
            }
            debug!(iteration = it, var_wn, residual, "fixed-point iteration");
            it += 1;
            if it >= self.max_iterations
                || (var_wn - old_var_wn).abs() <= self.eps
                || residual <= self.max_residual
            {
                break;
            }
        }
        if (var_wn - old_var_wn).abs() > self.eps && residual > self.max_residual {
            warn!(
                iterations = it,
                residual, "fixed-point iteration stopped at the iteration cap"
            );
        }
        Ok(MaFit {
            theta,
            var_wn,
            iterations: it,
            residual,
        })
    }

    /// Newton–Raphson on the τ parameterization (`τ₀² = σ²_α`,
    /// `θ = −τ/τ₀`), Box and Jenkins (1970), p. 227. The Jacobian is the
    /// structured τ-matrix; each step solves it against the lag residuals.
    fn newton_raphson(&self, acf: ArrayView3<Real>) -> SwellResult<MaFit> {
        let order = self.order;
        let (ni, nj, nk) = (order[0], order[1], order[2]);
        let mut theta = Array3::<Real>::zeros((ni, nj, nk));
        let mut tau = Array3::<Real>::zeros((ni, nj, nk));
        let mut f = Array3::<Real>::zeros((ni, nj, nk));
        let mut var_wn = acf[[0, 0, 0]];
        tau[[0, 0, 0]] = var_wn.sqrt();
        let mut old_var_wn;
        let mut residual;
        let mut it = 0;
        loop {
            for i in 0..ni {
                for j in 0..nj {
                    for k in 0..nk {
                        f[[i, j, k]] = tau_product(&tau, [i, j, k]) - acf[[i, j, k]];
                    }
                }
            }
            let jacobian = tau_matrix(&tau);
            let f_flat =
                Array1::from_iter(f.iter().copied());
            let step = linalg::lu_solve(jacobian.view(), f_flat.view()).map_err(|err| {
                SwellError::IterationFailure(format!(
                    "Newton step failed at iteration {it}: {err}"
                ))
            })?;
            for (t, s) in tau.iter_mut().zip(step.iter()) {
                *t -= s;
            }
            let tau0 = tau[[0, 0, 0]];
            for (th, t) in theta.iter_mut().zip(tau.iter()) {
                *th = -t / tau0;
            }
            theta[[0, 0, 0]] = 0.0;
            if !theta.iter().all(|v| v.is_finite()) {
                return Err(SwellError::IterationFailure(format!(
                    "bad MA model coefficients at iteration {it}"
                )));
            }
            residual = max_residual(acf, &theta, var_wn);
            old_var_wn = var_wn;
            var_wn = white_noise_variance(&theta.view(), acf);
            tau[[0, 0, 0]] = var_wn.sqrt();
            if var_wn <= self.min_var_wn || !var_wn.is_finite() {
                return Err(SwellError::IterationFailure(format!(
                    "bad white noise variance = {var_wn}"
                )));
            }
            debug!(iteration = it, var_wn, residual, "Newton-Raphson iteration");
            it += 1;
            if it >= self.max_iterations
                || (var_wn - old_var_wn).abs() <= self.eps
                || residual <= self.max_residual
            {
                break;
            }
        }
        if (var_wn - old_var_wn).abs() > self.eps && residual > self.max_residual {
            warn!(
                iterations = it,
                residual, "Newton-Raphson stopped at the iteration cap"
            );
        }
        Ok(MaFit {
            theta,
            var_wn,
            iterations: it,
            residual,
        })
    }
}

/// `Σ_{l≥i,m≥j,n≥k} θ(l,m,n)·θ(l−i,m−j,n−k)` over the lag support.
fn lag_product(theta: &Array3<Real>, at: [usize; 3]) -> Real {
    let (ni, nj, nk) = theta.dim();
    let mut sum = 0.0;
    for l in at[0]..ni {
        for m in at[1]..nj {
            for n in at[2]..nk {
                sum += theta[[l, m, n]] * theta[[l - at[0], m - at[1], n - at[2]]];
            }
        }
    }
    sum
}

/// Same product with `τ` (which keeps its zero-lag entry).
fn tau_product(tau: &Array3<Real>, at: [usize; 3]) -> Real {
    lag_product(tau, at)
}

/// Maximum lag-equation mismatch under the `θ₀ ≡ −1` convention:
/// `max_h |acf(h) − σ²_α·Σ θ̃·θ̃_shifted|` where `θ̃` is `θ` with `−1`
/// substituted at the origin.
fn max_residual(acf: ArrayView3<Real>, theta: &Array3<Real>, var_wn: Real) -> Real {
    let mut full = theta.clone();
    full[[0, 0, 0]] = -1.0;
    let (ni, nj, nk) = full.dim();
    let mut worst = 0.0 as Real;
    for i in 0..ni {
        for j in 0..nj {
            for k in 0..nk {
                let value = (acf[[i, j, k]] - lag_product(&full, [i, j, k]) * var_wn).abs();
                worst = worst.max(value);
            }
        }
    }
    worst
}

/// White-noise variance of a fitted MA process,
/// `σ²_α = acf(0,0,0) / (1 + Σθ²)` with the implicit `θ₀ ≡ −1` accounting
/// for the leading one.
pub fn white_noise_variance(theta: &ArrayView3<Real>, acf: ArrayView3<Real>) -> Real {
    let sum_sq: Real = theta.iter().map(|v| v * v).sum();
    acf[[0, 0, 0]] / (1.0 + sum_sq)
}

/// Invertibility criterion; identical in form to the AR stationarity check.
pub fn validate_invertible(theta: &Array3<Real>) -> SwellResult<()> {
    validate_stationary(theta).map_err(|err| match err {
        SwellError::NonStationary { magnitude, .. } => SwellError::NonStationary {
            coefficient: "theta",
            magnitude,
        },
        other => other,
    })
}

fn unflatten(mut r: usize, order: [usize; 3]) -> [usize; 3] {
    let k = r % order[2];
    r /= order[2];
    let j = r % order[1];
    r /= order[1];
    [r, j, k]
}

/// Jacobian of the lag-residual system, a Toeplitz-like matrix assembled
/// from the current iterate. Row `h` differentiates
/// `f(h) = Σ_l τ(l)·τ(l+h) − acf(h)` with respect to `τ(j)`:
/// `τ(j−h)` where the shift stays inside the support plus `τ(j+h)` where
/// the sum does.
fn tau_matrix(tau: &Array3<Real>) -> Array2<Real> {
    let (n0, n1, n2) = tau.dim();
    let order = [n0, n1, n2];
    let n = n0 * n1 * n2;
    Array2::from_shape_fn((n, n), |(r, c)| {
        let h = unflatten(r, order);
        let j = unflatten(c, order);
        let mut value = 0.0;
        if (0..3).all(|a| j[a] >= h[a]) {
            value += tau[[j[0] - h[0], j[1] - h[1], j[2] - h[2]]];
        }
        if (0..3).all(|a| j[a] + h[a] < order[a]) {
            value += tau[[j[0] + h[0], j[1] + h[1], j[2] + h[2]]];
        }
        value
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;

    /// A short 1-D ACF along `t` with a closed set of lag equations.
    fn reference_acf() -> Array3<Real> {
        let mut acf = Array3::zeros((4, 1, 1));
        acf[[0, 0, 0]] = 4.0;
        acf[[1, 0, 0]] = -0.5;
        acf[[2, 0, 0]] = 0.25;
        acf
    }

    #[test]
    fn fixed_point_converges_on_reference_acf() {
        let solver = MaSolver {
            order: [4, 1, 1],
            max_iterations: 1000,
            ..MaSolver::default()
        };
        let acf = reference_acf();
        let fit = solver.fit(acf.view()).unwrap();
        assert!(fit.residual < 1e-5, "residual {}", fit.residual);
        assert_eq!(fit.theta[[0, 0, 0]], 0.0);
        // variance identity: acf(0,0,0) = σ²·(1 + Σθ²)
        let sum_sq: Real = fit.theta.iter().map(|v| v * v).sum();
        assert_abs_diff_eq!(
            acf[[0, 0, 0]],
            fit.var_wn * (1.0 + sum_sq),
            epsilon = 1e-10
        );
    }

    #[test]
    fn fixed_point_reproduces_lag_equations() {
        let solver = MaSolver {
            order: [4, 1, 1],
            max_iterations: 2000,
            max_residual: 1e-9,
            eps: 1e-12,
            ..MaSolver::default()
        };
        let acf = reference_acf();
        let fit = solver.fit(acf.view()).unwrap();
        let mut full = fit.theta.clone();
        full[[0, 0, 0]] = -1.0;
        for lag in 0..4 {
            let model = lag_product(&full, [lag, 0, 0]) * fit.var_wn;
            assert_abs_diff_eq!(model, acf[[lag, 0, 0]], epsilon = 1e-6);
        }
    }

    #[test]
    fn newton_raphson_agrees_with_fixed_point() {
        let fp = MaSolver {
            order: [3, 1, 1],
            max_iterations: 2000,
            max_residual: 1e-10,
            eps: 1e-13,
            ..MaSolver::default()
        };
        let nr = MaSolver {
            algorithm: MaAlgorithm::NewtonRaphson,
            ..fp.clone()
        };
        let acf = reference_acf();
        let fit_fp = fp.fit(acf.view()).unwrap();
        let fit_nr = nr.fit(acf.view()).unwrap();
        assert_abs_diff_eq!(fit_fp.var_wn, fit_nr.var_wn, epsilon = 1e-4);
        for (a, b) in fit_fp.theta.iter().zip(fit_nr.theta.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-3);
        }
    }

    #[test]
    fn variance_collapse_is_reported() {
        // An ACF whose tail is as large as the variance starves the noise.
        let mut acf = Array3::zeros((2, 1, 1));
        acf[[0, 0, 0]] = 1.0;
        acf[[1, 0, 0]] = 0.9999;
        let solver = MaSolver {
            order: [2, 1, 1],
            max_iterations: 200,
            ..MaSolver::default()
        };
        match solver.fit(acf.view()) {
            Err(SwellError::IterationFailure(_)) | Err(SwellError::NonStationary { .. }) => {}
            other => panic!("expected iteration failure, got {other:?}"),
        }
    }

    #[test]
    fn zero_order_is_rejected() {
        let solver = MaSolver {
            order: [0, 1, 1],
            ..MaSolver::default()
        };
        assert!(solver.fit(reference_acf().view()).is_err());
    }
}
