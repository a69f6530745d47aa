//! The non-linear inertialess transform.
//!
//! Warps the marginal distribution of a Gaussian surface to a prescribed
//! skewed target while preserving the second-order structure: the ACF is
//! corrected *before* generation so that the post-transform covariance
//! matches the requested one, and the generated realisation is mapped
//! pointwise afterwards.

use ndarray::Array3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use swell_core::bisection::Bisection;
use swell_core::linalg::polyfit;
use swell_core::math::Polynomial;
use swell_core::{Real, SwellError, SwellResult};

use super::dist::{Gaussian, TargetDistribution};
use super::series::{gram_charlier_expand, series_sum};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NitTransform {
    pub distribution: TargetDistribution,
    /// Number of CDF interpolation nodes.
    pub interpolation_nodes: usize,
    /// Candidate polynomial orders for the transform fit.
    pub max_interpolation_order: usize,
    /// Length of the Gram–Charlier expansion.
    pub max_expansion_order: usize,
    /// Root-finding interval for the CDF inversion; `None` scales
    /// `(−10σ, 10σ)` from the process variance to leave room for targets
    /// with a larger scale parameter.
    pub cdf_interval: Option<(Real, Real)>,
    /// Root-finding interval for the ACF correction; `None` brackets the
    /// ACF range automatically.
    pub acf_interval: Option<(Real, Real)>,
    /// Bisection tolerance.
    pub eps: Real,
    /// Bisection iteration cap.
    pub max_iterations: usize,
}

impl NitTransform {
    pub fn new(distribution: TargetDistribution) -> Self {
        Self {
            distribution,
            interpolation_nodes: 100,
            max_interpolation_order: 12,
            max_expansion_order: 10,
            cdf_interval: None,
            acf_interval: None,
            eps: 1e-6,
            max_iterations: 100,
        }
    }

    fn cdf_solver(&self, stdev: Real) -> Bisection {
        let (a, b) = self
            .cdf_interval
            .unwrap_or((-10.0 * stdev, 10.0 * stdev));
        Bisection::new(a, b, self.eps, self.max_iterations)
    }

    fn acf_solver(&self, variance: Real) -> Bisection {
        let (a, b) = self
            .acf_interval
            .unwrap_or((-(1.0 + 2.0 * variance), 1.0 + 2.0 * variance));
        Bisection::new(a, b, self.eps, self.max_iterations)
    }

    /// Build the Gaussian-to-target CDF mapping nodes `(x, y)` by solving
    /// `F_target(y) = Φ_{0,σ}(x)` at each grid node.
    fn transform_cdf(&self, stdev: Real) -> (Vec<Real>, Vec<Real>) {
        let solver = self.cdf_solver(stdev);
        let (lo, hi) = solver.interval();
        let n = self.interpolation_nodes;
        let gaussian = Gaussian::new(0.0, stdev);
        let step = (hi - lo) / (n - 1) as Real;
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        for i in 0..n {
            let x = lo + step * i as Real;
            let target = gaussian.cdf(x);
            let y = solver.solve(|v| self.distribution.cdf(v) - target);
            xs.push(x);
            ys.push(y);
        }
        (xs, ys)
    }

    /// Fit the CDF mapping with a polynomial, choosing the order whose
    /// Gram–Charlier expansion best reproduces the process variance.
    fn fit_transform(&self, variance: Real) -> SwellResult<(Polynomial, Vec<Real>, Real)> {
        let stdev = variance.sqrt();
        let (xs, ys) = self.transform_cdf(stdev);
        let mut best: Option<(Polynomial, Vec<Real>, Real)> = None;
        for order in 1..self.max_interpolation_order {
            let coefs = match polyfit(&xs, &ys, order) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let poly = Polynomial::new(coefs.to_vec());
            let (gcs, err) = gram_charlier_expand(&poly, self.max_expansion_order, variance);
            if best.as_ref().map_or(true, |(_, _, e)| err < *e) {
                best = Some((poly, gcs, err));
            }
        }
        let (poly, gcs, err) = best.ok_or_else(|| {
            SwellError::IterationFailure("no usable CDF interpolation order".into())
        })?;
        debug!(
            order = poly.order(),
            expansion_len = gcs.len(),
            error = err,
            "selected transform polynomial"
        );
        Ok((poly, gcs, err))
    }

    /// Replace each ACF value `γ(h)` with `γ̂(h)` such that the transformed
    /// process has covariance `γ(h)`, solving `Σ c_n²·γ̂ⁿ/n! = γ` per lag.
    pub fn transform_acf(&self, acf: &mut Array3<Real>) -> SwellResult<()> {
        let variance = acf[[0, 0, 0]];
        if !(variance > 0.0) {
            return Err(SwellError::Validation(format!(
                "bad ACF variance: {variance}"
            )));
        }
        let (_, gcs, _) = self.fit_transform(variance)?;
        let solver = self.acf_solver(variance);
        acf.mapv_inplace(|gamma| solver.solve(|x| series_sum(&gcs, x) - gamma));
        Ok(())
    }

    /// Map every elevation sample through the pointwise Gaussian-to-target
    /// CDF transform. Uses only local information, so samples transform in
    /// parallel.
    pub fn transform_realisation(
        &self,
        acf_variance: Real,
        zeta: &mut Array3<Real>,
    ) -> SwellResult<()> {
        if !(acf_variance > 0.0) {
            return Err(SwellError::Validation(format!(
                "bad ACF variance: {acf_variance}"
            )));
        }
        let stdev = acf_variance.sqrt();
        let gaussian = Gaussian::new(0.0, stdev);
        let solver = self.cdf_solver(stdev);
        let slice = zeta
            .as_slice_mut()
            .expect("surface storage is contiguous");
        slice.par_iter_mut().for_each(|value| {
            let target = gaussian.cdf(*value);
            *value = solver.solve(|v| self.distribution.cdf(v) - target);
        });
        Ok(())
    }
}
