//! High-amplitude velocity-potential solver.
//!
//! Same spectral kernel as the linear solver with a surface-slope
//! correction applied to the source term. The correction's derivation
//! assumes moderate steepness; the solver logs a diagnostic when the
//! surface exceeds the limiting steepness of real waves instead of
//! silently producing doubtful values.

use ndarray::{Array2, Array4};
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use swell_core::{DiscreteFunction3, Domain2, Real, SwellResult};
use swell_fft::Cmplx;

use crate::derivative::derivative;
use crate::spectral::solve_spectral;

/// Steepness beyond which the correction formula leaves its regime of
/// validity.
const STEEPNESS_LIMIT: Real = 0.3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighAmplitudeSolver {
    /// Water depth `h`.
    pub depth: Real,
    /// Solver domain over `(t, z)`.
    pub domain: Domain2,
}

impl HighAmplitudeSolver {
    /// Corrected source slice:
    /// `∂ζ/∂t / ( i·((ζ_x+ζ_y)/√(1+ζ_x²+ζ_y²) − ζ_x − ζ_y) − 1 )`.
    fn source(&self, zeta: &DiscreteFunction3, idx_t: usize) -> SwellResult<Array2<Cmplx>> {
        let delta = zeta.grid().delta();
        let zeta_t = derivative(zeta.data().view(), delta, 0, idx_t)?;
        let zeta_x = derivative(zeta.data().view(), delta, 1, idx_t)?;
        let zeta_y = derivative(zeta.data().view(), delta, 2, idx_t)?;
        let steepness = zeta_x
            .iter()
            .zip(zeta_y.iter())
            .map(|(zx, zy)| (zx * zx + zy * zy).sqrt())
            .fold(0.0 as Real, Real::max);
        if steepness > STEEPNESS_LIMIT {
            warn!(
                steepness,
                idx_t, "surface steepness exceeds the high-amplitude regime of validity"
            );
        }
        let mut source = Array2::from_elem(zeta_t.dim(), Cmplx::default());
        for ((out, &zt), (&zx, &zy)) in source
            .iter_mut()
            .zip(zeta_t.iter())
            .zip(zeta_x.iter().zip(zeta_y.iter()))
        {
            // For vanishing slopes the denominator tends to −1 and the
            // source reduces to the linear −∂ζ/∂t.
            let slope_norm = (1.0 + zx * zx + zy * zy).sqrt();
            let denominator = Complex::new(-1.0, (zx + zy) / slope_norm - zx - zy);
            *out = Complex::new(zt, 0.0) / denominator;
        }
        Ok(source)
    }

    pub fn solve(&self, zeta: &DiscreteFunction3) -> SwellResult<Array4<Real>> {
        solve_spectral(zeta, self.depth, &self.domain, |idx_t| {
            self.source(zeta, idx_t)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;
    use swell_core::Grid3;

    const TWO_PI: Real = 2.0 * std::f64::consts::PI as Real;

    fn gentle_surface() -> DiscreteFunction3 {
        let (nt, nx, ny) = (16, 16, 16);
        let grid = Grid3::new(
            [nt, nx, ny],
            [(nt - 1) as Real * 0.1, (nx - 1) as Real, (ny - 1) as Real],
        );
        let data = Array3::from_shape_fn((nt, nx, ny), |(t, x, _)| {
            0.01 * (TWO_PI * 0.25 * x as Real - 0.5 * t as Real * 0.1).cos()
        });
        DiscreteFunction3::new(data, grid)
    }

    #[test]
    fn gentle_surface_approaches_the_linear_solution() {
        // For vanishing slopes the correction denominator tends to −1 and
        // the source reduces to the linear ζ_t.
        let zeta = gentle_surface();
        let domain = Domain2::new([0.5, -3.0], [0.5, 0.0], [1, 4]);
        let high = HighAmplitudeSolver { depth: 10.0, domain };
        let linear = crate::linear::LinearSolver { depth: 10.0, domain };
        let phi_high = high.solve(&zeta).unwrap();
        let phi_linear = linear.solve(&zeta).unwrap();
        for (a, b) in phi_high.iter().zip(phi_linear.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 5e-3 * (1.0 + b.abs()));
        }
    }

    #[test]
    fn output_is_finite() {
        let zeta = gentle_surface();
        let solver = HighAmplitudeSolver {
            depth: 10.0,
            domain: Domain2::new([0.0, -5.0], [1.0, 0.0], [3, 4]),
        };
        let phi = solver.solve(&zeta).unwrap();
        assert!(phi.iter().all(|v| v.is_finite()));
    }
}
