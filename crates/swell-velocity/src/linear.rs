//! Low-amplitude (linear wave theory) velocity-potential solver.

use ndarray::Array4;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use swell_core::{DiscreteFunction3, Domain2, Real, SwellResult};

use crate::derivative::derivative;
use crate::spectral::solve_spectral;

/// Reconstructs `φ(t,z,x,y)` from the surface elevation through the linear
/// spectral kernel: the source is `ζ_t = −∂ζ/∂t`, transformed, multiplied
/// by the window function and transformed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSolver {
    /// Water depth `h`.
    pub depth: Real,
    /// Solver domain over `(t, z)`.
    pub domain: Domain2,
}

impl LinearSolver {
    pub fn solve(&self, zeta: &DiscreteFunction3) -> SwellResult<Array4<Real>> {
        let delta = zeta.grid().delta();
        solve_spectral(zeta, self.depth, &self.domain, |idx_t| {
            let zeta_t = derivative(zeta.data().view(), delta, 0, idx_t)?;
            Ok(zeta_t.mapv(|v| Complex::new(-v, 0.0)))
        })
    }
}
