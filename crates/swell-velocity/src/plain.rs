//! Closed-form velocity potential for plain-wave surfaces.

use ndarray::Array4;
use serde::{Deserialize, Serialize};

use swell_core::{DiscreteFunction3, Domain2, Real, SwellError, SwellResult};
use swell_model::PlainWaveModel;

use crate::spectral::sinh_ratio;

const TWO_PI: Real = 2.0 * std::f64::consts::PI as Real;

/// Per-wave summation of the small-amplitude plane-wave potential; used
/// when the surface is a known finite sum of plane waves, so no transform
/// is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlainWaveSolver {
    pub model: PlainWaveModel,
    /// Water depth `h`.
    pub depth: Real,
    /// Solver domain over `(t, z)`.
    pub domain: Domain2,
}

impl PlainWaveSolver {
    pub fn solve(&self, zeta: &DiscreteFunction3) -> SwellResult<Array4<Real>> {
        self.domain.validate("velocity_potential_solver.domain")?;
        self.model.validate()?;
        if !self.depth.is_finite() || self.depth <= 0.0 {
            return Err(SwellError::Validation(format!(
                "bad water depth: {}",
                self.depth
            )));
        }
        let [_, nx, ny] = zeta.shape();
        let grid = zeta.grid();
        let (dx, dy) = (grid.patch_size(1), grid.patch_size(2));
        let shift = self.model.shift();
        let h = self.depth;
        let nt_dom = self.domain.num_points(0);
        let nz = self.domain.num_points(1);
        let mut result = Array4::zeros((nt_dom, nz, nx, ny));
        for i in 0..nt_dom {
            let t = self.domain.point(i, 0);
            for j in 0..nz {
                let z = self.domain.point(j, 1);
                for x in 0..nx {
                    for y in 0..ny {
                        let px = x as Real * dx;
                        let py = y as Real * dy;
                        let mut sum = 0.0;
                        for w in &self.model.waves {
                            let klen = (w.kx * w.kx + w.ky * w.ky).sqrt();
                            if klen == 0.0 {
                                return Err(SwellError::Validation(
                                    "plain wave with zero wavenumber".into(),
                                ));
                            }
                            let kappa = TWO_PI * klen;
                            sum += 2.0 * w.amplitude * w.velocity
                                * (TWO_PI * (w.kx * px + w.ky * py) - w.velocity * t
                                    + shift
                                    + w.phase)
                                    .cos()
                                * sinh_ratio(kappa * (z + h), kappa * h)
                                / klen;
                        }
                        result[[i, j, x, y]] = sum;
                    }
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;
    use swell_core::Grid3;
    use swell_model::{PlainWaveProfile, Wave};

    #[test]
    fn potential_decays_with_depth_and_oscillates_in_x() {
        let model = PlainWaveModel {
            profile: PlainWaveProfile::Cosine,
            waves: vec![Wave {
                amplitude: 0.5,
                kx: 0.25,
                ky: 0.0,
                velocity: 1.0,
                phase: 0.0,
            }],
        };
        let grid = Grid3::new([8, 16, 8], [7.0, 15.0, 7.0]);
        let zeta = DiscreteFunction3::new(model.generate(&grid), grid);
        let solver = PlainWaveSolver {
            model,
            depth: 10.0,
            domain: Domain2::new([0.0, -4.0], [0.0, 0.0], [1, 5]),
        };
        let phi = solver.solve(&zeta).unwrap();
        // magnitude shrinks with depth
        let surface_amp = phi
            .index_axis(ndarray::Axis(1), 4)
            .iter()
            .fold(0.0 as Real, |m, v| m.max(v.abs()));
        let deep_amp = phi
            .index_axis(ndarray::Axis(1), 0)
            .iter()
            .fold(0.0 as Real, |m, v| m.max(v.abs()));
        assert!(deep_amp < surface_amp);
        // one full spatial period spans 1/kx = 4 grid steps
        assert_abs_diff_eq!(phi[[0, 4, 0, 0]], phi[[0, 4, 4, 0]], epsilon = 1e-9);
    }

    #[test]
    fn zero_wavenumber_is_rejected() {
        let model = PlainWaveModel {
            profile: PlainWaveProfile::Sine,
            waves: vec![Wave {
                amplitude: 1.0,
                kx: 0.0,
                ky: 0.0,
                velocity: 1.0,
                phase: 0.0,
            }],
        };
        let grid = Grid3::new([4, 4, 4], [3.0, 3.0, 3.0]);
        let zeta = DiscreteFunction3::new(Array3::zeros((4, 4, 4)), grid);
        let solver = PlainWaveSolver {
            model,
            depth: 5.0,
            domain: Domain2::new([0.0, -1.0], [0.0, 0.0], [1, 2]),
        };
        assert!(solver.solve(&zeta).is_err());
    }
}
