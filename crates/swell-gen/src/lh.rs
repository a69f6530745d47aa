//! Longuet–Higgins surface model.
//!
//! Small-amplitude waves synthesized from a directional frequency spectrum:
//! the spectrum is integrated over `(ω, θ)` patches to obtain component
//! amplitudes, phases are drawn uniformly, and the surface is the sum of
//! the resulting harmonics with deep-water wavenumbers `k = ω²/g`.

use ndarray::{Array2, Array3};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use swell_core::{Domain2, Grid3, Real, SwellResult};

use crate::mt::{MtConfig, ParallelMt};

const G: Real = 9.8;
const TWO_PI: Real = 2.0 * std::f64::consts::PI as Real;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LonguetHigginsModel {
    /// Spectrum domain over `(ω, θ)`.
    pub spec_domain: Domain2,
    /// Sub-sampling of each spectrum patch during integration.
    pub spec_subdomain: [usize; 2],
    /// Significant wave height driving the spectrum shape.
    pub wave_height: Real,
}

impl LonguetHigginsModel {
    /// Approximate directional spectrum of developed sea waves for a given
    /// wave height.
    pub fn approx_spectrum(&self, omega: Real, theta: Real, height: Real) -> Real {
        let pi = std::f64::consts::PI as Real;
        let tau = 4.8 * height.sqrt();
        let a = 0.28 * TWO_PI.powi(4) * height * height * tau.powi(-4);
        let b = 0.44 * TWO_PI.powi(4) * tau.powi(-4);
        a * omega.powi(-5) * (-b * omega.powi(-4)).exp() * 2.0 * theta.cos().powi(2) / pi
    }

    /// Integrate the spectrum over each `(ω, θ)` patch:
    /// `a_ij = √(2·S(ω_i, θ_j)·Δω·Δθ)`.
    pub fn determine_coefficients(&self) -> Array2<Real> {
        let nomega = self.spec_domain.num_points(0) - 1;
        let ntheta = self.spec_domain.num_points(1) - 1;
        let [sub_omega, sub_theta] = self.spec_subdomain;
        let domega = self.spec_domain.patch_size(0);
        let dtheta = self.spec_domain.patch_size(1);
        Array2::from_shape_fn((nomega, ntheta), |(i, j)| {
            let mut sum = 0.0;
            for a in 0..sub_omega.max(1) {
                for b in 0..sub_theta.max(1) {
                    let omega = self.spec_domain.point(i, 0)
                        + domega * a as Real / sub_omega.max(1) as Real;
                    let theta = self.spec_domain.point(j, 1)
                        + dtheta * b as Real / sub_theta.max(1) as Real;
                    sum += self.approx_spectrum(omega, theta, self.wave_height);
                }
            }
            let patch = domega * dtheta / (sub_omega.max(1) * sub_theta.max(1)) as Real;
            (2.0 * sum * patch).sqrt()
        })
    }

    /// Uniform random phases for every spectrum component.
    pub fn generate_phases(&self, rng: &mut ParallelMt) -> Array2<Real> {
        let nomega = self.spec_domain.num_points(0) - 1;
        let ntheta = self.spec_domain.num_points(1) - 1;
        Array2::from_shape_fn((nomega, ntheta), |_| rng.gen_range(0.0..TWO_PI as f64) as Real)
    }

    /// Sum the harmonics over the output grid.
    pub fn generate(&self, grid: &Grid3, seed: u32) -> SwellResult<Array3<Real>> {
        self.spec_domain.validate("lh_model.spec_domain")?;
        let coef = self.determine_coefficients();
        let mut rng = ParallelMt::new(MtConfig::mt19937(0), seed);
        let phases = self.generate_phases(&mut rng);
        let [nt, nx, ny] = grid.size();
        let [dt, dx, dy] = grid.delta();
        let (nomega, ntheta) = coef.dim();
        let mut zeta = Array3::zeros((nt, nx, ny));
        zeta.indexed_iter_mut()
            .collect::<Vec<_>>()
            .into_par_iter()
            .for_each(|((i, j, k), value)| {
                let t = i as Real * dt;
                let x = j as Real * dx;
                let y = k as Real * dy;
                let mut sum = 0.0;
                for l in 0..nomega {
                    for m in 0..ntheta {
                        let omega = self.spec_domain.point(l, 0);
                        let theta = self.spec_domain.point(m, 1);
                        let omega_sq = omega * omega;
                        let kx = omega_sq * theta.cos() / G;
                        let ky = omega_sq * theta.sin() / G;
                        sum += coef[[l, m]]
                            * (kx * x + ky * y - omega * t + phases[[l, m]]).cos();
                    }
                }
                *value = sum;
            });
        Ok(zeta)
    }
}
