//! Empirical ACF construction from a reference plain-wave pattern.

use ndarray::{Array3, Slice};
use serde::{Deserialize, Serialize};
use tracing::debug;

use swell_core::{stats, Domain3, Grid3, Real};

use crate::acv::auto_covariance;
use crate::plain_wave::{generate_wavy_surface, PlainWaveProfile};

/// Builds a discrete ACF by sampling a reference wavy surface, applying an
/// exponential decay envelope and taking the periodic auto-covariance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcfGenerator {
    /// Plain wave profile analytic approximation.
    pub profile: PlainWaveProfile,
    /// Wave amplitude.
    pub amplitude: Real,
    /// Angular velocity.
    pub velocity: Real,
    /// Angular wave numbers `(x, y)`.
    pub wavenum: [Real; 2],
    /// Exponential decay factor `(t, x, y)`.
    pub alpha: [Real; 3],
    /// The number of waves in the wave group; may be fractional.
    pub nwaves: Real,
    /// Maximum variance difference when searching for the optimal reference
    /// surface resolution.
    pub var_epsilon: Real,
    /// Trailing-value trim threshold relative to the variance. `None`
    /// disables trimming.
    pub chop_epsilon: Option<Real>,
}

impl Default for AcfGenerator {
    fn default() -> Self {
        Self {
            profile: PlainWaveProfile::Cosine,
            amplitude: 1.0,
            velocity: 1.0,
            wavenum: [0.8, 0.0],
            alpha: [0.06, 0.06, 0.06],
            nwaves: 1.5,
            var_epsilon: 1e-3,
            chop_epsilon: None,
        }
    }
}

impl AcfGenerator {
    /// Generate the ACF; the result grid spans `nwaves` wave periods per
    /// axis. Guarantees `acf[0,0,0]` equals the reference field variance
    /// and all entries are finite.
    pub fn generate(&self) -> (Array3<Real>, Grid3) {
        let (wave, domain) = self.generate_optimal_wavy_surface();
        let wave = self.add_exponential_decay(wave, &domain);
        debug!(variance = stats::variance(&wave), "decayed reference field");
        let mut acf = auto_covariance(&wave);
        // Keep half the generated extent; the far half repeats the wrapped
        // lags of the periodic estimator.
        let (n0, n1, n2) = acf.dim();
        acf = acf
            .slice_axis(ndarray::Axis(0), Slice::from(0..(n0 / 2).max(1)))
            .slice_axis(ndarray::Axis(1), Slice::from(0..(n1 / 2).max(1)))
            .slice_axis(ndarray::Axis(2), Slice::from(0..(n2 / 2).max(1)))
            .to_owned();
        if let Some(eps) = self.chop_epsilon {
            let threshold = acf[[0, 0, 0]] * eps;
            let shape = chop_right(&acf, threshold);
            acf = acf
                .slice_axis(ndarray::Axis(0), Slice::from(0..shape[0]))
                .slice_axis(ndarray::Axis(1), Slice::from(0..shape[1]))
                .slice_axis(ndarray::Axis(2), Slice::from(0..shape[2]))
                .to_owned();
        }
        debug!(variance = acf[[0, 0, 0]], shape = ?acf.dim(), "generated ACF");
        let r = self.nwaves;
        let (m0, m1, m2) = acf.dim();
        let grid = Grid3::new([m0, m1, m2], [r, r, r]);
        (acf, grid)
    }

    /// Generate a reference surface of optimal size: start from 2×2×2 and
    /// double the resolution until the sample variance settles.
    fn generate_optimal_wavy_surface(&self) -> (Array3<Real>, Domain3) {
        let r = self.nwaves;
        let mut shape = [2usize; 3];
        let mut var0 = -1.0;
        loop {
            let domain = Domain3::new(
                [-r, -r, -r],
                [r, r, r],
                [shape[0] + 1, shape[1] + 1, shape[2] + 1],
            );
            let surface = generate_wavy_surface(
                self.profile,
                &domain,
                self.amplitude,
                self.wavenum[0],
                self.wavenum[1],
                self.velocity,
                0.0,
            );
            let var = stats::variance(&surface);
            debug!(?shape, var, "reference surface iteration");
            let settled = var0 >= 0.0 && (var - var0).abs() < self.var_epsilon;
            if settled || shape.iter().any(|&n| n * 2 >= 128) {
                return (surface, domain);
            }
            var0 = var;
            for n in shape.iter_mut() {
                *n *= 2;
            }
        }
    }

    /// Multiply by `exp(−Σ|αᵢ·xᵢ|)` and rescale to preserve the variance.
    fn add_exponential_decay(&self, wave: Array3<Real>, domain: &Domain3) -> Array3<Real> {
        let var_before = stats::variance(&wave);
        let mut decayed = wave;
        let (n0, n1, n2) = decayed.dim();
        for i in 0..n0 {
            for j in 0..n1 {
                for k in 0..n2 {
                    let t = domain.point(i, 0);
                    let x = domain.point(j, 1);
                    let y = domain.point(k, 2);
                    let envelope = (-((t * self.alpha[0]).abs()
                        + (x * self.alpha[1]).abs()
                        + (y * self.alpha[2]).abs()))
                    .exp();
                    decayed[[i, j, k]] *= envelope;
                }
            }
        }
        let var_after = stats::variance(&decayed);
        if var_after > 0.0 {
            let scale = (var_before / var_after).sqrt();
            decayed.mapv_inplace(|v| v * scale);
        }
        decayed
    }
}

/// Shape after discarding trailing planes whose values are all below `eps`
/// in magnitude, scanned from the upper corner inward.
pub fn chop_right(a: &Array3<Real>, eps: Real) -> [usize; 3] {
    let (n0, n1, n2) = a.dim();
    let mut k = n2 - 1;
    while k >= 1 && (0..n0).all(|i| (0..n1).all(|j| a[[i, j, k]].abs() < eps)) {
        k -= 1;
    }
    let mut j = n1 - 1;
    while j >= 1 && (0..n0).all(|i| (0..=k).all(|kk| a[[i, j, kk]].abs() < eps)) {
        j -= 1;
    }
    let mut i = n0 - 1;
    while i >= 1 && (0..=j).all(|jj| (0..=k).all(|kk| a[[i, jj, kk]].abs() < eps)) {
        i -= 1;
    }
    [i + 1, j + 1, k + 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn generated_acf_is_finite_with_positive_variance() {
        let gen = AcfGenerator {
            var_epsilon: 1e-2,
            ..AcfGenerator::default()
        };
        let (acf, grid) = gen.generate();
        assert!(acf[[0, 0, 0]] > 0.0);
        assert!(acf.iter().all(|v| v.is_finite()));
        assert_eq!(grid.size(), {
            let (a, b, c) = acf.dim();
            [a, b, c]
        });
    }

    #[test]
    fn decay_preserves_variance() {
        let gen = AcfGenerator::default();
        let domain = Domain3::new([-1.5, -1.5, -1.5], [1.5, 1.5, 1.5], [17, 17, 17]);
        let wave = generate_wavy_surface(
            gen.profile,
            &domain,
            gen.amplitude,
            gen.wavenum[0],
            gen.wavenum[1],
            gen.velocity,
            0.0,
        );
        let var_before = stats::variance(&wave);
        let decayed = gen.add_exponential_decay(wave, &domain);
        assert_relative_eq!(stats::variance(&decayed), var_before, epsilon = 1e-8);
    }

    #[test]
    fn chop_right_trims_trailing_noise() {
        let mut a = Array3::zeros((4, 4, 4));
        a[[0, 0, 0]] = 1.0;
        a[[1, 1, 1]] = 0.5;
        a[[3, 3, 3]] = 1e-12;
        assert_eq!(chop_right(&a, 1e-6), [2, 2, 2]);
    }

    #[test]
    fn chop_disabled_by_default() {
        assert!(AcfGenerator::default().chop_epsilon.is_none());
    }
}
