//! Plain-wave profiles and the deterministic sum-of-waves surface model.

use std::fmt;
use std::str::FromStr;

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use swell_core::{Domain3, Grid3, Real, SwellError, SwellResult};

const TWO_PI: Real = 2.0 * std::f64::consts::PI as Real;

/// Analytic wave profile used by the empirical ACF generator and the
/// plain-wave surface model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlainWaveProfile {
    Sine,
    Cosine,
    /// Third-order Stokes wave on deep water.
    Stokes,
    StandingWave,
}

impl PlainWaveProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlainWaveProfile::Sine => "sin",
            PlainWaveProfile::Cosine => "cos",
            PlainWaveProfile::Stokes => "stokes",
            PlainWaveProfile::StandingWave => "standing_wave",
        }
    }

    /// Evaluate the profile at `(x, y, t)`.
    ///
    /// `kx`, `ky` are cyclic wavenumbers (multiplied by 2π inside the
    /// phase), `velocity` is the angular frequency.
    #[allow(clippy::too_many_arguments)]
    pub fn eval(
        &self,
        amplitude: Real,
        kx: Real,
        ky: Real,
        velocity: Real,
        phase: Real,
        x: Real,
        y: Real,
        t: Real,
    ) -> Real {
        let theta = TWO_PI * (kx * x + ky * y) - velocity * t + phase;
        match self {
            PlainWaveProfile::Sine => amplitude * theta.sin(),
            PlainWaveProfile::Cosine => amplitude * theta.cos(),
            PlainWaveProfile::Stokes => {
                let k = TWO_PI * (kx * kx + ky * ky).sqrt();
                let steepness = k * amplitude;
                amplitude
                    * (theta.cos()
                        + 0.5 * steepness * (2.0 * theta).cos()
                        + 0.375 * steepness * steepness * (3.0 * theta).cos())
            }
            PlainWaveProfile::StandingWave => {
                amplitude
                    * (TWO_PI * (kx * x + ky * y)).cos()
                    * (velocity * t + phase).cos()
            }
        }
    }
}

impl fmt::Display for PlainWaveProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlainWaveProfile {
    type Err = SwellError;

    fn from_str(name: &str) -> SwellResult<Self> {
        match name {
            "sin" => Ok(PlainWaveProfile::Sine),
            "cos" => Ok(PlainWaveProfile::Cosine),
            "stokes" => Ok(PlainWaveProfile::Stokes),
            "standing_wave" => Ok(PlainWaveProfile::StandingWave),
            other => Err(SwellError::Config(format!(
                "bad plain wave profile \"{other}\"; supported values: \
                 sin, cos, stokes, standing_wave"
            ))),
        }
    }
}

/// Evaluate a profile over a whole domain into a `(t, x, y)` array.
#[allow(clippy::too_many_arguments)]
pub fn generate_wavy_surface(
    profile: PlainWaveProfile,
    domain: &Domain3,
    amplitude: Real,
    kx: Real,
    ky: Real,
    velocity: Real,
    phase: Real,
) -> Array3<Real> {
    let [nt, nx, ny] = domain.shape();
    Array3::from_shape_fn((nt, nx, ny), |(i, j, k)| {
        let t = domain.point(i, 0);
        let x = domain.point(j, 1);
        let y = domain.point(k, 2);
        profile.eval(amplitude, kx, ky, velocity, phase, x, y, t)
    })
}

/// One component wave: amplitude, wavenumbers, angular velocity, phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Wave {
    pub amplitude: Real,
    pub kx: Real,
    pub ky: Real,
    pub velocity: Real,
    pub phase: Real,
}

/// A deterministic surface built from a finite sum of plane waves,
/// small-amplitude theory. Used both as a test target and as a synthesis
/// primitive for the plain-wave velocity solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlainWaveModel {
    pub profile: PlainWaveProfile,
    pub waves: Vec<Wave>,
}

impl PlainWaveModel {
    /// Cosine profiles shift the phase by π/2 so that every component can be
    /// generated through a single sine evaluation.
    pub fn shift(&self) -> Real {
        match self.profile {
            PlainWaveProfile::Cosine => 0.5 * std::f64::consts::PI as Real,
            _ => 0.0,
        }
    }

    pub fn validate(&self) -> SwellResult<()> {
        if self.waves.is_empty() {
            return Err(SwellError::Validation("plain_wave.waves is empty".into()));
        }
        for w in &self.waves {
            if !(w.amplitude > 0.0) {
                return Err(SwellError::Validation(format!(
                    "bad \"plain_wave.amplitude\": {}",
                    w.amplitude
                )));
            }
            for v in [w.amplitude, w.kx, w.ky, w.velocity, w.phase] {
                if !v.is_finite() {
                    return Err(SwellError::Validation("non-finite wave parameter".into()));
                }
            }
        }
        Ok(())
    }

    /// Generate the surface over `grid`; the time axis steps in grid units.
    pub fn generate(&self, grid: &Grid3) -> Array3<Real> {
        let shift = self.shift();
        let [nt, nx, ny] = grid.size();
        let [dt, dx, dy] = grid.delta();
        Array3::from_shape_fn((nt, nx, ny), |(i, j, k)| {
            let t = i as Real * dt;
            let x = j as Real * dx;
            let y = k as Real * dy;
            self.waves
                .iter()
                .map(|w| {
                    w.amplitude
                        * (TWO_PI * (w.kx * x + w.ky * y) - w.velocity * t + w.phase + shift)
                            .sin()
                })
                .sum()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn profile_names_round_trip() {
        for name in ["sin", "cos", "stokes", "standing_wave"] {
            let profile: PlainWaveProfile = name.parse().unwrap();
            assert_eq!(profile.to_string(), name);
        }
        assert!("tanh".parse::<PlainWaveProfile>().is_err());
    }

    #[test]
    fn cosine_model_starts_at_crest() {
        let model = PlainWaveModel {
            profile: PlainWaveProfile::Cosine,
            waves: vec![Wave {
                amplitude: 2.0,
                kx: 0.1,
                ky: 0.0,
                velocity: 1.0,
                phase: 0.0,
            }],
        };
        let grid = Grid3::new([4, 4, 4], [3.0, 3.0, 3.0]);
        let zeta = model.generate(&grid);
        assert_abs_diff_eq!(zeta[[0, 0, 0]], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn stokes_wave_sharpens_crests() {
        // The third-order correction raises crests above the linear amplitude.
        let a = 1.0;
        let kx = 0.05;
        let crest = PlainWaveProfile::Stokes.eval(a, kx, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
        assert!(crest > a);
    }

    #[test]
    fn empty_wave_list_is_invalid() {
        let model = PlainWaveModel {
            profile: PlainWaveProfile::Sine,
            waves: vec![],
        };
        assert!(model.validate().is_err());
    }
}
