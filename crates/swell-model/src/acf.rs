//! Analytic auto-covariance families.
//!
//! A small database of closed-form ACF approximations of real wave fields,
//! sampled pointwise onto a 3-D `(t, x, y)` lag grid. Families are selected
//! by name through [`acf_function`]; unknown names report the supported set.

use std::collections::HashMap;

use ndarray::Array3;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use swell_core::{Grid3, Real, SwellError, SwellResult};

/// Named parameters shared by the analytic families.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AcfParams {
    /// Amplitude γ; the variance scale of the field.
    pub amplitude: Real,
    /// Angular wave velocity.
    pub velocity: Real,
    /// Exponential decay per axis `(t, x, y)`.
    pub alpha: [Real; 3],
    /// Wavenumbers per axis `(t, x, y)`.
    pub beta: [Real; 3],
}

impl Default for AcfParams {
    fn default() -> Self {
        Self {
            amplitude: 5.0,
            velocity: 1.0,
            alpha: [0.06, 0.06, 0.06],
            beta: [0.8, 0.8, 0.0],
        }
    }
}

pub type AcfFunction = fn(&AcfParams, &Grid3) -> Array3<Real>;

/// ACF of a standing wave field: even in time, no phase propagation.
pub fn standing_wave_acf(p: &AcfParams, grid: &Grid3) -> Array3<Real> {
    let [dt, dx, dy] = grid.delta();
    let [n0, n1, n2] = grid.size();
    Array3::from_shape_fn((n0, n1, n2), |(i, j, k)| {
        let t = i as Real * dt;
        let x = j as Real * dx;
        let y = k as Real * dy;
        p.amplitude
            * (-(p.alpha[0] * 2.0 * t + p.alpha[1] * x + p.alpha[2] * y)).exp()
            * (2.0 * p.beta[0] * p.velocity * t).cos()
            * (p.beta[1] * x).cos()
            * (p.beta[2] * y).cos()
    })
}

/// ACF of a propagating wave field: the phase travels along `x` and `y`.
pub fn propagating_wave_acf(p: &AcfParams, grid: &Grid3) -> Array3<Real> {
    let [dt, dx, dy] = grid.delta();
    let [n0, n1, n2] = grid.size();
    Array3::from_shape_fn((n0, n1, n2), |(i, j, k)| {
        let t = i as Real * dt;
        let x = j as Real * dx;
        let y = k as Real * dy;
        p.amplitude
            * (-(p.alpha[0] * t + p.alpha[1] * x + p.alpha[2] * y)).exp()
            * (p.beta[0] * p.velocity * t - p.beta[1] * x - p.beta[2] * y).cos()
    })
}

/// Pure separable exponential decay, useful as a minimal realizable ACF.
pub fn exponential_acf(p: &AcfParams, grid: &Grid3) -> Array3<Real> {
    let [dt, dx, dy] = grid.delta();
    let [n0, n1, n2] = grid.size();
    Array3::from_shape_fn((n0, n1, n2), |(i, j, k)| {
        let t = i as Real * dt;
        let x = j as Real * dx;
        let y = k as Real * dy;
        p.amplitude * (-(p.alpha[0] * t + p.alpha[1] * x + p.alpha[2] * y)).exp()
    })
}

static ACF_FUNCTIONS: Lazy<HashMap<&'static str, AcfFunction>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, AcfFunction> = HashMap::new();
    map.insert("standing_wave", standing_wave_acf);
    map.insert("propagating_wave", propagating_wave_acf);
    map.insert("exponential", exponential_acf);
    map
});

/// Look up an analytic family by name.
pub fn acf_function(name: &str) -> SwellResult<AcfFunction> {
    ACF_FUNCTIONS.get(name).copied().ok_or_else(|| {
        let mut names: Vec<&str> = ACF_FUNCTIONS.keys().copied().collect();
        names.sort_unstable();
        SwellError::Config(format!(
            "bad ACF function name \"{name}\"; supported values: {}",
            names.join(", ")
        ))
    })
}

/// The process variance is the zero-lag ACF value.
pub fn acf_variance(acf: &Array3<Real>) -> Real {
    acf[[0, 0, 0]]
}
