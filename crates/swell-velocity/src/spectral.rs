//! Shared spectral machinery of the FFT-based velocity solvers.

use ndarray::{Array2, Array4, Axis};
use num_complex::Complex;
use rayon::prelude::*;

use swell_core::{Domain2, DiscreteFunction3, Real, SwellError, SwellResult};
use swell_fft::{fft_freq, Cmplx, FourierTransform};

use crate::interpolate::interpolate;

const TWO_PI: Real = 2.0 * std::f64::consts::PI as Real;

/// `cosh(a)/cosh(b)` evaluated without overflowing for large arguments.
fn cosh_ratio(a: Real, b: Real) -> Real {
    let (a, b) = (a.abs(), b.abs());
    if b < 30.0 {
        a.cosh() / b.cosh()
    } else {
        (a - b).exp() * (1.0 + (-2.0 * a).exp()) / (1.0 + (-2.0 * b).exp())
    }
}

/// `sinh(a)/sinh(b)` evaluated without overflowing for large arguments.
pub(crate) fn sinh_ratio(a: Real, b: Real) -> Real {
    let sign = a.signum() * b.signum();
    let (a, b) = (a.abs(), b.abs());
    if b < 30.0 {
        sign * a.sinh() / b.sinh()
    } else {
        sign * (a - b).exp() * (1.0 - (-2.0 * a).exp()) / (1.0 - (-2.0 * b).exp())
    }
}

/// The spectral multiplier of the low-amplitude theory,
///
/// `W(u,v; z) = 4π · cosh(|k|(z+h)) / (|k|·cosh(|k|h))`
///
/// with `|k| = 2π·√(u² + v²)` over the DFT frequencies of the surface
/// grid. The `|k| = 0` bin is patched by plane extrapolation from the
/// three adjacent bins.
pub(crate) fn window_function(
    shape: [usize; 2],
    delta: [Real; 2],
    z: Real,
    depth: Real,
) -> SwellResult<Array2<Real>> {
    let [nx, ny] = shape;
    let mut window = Array2::zeros((nx, ny));
    for i in 0..nx {
        for j in 0..ny {
            if i == 0 && j == 0 {
                continue;
            }
            let u = fft_freq(i, nx, delta[0]);
            let v = fft_freq(j, ny, delta[1]);
            let klen = TWO_PI * (u * u + v * v).sqrt();
            window[[i, j]] = 2.0 * TWO_PI * cosh_ratio(klen * (z + depth), klen * depth) / klen;
        }
    }
    window[[0, 0]] = interpolate([1, 1], [1, 2], [2, 1], window.view(), [0, 0]);
    if !window.iter().all(|v| v.is_finite()) {
        return Err(SwellError::NumericalSingularity(format!(
            "non-finite spectral multiplier at z = {z}, depth = {depth}; \
             keep z away from the free surface and the depth finite"
        )));
    }
    Ok(window)
}

/// Run the spectral solve over the `(t, z)` domain.
///
/// `source` produces the complex source slice for a surface time index;
/// the result is `Re(F⁻¹(W·F(source)))/N` per `(t, z)` pair.
pub(crate) fn solve_spectral<F>(
    zeta: &DiscreteFunction3,
    depth: Real,
    domain: &Domain2,
    source: F,
) -> SwellResult<Array4<Real>>
where
    F: Fn(usize) -> SwellResult<Array2<Cmplx>>,
{
    domain.validate("velocity_potential_solver.domain")?;
    if !depth.is_finite() || depth <= 0.0 {
        return Err(SwellError::Validation(format!("bad water depth: {depth}")));
    }
    let [nt, nx, ny] = zeta.shape();
    if nx < 3 || ny < 3 {
        return Err(SwellError::Validation(format!(
            "surface is too small for the spectral solve: {nx}x{ny}"
        )));
    }
    let grid = zeta.grid();
    let dt = grid.patch_size(0);
    let delta = [grid.patch_size(1), grid.patch_size(2)];
    let nt_dom = domain.num_points(0);
    let nz = domain.num_points(1);
    let fft = FourierTransform::new(&[nx, ny]);
    let scale = 1.0 / (nx * ny) as Real;
    let mut result = Array4::zeros((nt_dom, nz, nx, ny));
    for i in 0..nt_dom {
        let t = domain.point(i, 0);
        let idx_t = if dt > 0.0 {
            (t / dt).round() as isize
        } else {
            0
        };
        if idx_t < 0 || idx_t as usize >= nt {
            return Err(SwellError::Validation(format!(
                "solver time {t} falls outside the surface record"
            )));
        }
        let mut spectrum = source(idx_t as usize)?;
        fft.forward(&mut spectrum);
        let mut time_slab = result.index_axis_mut(Axis(0), i);
        let mut slabs: Vec<_> = time_slab.outer_iter_mut().collect();
        let failures: Vec<SwellError> = slabs
            .par_iter_mut()
            .enumerate()
            .filter_map(|(j, slab)| {
                let z = domain.point(j, 1);
                let window = match window_function([nx, ny], delta, z, depth) {
                    Ok(w) => w,
                    Err(err) => return Some(err),
                };
                let mut phi = spectrum.clone();
                phi.zip_mut_with(&window, |p, &w| *p *= Complex::new(w, 0.0));
                fft.backward(&mut phi);
                slab.zip_mut_with(&phi, |out, v| *out = v.re * scale);
                None
            })
            .collect();
        if let Some(err) = failures.into_iter().next() {
            return Err(err);
        }
    }
    Ok(result)
}
