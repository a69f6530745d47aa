//! Finite-difference derivatives of the surface.

use ndarray::{Array2, ArrayView3};

use swell_core::{Real, SwellError, SwellResult};

/// Second-order derivative of `ζ` along one axis, evaluated on the spatial
/// slice at time index `idx_t`. Central differences in the interior,
/// one-sided three-point stencils at the borders:
///
/// ```text
/// f'_0 = (−f_2 + 4f_1 − 3f_0) / (2Δ)
/// f'_i = (f_{i+1} − f_{i−1}) / (2Δ)
/// f'_n = (3f_n − 4f_{n−1} + f_{n−2}) / (2Δ)
/// ```
pub fn derivative(
    zeta: ArrayView3<Real>,
    delta: [Real; 3],
    axis: usize,
    idx_t: usize,
) -> SwellResult<Array2<Real>> {
    debug_assert!(axis < 3);
    let extent = zeta.shape()[axis];
    if extent < 3 {
        return Err(SwellError::Validation(format!(
            "axis {axis} has {extent} points, need at least 3 for derivatives"
        )));
    }
    let step = delta[axis];
    if !(step > 0.0) {
        return Err(SwellError::Validation(format!(
            "axis {axis} has non-positive step {step}"
        )));
    }
    let nx = zeta.shape()[1];
    let ny = zeta.shape()[2];
    let half = 0.5 / step;
    let at = |mut idx: [usize; 3], offset: isize| -> Real {
        idx[axis] = (idx[axis] as isize + offset) as usize;
        zeta[idx]
    };
    let out = Array2::from_shape_fn((nx, ny), |(i, j)| {
        let idx = [idx_t, i, j];
        let d = idx[axis];
        if d == 0 {
            half * (-at(idx, 2) + 4.0 * at(idx, 1) - 3.0 * at(idx, 0))
        } else if d == extent - 1 {
            half * (3.0 * at(idx, 0) - 4.0 * at(idx, -1) + at(idx, -2))
        } else {
            half * (at(idx, 1) - at(idx, -1))
        }
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;

    #[test]
    fn linear_ramp_has_exact_derivative() {
        // ζ = 2t + 3x − y with unit steps.
        let zeta = Array3::from_shape_fn((5, 5, 5), |(t, x, y)| {
            2.0 * t as Real + 3.0 * x as Real - y as Real
        });
        for (axis, expected) in [(0, 2.0), (1, 3.0), (2, -1.0)] {
            let d = derivative(zeta.view(), [1.0, 1.0, 1.0], axis, 2).unwrap();
            for v in d.iter() {
                assert_abs_diff_eq!(*v, expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn quadratic_is_exact_including_borders() {
        // Second-order stencils differentiate x² exactly.
        let dx = 0.5;
        let zeta = Array3::from_shape_fn((3, 8, 3), |(_, x, _)| {
            let x = x as Real * dx;
            x * x
        });
        let d = derivative(zeta.view(), [1.0, dx, 1.0], 1, 0).unwrap();
        for (i, row) in d.outer_iter().enumerate() {
            let x = i as Real * dx;
            for v in row.iter() {
                assert_abs_diff_eq!(*v, 2.0 * x, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn short_axis_is_rejected() {
        let zeta = Array3::<Real>::zeros((2, 5, 5));
        assert!(derivative(zeta.view(), [1.0, 1.0, 1.0], 0, 0).is_err());
    }
}
