//! Plane interpolation through three grid points.

use ndarray::ArrayView2;

use swell_core::Real;

/// Fit the plane `f(x, y) = a·x + b·y + c` through three grid points of a
/// 2-D field and evaluate it at `target`. Used to patch singular spectrum
/// bins from their neighbors.
pub fn interpolate(
    p1: [usize; 2],
    p2: [usize; 2],
    p3: [usize; 2],
    f: ArrayView2<Real>,
    target: [usize; 2],
) -> Real {
    let (x1, y1) = (p1[0] as Real, p1[1] as Real);
    let (x2, y2) = (p2[0] as Real, p2[1] as Real);
    let (x3, y3) = (p3[0] as Real, p3[1] as Real);
    let (f1, f2, f3) = (f[p1], f[p2], f[p3]);
    let denom = x2 * y1 - x3 * y1 - x1 * y2 + x3 * y2 + x1 * y3 - x2 * y3;
    if denom == 0.0 {
        // Degenerate triangle; fall back to the mean of the three values.
        return (f1 + f2 + f3) / 3.0;
    }
    let a = (f2 * y1 - f3 * y1 - f1 * y2 + f3 * y2 + f1 * y3 - f2 * y3) / denom;
    let b = -(f3 * (x2 - x1) + f2 * (x1 - x3) + f1 * (x3 - x2)) / denom;
    let c = (f3 * x2 * y1 - f2 * x3 * y1 - f3 * x1 * y2 + f1 * x3 * y2 + f2 * x1 * y3
        - f1 * x2 * y3)
        / denom;
    let (tx, ty) = (target[0] as Real, target[1] as Real);
    a * tx + b * ty + c
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    #[test]
    fn planar_field_extrapolates_exactly() {
        // f = 2x − y + 3 is planar, so the fitted plane reproduces it.
        let f = Array2::from_shape_fn((4, 4), |(x, y)| 2.0 * x as Real - y as Real + 3.0);
        let value = interpolate([1, 1], [1, 2], [2, 1], f.view(), [0, 0]);
        assert_abs_diff_eq!(value, 3.0, epsilon = 1e-12);
        let value = interpolate([1, 1], [1, 2], [2, 1], f.view(), [0, 3]);
        assert_abs_diff_eq!(value, 0.0, epsilon = 1e-12);
        let value = interpolate([1, 1], [1, 2], [2, 1], f.view(), [3, 0]);
        assert_abs_diff_eq!(value, 9.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_fall_back_to_mean() {
        let f = Array2::from_elem((4, 4), 7.0);
        let value = interpolate([0, 0], [1, 1], [2, 2], f.view(), [3, 3]);
        assert_abs_diff_eq!(value, 7.0, epsilon = 1e-12);
    }
}
