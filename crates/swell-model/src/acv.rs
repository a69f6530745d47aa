//! Auto-covariance estimation of a 3-D field.

use ndarray::Array3;
use num_complex::Complex;

use swell_core::Real;
use swell_fft::FourierTransform;

/// Lag-product auto-covariance estimator with periodic indexing:
///
/// `γ(h) = (1/n) Σ_p ζ(p) · ζ((p+h) mod n)`
///
/// No mean subtraction, no variance normalization; the field is assumed
/// symmetric in each dimension. Computed through the Wiener–Khinchin
/// identity: the inverse transform of the power spectrum, rescaled for the
/// unnormalized backward FFT and the `1/n` of the estimator.
pub fn auto_covariance(field: &Array3<Real>) -> Array3<Real> {
    let shape = field.dim();
    let mut spectrum = field.mapv(|v| Complex::new(v, 0.0));
    let fft = FourierTransform::new(&[shape.0, shape.1, shape.2]);
    fft.forward(&mut spectrum);
    spectrum.mapv_inplace(|v| Complex::new(v.norm_sqr(), 0.0));
    fft.backward(&mut spectrum);
    let n = fft.len() as Real;
    spectrum.mapv(|v| v.re / (n * n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn direct_auto_covariance(field: &Array3<Real>) -> Array3<Real> {
        let (n0, n1, n2) = field.dim();
        let mut out = Array3::zeros((n0, n1, n2));
        for i in 0..n0 {
            for j in 0..n1 {
                for k in 0..n2 {
                    let mut sum = 0.0;
                    for a in 0..n0 {
                        for b in 0..n1 {
                            for c in 0..n2 {
                                sum += field[[a, b, c]]
                                    * field[[(a + i) % n0, (b + j) % n1, (c + k) % n2]];
                            }
                        }
                    }
                    out[[i, j, k]] = sum / (n0 * n1 * n2) as Real;
                }
            }
        }
        out
    }

    #[test]
    fn matches_direct_lag_products() {
        let mut rng = StdRng::seed_from_u64(42);
        let field = Array3::from_shape_fn((6, 5, 4), |_| rng.gen_range(-1.0..1.0) as Real);
        let fast = auto_covariance(&field);
        let direct = direct_auto_covariance(&field);
        for (a, b) in fast.iter().zip(direct.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn zero_lag_is_mean_square() {
        let mut rng = StdRng::seed_from_u64(5);
        let field = Array3::from_shape_fn((8, 4, 4), |_| rng.gen_range(-2.0..2.0) as Real);
        let acv = auto_covariance(&field);
        let ms = field.iter().map(|v| v * v).sum::<Real>() / field.len() as Real;
        assert_abs_diff_eq!(acv[[0, 0, 0]], ms, epsilon = 1e-10);
    }
}
