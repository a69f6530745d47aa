//! Axis-by-axis complex Fourier transform on dense tensors.

use std::sync::Arc;

use ndarray::{Array, ArrayBase, Axis, DataMut, Dimension};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use swell_core::Real;

pub type Cmplx = Complex<Real>;

/// Multidimensional complex-to-complex FFT.
///
/// One rustfft plan per axis; forward and inverse plans come from a shared
/// planner so twiddle tables are reused. Both directions are unnormalized:
/// a forward/backward round trip scales by [`FourierTransform::len`], and
/// callers divide where the algorithm requires it (the convolution engine
/// and the velocity solver both do).
pub struct FourierTransform {
    shape: Vec<usize>,
    forward: Vec<Arc<dyn Fft<Real>>>,
    inverse: Vec<Arc<dyn Fft<Real>>>,
}

impl FourierTransform {
    pub fn new(shape: &[usize]) -> Self {
        let mut planner = FftPlanner::new();
        let forward = shape
            .iter()
            .map(|&n| planner.plan_fft_forward(n))
            .collect();
        let inverse = shape
            .iter()
            .map(|&n| planner.plan_fft_inverse(n))
            .collect();
        Self {
            shape: shape.to_vec(),
            forward,
            inverse,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of elements; the scale factor of a round trip.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn forward<S, D>(&self, a: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = Cmplx>,
        D: Dimension,
    {
        self.transform(&self.forward, a);
    }

    pub fn backward<S, D>(&self, a: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = Cmplx>,
        D: Dimension,
    {
        self.transform(&self.inverse, a);
    }

    fn transform<S, D>(&self, plans: &[Arc<dyn Fft<Real>>], a: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = Cmplx>,
        D: Dimension,
    {
        assert_eq!(
            a.shape(),
            self.shape.as_slice(),
            "array shape does not match transform shape"
        );
        for (axis, plan) in plans.iter().enumerate() {
            let n = self.shape[axis];
            if n < 2 {
                continue;
            }
            let mut buf = vec![Cmplx::default(); n];
            let mut scratch = vec![Cmplx::default(); plan.get_inplace_scratch_len()];
            for mut lane in a.lanes_mut(Axis(axis)) {
                for (b, v) in buf.iter_mut().zip(lane.iter()) {
                    *b = *v;
                }
                plan.process_with_scratch(&mut buf, &mut scratch);
                for (v, b) in lane.iter_mut().zip(buf.iter()) {
                    *v = *b;
                }
            }
        }
    }
}

/// Unnormalized DFT frequency of bin `i` out of `n` samples spaced `delta`
/// apart: `i/(n·delta)` for the positive half, negative mirror above `n/2`.
pub fn fft_freq(i: usize, n: usize, delta: Real) -> Real {
    let i = i as isize;
    let n_i = n as isize;
    let signed = if i <= n_i / 2 { i } else { i - n_i };
    signed as Real / (n as Real * delta)
}

pub fn real_to_complex<D: Dimension>(a: &Array<Real, D>) -> Array<Cmplx, D> {
    a.mapv(|v| Cmplx::new(v, 0.0))
}

pub fn complex_to_real<D: Dimension>(a: &Array<Cmplx, D>) -> Array<Real, D> {
    a.mapv(|v| v.re)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    #[test]
    fn round_trip_scales_by_len() {
        let shape = [4, 8];
        let fft = FourierTransform::new(&shape);
        let orig = Array2::from_shape_fn((4, 8), |(i, j)| {
            Cmplx::new((i as Real * 0.7).sin(), (j as Real * 0.3).cos())
        });
        let mut a = orig.clone();
        fft.forward(&mut a);
        fft.backward(&mut a);
        let scale = fft.len() as Real;
        for (x, y) in a.iter().zip(orig.iter()) {
            assert_abs_diff_eq!(x.re / scale, y.re, epsilon = 1e-10);
            assert_abs_diff_eq!(x.im / scale, y.im, epsilon = 1e-10);
        }
    }

    #[test]
    fn single_mode_lands_in_one_bin() {
        let n = 16;
        let fft = FourierTransform::new(&[n]);
        let mut a = ndarray::Array1::from_shape_fn(n, |i| {
            let phase = 2.0 * std::f64::consts::PI as Real * 3.0 * i as Real / n as Real;
            Cmplx::new(phase.cos(), 0.0)
        });
        fft.forward(&mut a);
        // cos splits into bins 3 and n−3, each of magnitude n/2
        assert_abs_diff_eq!(a[3].re, n as Real / 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a[n - 3].re, n as Real / 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a[0].re, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn fft_freq_mirrors_negative_half() {
        assert_abs_diff_eq!(fft_freq(0, 8, 1.0), 0.0);
        assert_abs_diff_eq!(fft_freq(1, 8, 1.0), 0.125);
        assert_abs_diff_eq!(fft_freq(7, 8, 1.0), -0.125);
        assert_abs_diff_eq!(fft_freq(4, 8, 0.5), 1.0);
    }
}
