//! FFT-based convolution with overlap-add block slicing.

use ndarray::{ArrayD, Slice};
use rayon::prelude::*;

use swell_core::{SwellError, SwellResult};

use crate::fourier::{Cmplx, FourierTransform};

/// Multidimensional convolution based on the Fourier transform.
///
/// The signal is sliced into blocks of `block_size` points along one chosen
/// dimension; kernel and blocks are zero-padded to `block_size + padding`,
/// multiplied in the spectral domain and accumulated back with the overlap
/// summed into the adjacent block. Along the remaining dimensions the
/// transform length equals the kernel shape, so indexing is periodic there.
///
/// For a full linear convolution along the sliced dimension, `padding` must
/// be at least the kernel extent minus one.
pub struct Convolution {
    fft: FourierTransform,
    dimension: usize,
    block_size: usize,
    padding: usize,
}

impl Convolution {
    pub fn new(
        kernel_shape: &[usize],
        dimension: usize,
        block_size: usize,
        padding: usize,
    ) -> SwellResult<Self> {
        if dimension >= kernel_shape.len() {
            return Err(SwellError::Validation(format!(
                "convolution dimension {dimension} out of range for rank {}",
                kernel_shape.len()
            )));
        }
        if block_size == 0 {
            return Err(SwellError::Validation("bad block size".into()));
        }
        let mut padded = kernel_shape.to_vec();
        padded[dimension] = block_size + padding;
        Ok(Self {
            fft: FourierTransform::new(&padded),
            dimension,
            block_size,
            padding,
        })
    }

    /// Padded block shape: the kernel shape with the sliced dimension
    /// replaced by `block_size + padding`.
    pub fn padded_shape(&self) -> &[usize] {
        self.fft.shape()
    }

    pub fn convolve(
        &self,
        signal: &ArrayD<Cmplx>,
        kernel: &ArrayD<Cmplx>,
    ) -> SwellResult<ArrayD<Cmplx>> {
        let dim = self.dimension;
        let padded = self.padded_shape();
        if kernel.ndim() != padded.len()
            || kernel
                .shape()
                .iter()
                .zip(padded)
                .any(|(&k, &p)| k > p)
        {
            return Err(SwellError::Validation(format!(
                "kernel shape {:?} does not fit padded block {:?}",
                kernel.shape(),
                padded
            )));
        }
        for (axis, (&s, &p)) in signal.shape().iter().zip(padded).enumerate() {
            if axis != dim && s != p {
                return Err(SwellError::Validation(format!(
                    "signal shape {:?} does not match transform shape {:?} on axis {axis}",
                    signal.shape(),
                    padded
                )));
            }
        }
        let limit = signal.shape()[dim];
        if self.block_size + self.padding > limit {
            return Err(SwellError::Validation(
                "block size plus padding exceeds the signal extent".into(),
            ));
        }

        // Forward transform of the zero-padded kernel, once.
        let mut padded_kernel = ArrayD::<Cmplx>::zeros(padded.to_vec());
        padded_kernel
            .slice_each_axis_mut(|ad| Slice::from(0..kernel.shape()[ad.axis().index()]))
            .assign(kernel);
        self.fft.forward(&mut padded_kernel);
        let scale = 1.0 / self.fft.len() as swell_core::Real;

        let bs = self.block_size;
        let nparts = limit / bs + usize::from(limit % bs != 0);

        // Transform blocks in parallel, then accumulate in block order so
        // the overlap sums are reproducible.
        let parts: Vec<(usize, usize, ArrayD<Cmplx>)> = (0..nparts)
            .into_par_iter()
            .map(|i| {
                let offset = i * bs;
                let end = (offset + bs).min(limit);
                let mut padded_part = ArrayD::<Cmplx>::zeros(padded.to_vec());
                padded_part
                    .slice_axis_mut(ndarray::Axis(dim), Slice::from(0..end - offset))
                    .assign(&signal.slice_axis(ndarray::Axis(dim), Slice::from(offset..end)));
                self.fft.forward(&mut padded_part);
                padded_part *= &padded_kernel;
                self.fft.backward(&mut padded_part);
                padded_part.mapv_inplace(|v| v * scale);
                let out_end = (end + self.padding).min(limit);
                (offset, out_end, padded_part)
            })
            .collect();

        let mut out = ArrayD::<Cmplx>::zeros(signal.raw_dim());
        for (offset, out_end, part) in parts {
            let mut dst = out.slice_axis_mut(ndarray::Axis(dim), Slice::from(offset..out_end));
            let src = part.slice_axis(ndarray::Axis(dim), Slice::from(0..out_end - offset));
            dst += &src;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array3};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use swell_core::Real;

    /// Causal direct convolution with zero boundary, the generator's view of
    /// an MA kernel applied to a noise field.
    fn direct_convolve_3d(signal: &Array3<Real>, kernel: &Array3<Real>) -> Array3<Real> {
        let (nt, nx, ny) = signal.dim();
        let (kt, kx, ky) = kernel.dim();
        let mut out = Array3::zeros((nt, nx, ny));
        for t in 0..nt {
            for x in 0..nx {
                for y in 0..ny {
                    let mut sum = 0.0;
                    for k in 0..kt.min(t + 1) {
                        for i in 0..kx.min(x + 1) {
                            for j in 0..ky.min(y + 1) {
                                sum += kernel[[k, i, j]] * signal[[t - k, x - i, y - j]];
                            }
                        }
                    }
                    out[[t, x, y]] = sum;
                }
            }
        }
        out
    }

    #[test]
    fn one_dimensional_blocks_match_direct_convolution() {
        let n = 64;
        let kernel_len = 5;
        let mut rng = StdRng::seed_from_u64(7);
        let signal = Array1::from_shape_fn(n, |_| rng.gen_range(-1.0..1.0) as Real);
        let kernel = Array1::from_shape_fn(kernel_len, |i| 0.5_f64.powi(i as i32) as Real);

        let conv = Convolution::new(&[kernel_len], 0, 16, kernel_len - 1).unwrap();
        let signal_c = signal.mapv(|v| Cmplx::new(v, 0.0)).into_dyn();
        let kernel_c = kernel.mapv(|v| Cmplx::new(v, 0.0)).into_dyn();
        let out = conv.convolve(&signal_c, &kernel_c).unwrap();

        for t in 0..n {
            let mut expect = 0.0;
            for k in 0..kernel_len.min(t + 1) {
                expect += kernel[k] * signal[t - k];
            }
            assert_abs_diff_eq!(out[[t]].re, expect, epsilon = 1e-9);
        }
    }

    #[test]
    fn three_dimensional_convolution_matches_direct_in_the_interior() {
        // Transform length equals the signal extent along x and y, so those
        // axes wrap; compare away from the wrap-affected border rows.
        let (nt, nx, ny) = (24, 8, 8);
        let kernel = {
            let mut k = Array3::zeros((3, 2, 2));
            k[[0, 0, 0]] = 1.0;
            k[[1, 0, 0]] = -0.4;
            k[[0, 1, 0]] = 0.2;
            k[[0, 0, 1]] = 0.1;
            k[[2, 1, 1]] = 0.05;
            k
        };
        let mut rng = StdRng::seed_from_u64(99);
        let signal = Array3::from_shape_fn((nt, nx, ny), |_| rng.gen_range(-1.0..1.0) as Real);

        let kernel_shape = vec![kernel.dim().0, nx, ny];
        let conv = Convolution::new(&kernel_shape, 0, 8, 2).unwrap();
        let out = conv
            .convolve(
                &signal.mapv(|v| Cmplx::new(v, 0.0)).into_dyn(),
                &kernel.mapv(|v| Cmplx::new(v, 0.0)).into_dyn(),
            )
            .unwrap();
        let direct = direct_convolve_3d(&signal, &kernel);

        for t in 0..nt {
            for x in 1..nx {
                for y in 1..ny {
                    assert_abs_diff_eq!(out[[t, x, y]].re, direct[[t, x, y]], epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn oversized_block_is_rejected() {
        let conv = Convolution::new(&[4], 0, 32, 4).unwrap();
        let signal = Array1::from_elem(16, Cmplx::new(1.0, 0.0)).into_dyn();
        let kernel = Array1::from_elem(4, Cmplx::new(1.0, 0.0)).into_dyn();
        assert!(conv.convolve(&signal, &kernel).is_err());
    }
}
