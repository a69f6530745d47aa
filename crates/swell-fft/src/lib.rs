//! # swell-fft: spectral machinery
//!
//! Complex-to-complex FFTs applied axis by axis to dense tensors, and the
//! overlap-add convolution engine used by the moving-average generator and
//! the empirical auto-covariance estimator.

pub mod convolution;
pub mod fourier;

pub use convolution::Convolution;
pub use fourier::{complex_to_real, fft_freq, real_to_complex, Cmplx, FourierTransform};
