//! # swell-model: ACF construction and process fitting
//!
//! Builds discrete auto-covariance functions (analytic families or the
//! empirical plain-wave generator) and fits AR, MA and mixed ARMA process
//! coefficients whose covariance matches them. Also hosts the non-linear
//! inertialess transform that imposes non-Gaussian marginals while keeping
//! the second-order structure intact.
//!
//! The solvers own nothing: they borrow an ACF view and return plain
//! coefficient arrays, so a single pipeline owner can hand data forward
//! without back-references.

pub mod acf;
pub mod acf_generator;
pub mod acv;
pub mod ar;
pub mod arma;
pub mod ma;
pub mod nit;
pub mod plain_wave;

pub use acf::{acf_function, acf_variance, AcfParams};
pub use acf_generator::AcfGenerator;
pub use acv::auto_covariance;
pub use ar::{ArAlgorithm, ArFit, ArSolver};
pub use arma::{ArmaFit, ArmaSolver};
pub use ma::{MaAlgorithm, MaFit, MaSolver};
pub use nit::NitTransform;
pub use plain_wave::{PlainWaveModel, PlainWaveProfile, Wave};
