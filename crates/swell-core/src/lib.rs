//! # swell-core: data model and shared numerics
//!
//! Foundation crate of the swell workspace. Provides the scalar type, grids
//! and domains, discrete functions (dense arrays paired with a grid), sample
//! statistics, dense linear algebra, root finding and the special functions
//! used by the non-linear transform, plus the unified error type.
//!
//! The whole pipeline works on one scalar type [`Real`], fixed at build
//! time: `f64` by default, `f32` behind the `single-precision` feature.

pub mod bisection;
pub mod domain;
pub mod error;
pub mod function;
pub mod grid;
pub mod linalg;
pub mod math;
pub mod stats;
pub mod validate;

#[cfg(feature = "single-precision")]
pub type Real = f32;
#[cfg(not(feature = "single-precision"))]
pub type Real = f64;

pub use bisection::{bisection, Bisection};
pub use domain::{Domain, Domain1, Domain2, Domain3};
pub use error::{SwellError, SwellResult};
pub use function::DiscreteFunction3;
pub use grid::{Grid, Grid1, Grid2, Grid3};
