//! Unified error types for the swell workspace
//!
//! This module provides a common error type [`SwellError`] that can represent
//! failures from any stage of the simulation pipeline. Stage-specific code
//! converts into `SwellError` at API boundaries so the driver can report a
//! single diagnostic and exit non-zero.

use thiserror::Error;

/// Unified error type for all swell operations.
///
/// Covers the whole failure taxonomy of the pipeline: configuration problems
/// are reported before any heavy computation, numerical failures carry enough
/// context to diagnose the offending fit or solve.
#[derive(Error, Debug)]
pub enum SwellError {
    /// I/O errors (config files, PRNG pool, output writers)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (unknown key, missing parameter, bad value)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation errors (non-finite values, non-positive shapes)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The auto-covariance matrix is not symmetric positive definite,
    /// so no autoregressive process can realize the requested ACF.
    #[error("Auto-covariance matrix is not positive definite: {0}")]
    NotPositiveDefinite(String),

    /// A fitted process has coefficients outside the unit hypercube.
    #[error("Process is not stationary: max |{coefficient}| = {magnitude}")]
    NonStationary {
        coefficient: &'static str,
        magnitude: f64,
    },

    /// An iterative solver produced non-finite coefficients, collapsed the
    /// white-noise variance, or hit the iteration cap without converging.
    #[error("Iteration failure: {0}")]
    IterationFailure(String),

    /// Fewer independent PRNG streams than partitions.
    #[error(
        "PRNG pool exhausted: {available} configurations available, \
         {required} partitions require one stream each"
    )]
    PrngPoolExhausted { available: usize, required: usize },

    /// Non-finite spectral multiplier in the velocity-potential solve.
    #[error("Numerical singularity: {0}")]
    NumericalSingularity(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using SwellError.
pub type SwellResult<T> = Result<T, SwellError>;

impl From<anyhow::Error> for SwellError {
    fn from(err: anyhow::Error) -> Self {
        SwellError::Other(err.to_string())
    }
}

impl From<String> for SwellError {
    fn from(s: String) -> Self {
        SwellError::Other(s)
    }
}

impl From<&str> for SwellError {
    fn from(s: &str) -> Self {
        SwellError::Other(s.to_string())
    }
}
