//! Non-linear inertialess transform (NIT).
//!
//! A monotone pointwise map applied to surface elevations to reshape the
//! marginal distribution, paired with an ACF pre-correction that keeps the
//! covariance of the transformed process equal to the requested one.

pub mod dist;
pub mod series;
pub mod transform;

pub use dist::{Gaussian, GramCharlier, SkewNormal, TargetDistribution};
pub use transform::NitTransform;
