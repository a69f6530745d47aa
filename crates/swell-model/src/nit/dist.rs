//! Target marginal distributions for the inertialess transform.

use serde::{Deserialize, Serialize};

use swell_core::math::{erf, owen_t};
use swell_core::Real;

const SQRT_2: Real = std::f64::consts::SQRT_2 as Real;

/// Normal distribution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Gaussian {
    pub mean: Real,
    pub stdev: Real,
}

impl Gaussian {
    pub fn new(mean: Real, stdev: Real) -> Self {
        Self { mean, stdev }
    }

    pub fn cdf(&self, x: Real) -> Real {
        0.5 * (1.0 + erf((x - self.mean) / (self.stdev * SQRT_2)))
    }
}

/// Skew-normal distribution; skewness and kurtosis are controlled by the
/// single shape parameter `alpha`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SkewNormal {
    pub mean: Real,
    pub stdev: Real,
    pub alpha: Real,
}

impl SkewNormal {
    pub fn cdf(&self, x: Real) -> Real {
        let gaussian = Gaussian::new(self.mean, self.stdev);
        gaussian.cdf(x) - 2.0 * owen_t((x - self.mean) / self.stdev, self.alpha)
    }
}

/// Gram–Charlier series approximation of a skewed normal distribution with
/// configurable skewness and kurtosis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GramCharlier {
    pub skewness: Real,
    pub kurtosis: Real,
}

impl GramCharlier {
    pub fn cdf(&self, x: Real) -> Real {
        let sqrt_2pi = (2.0 * std::f64::consts::PI as Real).sqrt();
        (-0.5 * x * x).exp()
            * (self.kurtosis * (3.0 * x - x * x * x) + self.skewness * (4.0 - 4.0 * x * x)
                + 3.0 * x * x * x
                - 9.0 * x)
            / (24.0 * sqrt_2pi)
            + 0.5 * erf(x / SQRT_2)
            + 0.5
    }
}

/// Target distribution selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TargetDistribution {
    GramCharlier(GramCharlier),
    SkewNormal(SkewNormal),
}

impl TargetDistribution {
    pub fn cdf(&self, x: Real) -> Real {
        match self {
            TargetDistribution::GramCharlier(d) => d.cdf(x),
            TargetDistribution::SkewNormal(d) => d.cdf(x),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TargetDistribution::GramCharlier(_) => "gram_charlier",
            TargetDistribution::SkewNormal(_) => "skew_normal",
        }
    }
}
