//! Sample statistics over array views.

use ndarray::{ArrayBase, Data, Dimension};

use crate::Real;

pub fn mean<S, D>(a: &ArrayBase<S, D>) -> Real
where
    S: Data<Elem = Real>,
    D: Dimension,
{
    let n = a.len();
    if n == 0 {
        return 0.0;
    }
    a.iter().sum::<Real>() / n as Real
}

/// Unbiased sample variance (n − 1 denominator).
pub fn variance<S, D>(a: &ArrayBase<S, D>) -> Real
where
    S: Data<Elem = Real>,
    D: Dimension,
{
    let n = a.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(a);
    a.iter().map(|&x| (x - m) * (x - m)).sum::<Real>() / (n - 1) as Real
}

pub fn stdev<S, D>(a: &ArrayBase<S, D>) -> Real
where
    S: Data<Elem = Real>,
    D: Dimension,
{
    variance(a).sqrt()
}

/// Sample skewness, `E[(x−μ)³]/σ³`.
pub fn skewness<S, D>(a: &ArrayBase<S, D>) -> Real
where
    S: Data<Elem = Real>,
    D: Dimension,
{
    let n = a.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(a);
    let sd = stdev(a);
    if sd == 0.0 {
        return 0.0;
    }
    a.iter()
        .map(|&x| {
            let d = (x - m) / sd;
            d * d * d
        })
        .sum::<Real>()
        / n as Real
}

/// Excess kurtosis, `E[(x−μ)⁴]/σ⁴ − 3`.
pub fn kurtosis<S, D>(a: &ArrayBase<S, D>) -> Real
where
    S: Data<Elem = Real>,
    D: Dimension,
{
    let n = a.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(a);
    let sd = stdev(a);
    if sd == 0.0 {
        return 0.0;
    }
    a.iter()
        .map(|&x| {
            let d = (x - m) / sd;
            d * d * d * d
        })
        .sum::<Real>()
        / n as Real
        - 3.0
}
