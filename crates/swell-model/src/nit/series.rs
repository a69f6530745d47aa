//! Gram–Charlier expansion of a polynomial transform.

use swell_core::math::{factorial, hermite_polynomial, Polynomial};
use swell_core::Real;

/// Expand a polynomial transform `y(x)` into Gram–Charlier series
/// coefficients `C_m = E[y(X)·He_m(X)]` under a standard normal `X`,
/// using the moment identity `E[Xⁱ] = (i−1)!!` for even `i`.
///
/// The series length is trimmed to the order minimizing
/// `|Σ C_m²/m! − γ₀|`, the variance mismatch of the transformed process.
/// Returns the trimmed coefficients and that minimal error.
pub fn gram_charlier_expand(
    transform: &Polynomial,
    order: usize,
    acf_variance: Real,
) -> (Vec<Real>, Real) {
    let mut c = vec![0.0; order];
    let mut sum_c = 0.0;
    let mut fact = 1.0;
    let mut err = Real::MAX;
    let mut trim = 0;
    for m in 0..order {
        let y = transform * &hermite_polynomial(m);
        let mut sum2 = y.coef(0);
        let mut i = 2;
        while i <= y.order() {
            sum2 += y.coef(i) * factorial((i - 1) as Real, 2.0);
            i += 2;
        }
        c[m] = sum2;
        sum_c += c[m] * c[m] / fact;
        fact *= (m + 1) as Real;
        let e = (acf_variance - sum_c).abs();
        if e < err {
            err = e;
            trim = m + 1;
        }
    }
    c.truncate(trim);
    (c, err)
}

/// Left-hand side of the ACF correction equation at `x`:
/// `Σ c_n² xⁿ / n!`.
pub fn series_sum(coefs: &[Real], x: Real) -> Real {
    let mut sum = 0.0;
    let mut fact = 1.0;
    let mut power = 1.0;
    for (i, &c) in coefs.iter().enumerate() {
        sum += c * c * power / fact;
        fact *= (i + 1) as Real;
        power *= x;
    }
    sum
}
