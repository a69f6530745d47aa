//! Bisection root finding.

use serde::{Deserialize, Serialize};

use crate::Real;

/// Solve `f(x) = 0` on `[a, b]` by bisection.
///
/// `eps` bounds both the final interval width and the residual magnitude.
pub fn bisection<F>(mut a: Real, mut b: Real, mut func: F, eps: Real, max_iter: usize) -> Real
where
    F: FnMut(Real) -> Real,
{
    let mut c = 0.5 * (a + b);
    for _ in 0..max_iter {
        c = 0.5 * (a + b);
        let fc = func(c);
        if func(a) * fc < 0.0 {
            b = c;
        }
        if func(b) * fc < 0.0 {
            a = c;
        }
        if (b - a) <= eps || fc.abs() <= eps {
            break;
        }
    }
    c
}

/// A configured bisection solver: interval, tolerance and iteration cap.
///
/// The NIT transform uses two of these, one for CDF inversion and one for
/// the ACF correction equation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bisection {
    a: Real,
    b: Real,
    eps: Real,
    max_iter: usize,
}

impl Bisection {
    pub fn new(a: Real, b: Real, eps: Real, max_iter: usize) -> Self {
        Self { a, b, eps, max_iter }
    }

    pub fn interval(&self) -> (Real, Real) {
        (self.a, self.b)
    }

    pub fn set_interval(&mut self, a: Real, b: Real) {
        self.a = a;
        self.b = b;
    }

    pub fn eps(&self) -> Real {
        self.eps
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn solve<F>(&self, func: F) -> Real
    where
        F: FnMut(Real) -> Real,
    {
        bisection(self.a, self.b, func, self.eps, self.max_iter)
    }
}

impl Default for Bisection {
    fn default() -> Self {
        Self::new(0.0, 1.0, 1e-6, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn finds_square_root_of_two() {
        let root = bisection(0.0, 2.0, |x| x * x - 2.0, 1e-10, 100);
        assert_abs_diff_eq!(root, std::f64::consts::SQRT_2 as Real, epsilon = 1e-8);
    }

    #[test]
    fn solver_config_round_trip() {
        let solver = Bisection::new(-4.0, 4.0, 1e-8, 60);
        let root = solver.solve(|x| x - 1.5);
        assert_abs_diff_eq!(root, 1.5, epsilon = 1e-6);
    }
}
