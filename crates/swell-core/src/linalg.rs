//! Dense linear algebra for the coefficient solvers.
//!
//! Thin wrappers around faer decompositions working on ndarray storage. All
//! factorizations run in `f64` regardless of the crate-wide [`Real`] type;
//! the systems involved are small (products of model orders).

use faer::{prelude::SpSolver, solvers::PartialPivLu, FaerMat, Mat, Side};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{SwellError, SwellResult};
use crate::Real;

fn to_faer(a: ArrayView2<Real>) -> Mat<f64> {
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]] as f64)
}

fn rhs_to_faer(b: ArrayView1<Real>) -> Mat<f64> {
    Mat::from_fn(b.len(), 1, |i, _| b[i] as f64)
}

fn from_faer_col(sol: &Mat<f64>) -> Array1<Real> {
    Array1::from_shape_fn(sol.nrows(), |i| sol.read(i, 0) as Real)
}

/// Solve the symmetric positive-definite system `A x = b` via Cholesky.
///
/// Failure of the factorization means `A` is not SPD, which for an
/// autocovariance matrix is the symptom of a non-realizable ACF.
pub fn cholesky_solve(a: ArrayView2<Real>, b: ArrayView1<Real>) -> SwellResult<Array1<Real>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return Err(SwellError::Validation(format!(
            "cholesky: shape mismatch {}x{} vs rhs {}",
            a.nrows(),
            a.ncols(),
            b.len()
        )));
    }
    let mat = to_faer(a);
    let llt = mat.cholesky(Side::Lower).map_err(|_| {
        SwellError::NotPositiveDefinite(format!("{n}x{n} system failed Cholesky factorization"))
    })?;
    let sol = llt.solve(&rhs_to_faer(b));
    Ok(from_faer_col(&sol))
}

/// Solve a general dense system `A x = b` via LU with partial pivoting.
pub fn lu_solve(a: ArrayView2<Real>, b: ArrayView1<Real>) -> SwellResult<Array1<Real>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return Err(SwellError::Validation(format!(
            "lu: shape mismatch {}x{} vs rhs {}",
            a.nrows(),
            a.ncols(),
            b.len()
        )));
    }
    let mat = to_faer(a);
    let lu = PartialPivLu::new(mat.as_ref());
    let sol = lu.solve(&rhs_to_faer(b));
    let x = from_faer_col(&sol);
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SwellError::Other(format!("singular {n}x{n} system")));
    }
    Ok(x)
}

pub fn is_symmetric(a: ArrayView2<Real>) -> bool {
    let n = a.nrows();
    if a.ncols() != n {
        return false;
    }
    let scale = a.iter().fold(0.0 as Real, |acc, v| acc.max(v.abs()));
    let tol = scale * 1e-8 + 1e-12;
    for i in 0..n {
        for j in (i + 1)..n {
            if (a[[i, j]] - a[[j, i]]).abs() > tol {
                return false;
            }
        }
    }
    true
}

/// Cholesky probe.
pub fn is_positive_definite(a: ArrayView2<Real>) -> bool {
    a.nrows() == a.ncols() && to_faer(a).cholesky(Side::Lower).is_ok()
}

/// Reduce an over-determined system `P x ≈ b` to its normal equations
/// `(PᵀP) x = Pᵀb`.
pub fn least_squares(p: ArrayView2<Real>, b: ArrayView1<Real>) -> (Array2<Real>, Array1<Real>) {
    let (m, n) = (p.nrows(), p.ncols());
    let mut ata = Array2::zeros((n, n));
    let mut atb = Array1::zeros(n);
    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..m {
                sum += p[[k, i]] * p[[k, j]];
            }
            ata[[i, j]] = sum;
        }
        let mut sum = 0.0;
        for k in 0..m {
            sum += p[[k, i]] * b[k];
        }
        atb[i] = sum;
    }
    (ata, atb)
}

/// Least-squares polynomial fit of degree `order`; returns coefficients in
/// ascending powers.
pub fn polyfit(x: &[Real], y: &[Real], order: usize) -> SwellResult<Array1<Real>> {
    let m = x.len();
    if m != y.len() || m <= order {
        return Err(SwellError::Validation(format!(
            "polyfit: {m} nodes cannot determine order {order}"
        )));
    }
    let ncoef = order + 1;
    let mut vander = Array2::zeros((m, ncoef));
    for k in 0..m {
        let mut pow = 1.0;
        for i in 0..ncoef {
            vander[[k, i]] = pow;
            pow *= x[k];
        }
    }
    let (ata, atb) = least_squares(vander.view(), ArrayView1::from(y));
    lu_solve(ata.view(), atb.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn cholesky_solves_spd_system() {
        let a = arr2(&[[4.0, 2.0, 0.6], [2.0, 5.0, 1.0], [0.6, 1.0, 3.0]]);
        let b = arr1(&[1.0, 2.0, 3.0]);
        let x = cholesky_solve(a.view(), b.view()).unwrap();
        for i in 0..3 {
            let mut sum = 0.0;
            for j in 0..3 {
                sum += a[[i, j]] * x[j];
            }
            assert_relative_eq!(sum, b[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn cholesky_rejects_indefinite_matrix() {
        let a = arr2(&[[1.0, 2.0], [2.0, 1.0]]);
        let b = arr1(&[1.0, 1.0]);
        let err = cholesky_solve(a.view(), b.view()).unwrap_err();
        assert!(matches!(err, SwellError::NotPositiveDefinite(_)));
    }

    #[test]
    fn lu_solves_general_system() {
        let a = arr2(&[[0.0, 2.0], [3.0, 1.0]]);
        let b = arr1(&[2.0, 5.0]);
        let x = lu_solve(a.view(), b.view()).unwrap();
        assert_relative_eq!(x[0], 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn symmetry_probe() {
        let a = arr2(&[[1.0, 2.0], [2.0, 3.0]]);
        assert!(is_symmetric(a.view()));
        assert!(is_positive_definite(arr2(&[[2.0, 0.0], [0.0, 1.0]]).view()));
        assert!(!is_positive_definite(arr2(&[[1.0, 2.0], [2.0, 1.0]]).view()));
    }

    #[test]
    fn polyfit_recovers_quadratic() {
        let x: Vec<Real> = (0..10).map(|i| i as Real * 0.5).collect();
        let y: Vec<Real> = x.iter().map(|&v| 1.0 + 2.0 * v - 0.5 * v * v).collect();
        let c = polyfit(&x, &y, 2).unwrap();
        assert_relative_eq!(c[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(c[1], 2.0, epsilon = 1e-8);
        assert_relative_eq!(c[2], -0.5, epsilon = 1e-8);
    }
}
