//! Mixed autoregressive moving-average fit.
//!
//! The ACF window is split along each axis: the front slice feeds the AR
//! sub-fit, the back slice the MA sub-fit. The order vectors of the two
//! parts sum componentwise.

use ndarray::{s, Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use swell_core::{Real, SwellError, SwellResult};

use crate::ar::{ArFit, ArSolver};
use crate::ma::{MaFit, MaSolver};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArmaSolver {
    pub ar: ArSolver,
    pub ma: MaSolver,
}

/// A fitted ARMA process.
#[derive(Debug, Clone)]
pub struct ArmaFit {
    pub ar: ArFit,
    pub ma: MaFit,
    /// Combined white-noise variance
    /// `σ²_α = σ²_AR · σ²_MA / acf(0,0,0)`.
    pub var_wn: Real,
}

impl ArmaSolver {
    pub fn order(&self) -> [usize; 3] {
        [
            self.ar.order[0] + self.ma.order[0],
            self.ar.order[1] + self.ma.order[1],
            self.ar.order[2] + self.ma.order[2],
        ]
    }

    pub fn fit(&self, acf: ArrayView3<Real>) -> SwellResult<ArmaFit> {
        let shape = acf.shape();
        let order = self.order();
        for axis in 0..3 {
            if order[axis] > shape[axis] {
                return Err(SwellError::Validation(format!(
                    "ARMA order {order:?} is larger than ACF size {shape:?}"
                )));
            }
        }
        let ar_acf = slice_front(acf, self.ar.order);
        let ma_acf = slice_back(acf, self.ma.order);
        let ar_fit = self.ar.fit(ar_acf.view())?;
        debug!(var_ar = ar_fit.var_wn, "AR part is stationary");
        let ma_fit = self.ma.fit(ma_acf.view())?;
        debug!(var_ma = ma_fit.var_wn, "MA part is invertible");
        let var_wn = ar_fit.var_wn * ma_fit.var_wn / acf[[0, 0, 0]];
        Ok(ArmaFit {
            ar: ar_fit,
            ma: ma_fit,
            var_wn,
        })
    }
}

/// The leading `amount` lags along each axis.
pub fn slice_front(acf: ArrayView3<Real>, amount: [usize; 3]) -> Array3<Real> {
    acf.slice(s![0..amount[0], 0..amount[1], 0..amount[2]])
        .to_owned()
}

/// The trailing `amount` lags along each axis.
pub fn slice_back(acf: ArrayView3<Real>, amount: [usize; 3]) -> Array3<Real> {
    let shape = acf.shape();
    acf.slice(s![
        shape[0] - amount[0]..,
        shape[1] - amount[1]..,
        shape[2] - amount[2]..
    ])
    .to_owned()
}

/// Adjust an ACF for the MA part given fitted AR coefficients, so that the
/// MA sub-fit targets the covariance left unexplained by the AR recursion.
pub fn recompute_acf(
    acf_orig: ArrayView3<Real>,
    phi: ArrayView3<Real>,
    ma_order: [usize; 3],
) -> Array3<Real> {
    let ar_order = phi.dim();
    let sum_phi_sq: Real = phi.iter().map(|v| v * v).sum();
    let acf_at = |i: isize, j: isize, k: isize| -> Real {
        let shape = acf_orig.shape();
        let (i, j, k) = (i.unsigned_abs(), j.unsigned_abs(), k.unsigned_abs());
        if i < shape[0] && j < shape[1] && k < shape[2] {
            acf_orig[[i, j, k]]
        } else {
            0.0
        }
    };
    let mut out = Array3::zeros((ma_order[0], ma_order[1], ma_order[2]));
    for i in 0..ma_order[0] {
        for j in 0..ma_order[1] {
            for k in 0..ma_order[2] {
                let mut cross = 0.0;
                for l in 0..ar_order.0 {
                    for m in 0..ar_order.1 {
                        for n in 0..ar_order.2 {
                            let mut pair = 0.0;
                            for l2 in l..ar_order.0 {
                                for m2 in m..ar_order.1 {
                                    for n2 in n..ar_order.2 {
                                        pair += phi[[l2 - l, m2 - m, n2 - n]]
                                            * phi[[l2, m2, n2]];
                                    }
                                }
                            }
                            let plus = acf_at(
                                (i + l) as isize,
                                (j + m) as isize,
                                (k + n) as isize,
                            );
                            let minus = acf_at(
                                i as isize - l as isize,
                                j as isize - m as isize,
                                k as isize - n as isize,
                            );
                            cross += pair * (plus + minus);
                        }
                    }
                }
                out[[i, j, k]] = sum_phi_sq * acf_at(i as isize, j as isize, k as isize) + cross;
            }
        }
    }
    out
}
