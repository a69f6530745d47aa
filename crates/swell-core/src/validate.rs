//! Parameter validators shared by the config layer and the solvers.

use ndarray::{ArrayBase, Data, Dimension};

use crate::error::{SwellError, SwellResult};
use crate::Real;

pub fn validate_positive(value: Real, name: &str) -> SwellResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(SwellError::Validation(format!("bad \"{name}\": {value}")))
    }
}

pub fn validate_finite(value: Real, name: &str) -> SwellResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SwellError::Validation(format!("bad \"{name}\": {value}")))
    }
}

pub fn validate_shape<const N: usize>(shape: [usize; N], name: &str) -> SwellResult<()> {
    if shape.iter().all(|&n| n > 0) {
        Ok(())
    } else {
        Err(SwellError::Validation(format!("bad \"{name}\": {shape:?}")))
    }
}

pub fn validate_all_finite<S, D>(a: &ArrayBase<S, D>, name: &str) -> SwellResult<()>
where
    S: Data<Elem = Real>,
    D: Dimension,
{
    if a.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SwellError::Validation(format!(
            "bad \"{name}\": non-finite values"
        )))
    }
}
