//! Closed form ridge regression over a fixed set of penalties

#[macro_use]
extern crate log;

use nalgebra::{DMatrix, RealField};

mod error;
mod loss;
mod tikhonov_regularization;

pub use error::LinRegError;
pub use loss::RidgeEvaluation;
pub use tikhonov_regularization::{RidgeCofactor, TikhonovRegularization};

/// Scalar type in which design matrices and targets are stored.
/// Implemented for `f32` and `f64`.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

/// Generic way of solving the target independent part of a regularized linear regression
pub trait LinReg<T: Real> {
    /// Compute `(XᵀX + λI)⁻¹Xᵀ` for every penalty of this regressor
    ///
    /// # Parameters
    /// design: Training design matrix, rows are trials and columns are features
    fn cofactor(&self, design: &DMatrix<T>) -> Result<RidgeCofactor<T>, LinRegError>;

    /// The penalties, in the order in which the cofactors are stacked
    fn lambdas(&self) -> &[f64];
}

/// `n` values evenly spaced in log10 space from `10^start` to `10^stop` inclusive
pub fn logspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![10_f64.powf(start)],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| 10_f64.powf(start + step * i as f64)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use round::round;

    use super::*;

    #[test]
    fn logspace_endpoints() {
        let l = logspace(0.0, 5.0, 6);
        let l: Vec<f64> = l.iter().map(|v| round(*v, 6)).collect();
        assert_eq!(l, vec![1.0, 10.0, 100.0, 1_000.0, 10_000.0, 100_000.0]);

        assert_eq!(logspace(2.0, 3.0, 1), vec![100.0]);
        assert!(logspace(0.0, 1.0, 0).is_empty());
    }
}
