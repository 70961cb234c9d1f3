use nalgebra::DMatrix;

use crate::{LinReg, LinRegError, Real};

/// Tikhonov regularization aka ridge regression.
/// It is particularly useful to mitigate the problem of multicollinearity in
/// linear regression. All penalties are solved from the same design matrix,
/// so the expensive part can be shared by every target that uses that design.
#[derive(Debug, Clone)]
pub struct TikhonovRegularization {
    /// Ridge parameters, in the order in which they are evaluated
    pub lambdas: Vec<f64>,
}

impl TikhonovRegularization {
    /// Create a regressor over the given penalties
    pub fn new(lambdas: Vec<f64>) -> Result<Self, LinRegError> {
        if lambdas.is_empty() {
            return Err(LinRegError::NoLambdas);
        }
        if let Some(l) = lambdas.iter().find(|l| !l.is_finite() || **l < 0.0) {
            return Err(LinRegError::InvalidLambda(*l));
        }

        Ok(Self { lambdas })
    }
}

/// The stacked matrices `(XᵀX + λI)⁻¹Xᵀ`, one `[n_features × n_train]` matrix per penalty.
/// Multiplying one of them with training targets yields the ridge weights.
#[derive(Debug, Clone)]
pub struct RidgeCofactor<T> {
    pub(crate) mats: Vec<DMatrix<T>>,
    pub(crate) n_features: usize,
    pub(crate) n_train: usize,
}

impl<T: Real> RidgeCofactor<T> {
    #[inline(always)]
    pub fn n_lambdas(&self) -> usize {
        self.mats.len()
    }

    #[inline(always)]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline(always)]
    pub fn n_train(&self) -> usize {
        self.n_train
    }

    /// The cofactor belonging to the penalty at `lambda_index`
    #[inline(always)]
    pub fn get(&self, lambda_index: usize) -> Option<&DMatrix<T>> {
        self.mats.get(lambda_index)
    }
}

impl<T: Real> LinReg<T> for TikhonovRegularization {
    fn cofactor(&self, design: &DMatrix<T>) -> Result<RidgeCofactor<T>, LinRegError> {
        if self.lambdas.is_empty() {
            return Err(LinRegError::NoLambdas);
        }
        let n_train = design.nrows();
        let n_features = design.ncols();
        if n_features == 0 {
            return Err(LinRegError::EmptyDesign);
        }

        // The inverse is always taken in double precision, single precision
        // gives wrong weights for small penalties.
        let x: DMatrix<f64> = design.map(|v| nalgebra::convert_unchecked::<T, f64>(v));
        let xtx = x.tr_mul(&x);
        let xt = x.transpose();

        let mut mats = Vec::with_capacity(self.lambdas.len());
        for &lambda in self.lambdas.iter() {
            if !lambda.is_finite() || lambda < 0.0 {
                return Err(LinRegError::InvalidLambda(lambda));
            }
            let reg_m = DMatrix::<f64>::from_diagonal_element(n_features, n_features, lambda);
            let inv = (&xtx + reg_m)
                .try_inverse()
                .ok_or(LinRegError::SingularSystem { lambda })?;
            if inv.iter().any(|v| !v.is_finite()) {
                return Err(LinRegError::SingularSystem { lambda });
            }

            let cof = inv * &xt;
            mats.push(cof.map(|v| nalgebra::convert::<f64, T>(v)));
        }
        debug!(
            "cofactor for {} lambdas over a ({}, {}) design",
            mats.len(),
            n_train,
            n_features
        );

        Ok(RidgeCofactor {
            mats,
            n_features,
            n_train,
        })
    }

    #[inline(always)]
    fn lambdas(&self) -> &[f64] {
        &self.lambdas
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::DVector;
    use round::round;

    use super::*;

    fn design() -> DMatrix<f64> {
        // Note the first column being just ones
        DMatrix::from_vec(4, 3, vec![1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 2.0, 3.0, 0.0, 0.0, 1.0, 2.0])
    }

    /// Columns 1, t, t², ... with a sine wiggle on the last one, full column rank
    fn poly_design(n: usize, p: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, p, |i, j| {
            let t = (i as f64 + 1.0) * 0.3;
            let wiggle = if j == p - 1 { (i as f64).sin() } else { 0.0 };
            t.powi(j as i32) + wiggle
        })
    }

    #[test]
    fn tikhonov_regularization() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let design = design();
        let targets: DMatrix<f64> = DMatrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]);
        info!("design: {}, targets: {}", design, targets);

        let regressor = TikhonovRegularization::new(vec![0.0]).unwrap();
        let cof = regressor.cofactor(&design).unwrap();
        assert_eq!(cof.n_lambdas(), 1);
        assert_eq!(cof.n_features(), 3);
        assert_eq!(cof.n_train(), 4);

        let mut readout = cof.get(0).unwrap() * &targets;
        info!("readout: {}", readout);
        readout.iter_mut().for_each(|v| *v = round(*v, 1));

        assert_eq!(readout, DMatrix::from_vec(3, 1, vec![1.0, 1.0, 0.0]));
    }

    #[test]
    fn tikhonov_regularization_shifted() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let design = design() * 100.0;
        let targets: DMatrix<f64> = DMatrix::from_vec(4, 1, vec![100.0, 200.0, 300.0, 400.0]);

        let regressor = TikhonovRegularization::new(vec![0.0]).unwrap();
        let cof = regressor.cofactor(&design).unwrap();
        let mut readout = cof.get(0).unwrap() * &targets;
        readout.iter_mut().for_each(|v| *v = round(*v, 1));

        assert_eq!(readout, DMatrix::from_vec(3, 1, vec![1.0, 1.0, 0.0]));
    }

    #[test]
    fn cofactor_reconstructs_transpose() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let design = poly_design(12, 4);
        let lambdas = vec![0.0, 0.5, 10.0];
        let regressor = TikhonovRegularization::new(lambdas.clone()).unwrap();
        let cof = regressor.cofactor(&design).unwrap();

        let xtx = design.tr_mul(&design);
        for (l, lambda) in lambdas.iter().enumerate() {
            let system = &xtx + DMatrix::from_diagonal_element(4, 4, *lambda);
            let reconstructed = cof.get(l).unwrap().transpose() * system.transpose();
            let diff = (reconstructed - &design).abs().max();
            assert!(diff < 1e-8, "lambda {}: max abs diff {}", lambda, diff);
        }
    }

    #[test]
    fn single_precision_matches_double() {
        let design32 = poly_design(20, 3).map(|v| v as f32);
        let regressor = TikhonovRegularization::new(vec![1e-3, 1.0]).unwrap();
        let cof64 = regressor.cofactor(&design32.map(|v| v as f64)).unwrap();
        let cof32 = regressor.cofactor(&design32).unwrap();

        for l in 0..2 {
            let a = cof64.get(l).unwrap();
            let b = cof32.get(l).unwrap().map(|v| v as f64);
            assert!((a - b).abs().max() < 1e-4);
        }
    }

    #[test]
    fn singular_system_fails_loudly() {
        // a column of zeros makes XᵀX singular without a penalty
        let design = DMatrix::from_vec(3, 2, vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);

        let regressor = TikhonovRegularization::new(vec![1.0, 0.0]).unwrap();
        let err = regressor.cofactor(&design).unwrap_err();
        assert_eq!(err, LinRegError::SingularSystem { lambda: 0.0 });

        let regressor = TikhonovRegularization::new(vec![1.0]).unwrap();
        let cof = regressor.cofactor(&design).unwrap();
        let w = cof.get(0).unwrap() * DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(w[1], 0.0);
    }

    #[test]
    fn invalid_lambdas() {
        assert_eq!(TikhonovRegularization::new(vec![]).unwrap_err(), LinRegError::NoLambdas);
        assert_eq!(
            TikhonovRegularization::new(vec![1.0, -1.0]).unwrap_err(),
            LinRegError::InvalidLambda(-1.0)
        );

        let regressor = TikhonovRegularization::new(vec![1.0]).unwrap();
        let empty: DMatrix<f64> = DMatrix::zeros(5, 0);
        assert_eq!(regressor.cofactor(&empty).unwrap_err(), LinRegError::EmptyDesign);
    }
}
