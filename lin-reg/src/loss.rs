use nalgebra::{DMatrix, DVector};

use crate::{LinRegError, Real, RidgeCofactor};

/// Ridge weights and held-out sum of squared errors for every penalty and target column
#[derive(Debug, Clone)]
pub struct RidgeEvaluation<T> {
    /// One `[n_features × n_targets]` weight matrix per penalty
    pub betas: Vec<DMatrix<T>>,
    /// `[n_lambdas × n_targets]` sum of squared residuals over the held-out rows
    pub losses: DMatrix<T>,
}

impl<T: Real> RidgeCofactor<T> {
    /// Apply the cofactor to training targets and score the resulting weights on held-out data.
    ///
    /// # Arguments:
    /// train_targets: `[n_train × n_targets]`
    /// held_design: `[n_held × n_features]`
    /// held_targets: `[n_held × n_targets]`
    pub fn evaluate(
        &self,
        train_targets: &DMatrix<T>,
        held_design: &DMatrix<T>,
        held_targets: &DMatrix<T>,
    ) -> Result<RidgeEvaluation<T>, LinRegError> {
        if train_targets.nrows() != self.n_train {
            return Err(LinRegError::DimensionMismatch(format!(
                "training targets have {} rows, cofactor was built from {} trials",
                train_targets.nrows(),
                self.n_train
            )));
        }
        if held_design.ncols() != self.n_features {
            return Err(LinRegError::DimensionMismatch(format!(
                "held-out design has {} columns, cofactor was built from {} features",
                held_design.ncols(),
                self.n_features
            )));
        }
        if held_targets.shape() != (held_design.nrows(), train_targets.ncols()) {
            return Err(LinRegError::DimensionMismatch(format!(
                "held-out targets are {:?}, expected ({}, {})",
                held_targets.shape(),
                held_design.nrows(),
                train_targets.ncols()
            )));
        }

        let n_targets = train_targets.ncols();
        let mut losses = DMatrix::<T>::zeros(self.mats.len(), n_targets);
        let mut betas = Vec::with_capacity(self.mats.len());
        for (l, cof) in self.mats.iter().enumerate() {
            let beta = cof * train_targets;
            let residuals = held_targets - held_design * &beta;
            for (v, col) in residuals.column_iter().enumerate() {
                losses[(l, v)] = col.norm_squared();
            }
            betas.push(beta);
        }

        Ok(RidgeEvaluation { betas, losses })
    }
}

impl<T: Real> RidgeEvaluation<T> {
    #[inline(always)]
    pub fn n_lambdas(&self) -> usize {
        self.losses.nrows()
    }

    #[inline(always)]
    pub fn n_targets(&self) -> usize {
        self.losses.ncols()
    }

    /// The lowest loss of each target column and the index of the penalty achieving it.
    /// On ties the lower penalty index wins.
    pub fn best_per_target(&self) -> Vec<(T, usize)> {
        (0..self.losses.ncols())
            .map(|v| {
                let mut best = (self.losses[(0, v)], 0);
                for l in 1..self.losses.nrows() {
                    if self.losses[(l, v)] < best.0 {
                        best = (self.losses[(l, v)], l);
                    }
                }
                best
            })
            .collect()
    }

    /// Weights of target column `target` under the penalty at `lambda_index`
    #[inline(always)]
    pub fn weights(&self, lambda_index: usize, target: usize) -> DVector<T> {
        self.betas[lambda_index].column(target).into_owned()
    }
}
