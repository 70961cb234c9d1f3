//! The exhaustive search over candidate models

use std::time::Instant;

use common::{CandidateModel, DefinedMask, ExtractionMode, FeatureLoader, Features, Real};
use lin_reg::LinReg;
use nalgebra::{DMatrix, DVector};
use nanorand::{Rng, WyRand};

use crate::{
    best_params::{CandidateFit, VoxelFit},
    config::DEBUG_ITERATIONS,
    BestParams, FitConfig, FitError,
};

/// Added to the population standard deviation before dividing
pub const ZSCORE_EPSILON: f64 = 1e-6;

/// Everything a fit produces
#[derive(Debug, Clone)]
pub struct FitResult<T> {
    /// Best parameters of every voxel and partial version
    pub best: BestParams<T>,
    /// The candidate models the record indices point into
    pub models: Vec<CandidateModel>,
    /// The penalties the lambda indices point into
    pub lambdas: Vec<f64>,
    /// Permutation applied to the trials, the first `trn_size` entries were used for training
    pub trial_order: Vec<usize>,
    /// Number of training trials
    pub trn_size: usize,
    /// The seed of the permutation, `None` if the trials were not shuffled
    pub seed: Option<u64>,
}

impl<T: Real> FitResult<T> {
    /// Names of the partial versions, the full model first
    #[inline(always)]
    pub fn version_names(&self) -> &[String] {
        self.best.names()
    }

    /// The best candidate model of every voxel in `version`
    pub fn best_models(&self, version: usize) -> Vec<Option<CandidateModel>> {
        self.best
            .version(version)
            .model_index
            .iter()
            .map(|m| m.map(|m| self.models[m]))
            .collect()
    }

    /// The best penalty of every voxel in `version`
    pub fn best_lambdas(&self, version: usize) -> Vec<Option<f64>> {
        self.best
            .version(version)
            .lambda_index
            .iter()
            .map(|l| l.map(|l| self.lambdas[l]))
            .collect()
    }

    /// Indices of the held-out trials into the fitting trials,
    /// in the row order of the held-out predictions
    #[inline(always)]
    pub fn held_out_trials(&self) -> &[usize] {
        &self.trial_order[self.trn_size..]
    }
}

/// Fits feature weighted receptive field models by exhaustive search over candidate models.
/// Every candidate is scored with closed form ridge regression over a fixed set of penalties,
/// each voxel keeps the candidate and penalty with the lowest held-out loss.
#[derive(Debug, Clone)]
pub struct GridSearch<R> {
    regressor: R,
    config: FitConfig,
}

impl<R> GridSearch<R> {
    /// Create a new search
    ///
    /// # Arguments:
    /// regressor: Solves the ridge cofactor for every penalty
    /// config: Run wide settings
    pub fn new(regressor: R, config: FitConfig) -> Self {
        Self { regressor, config }
    }

    /// The run wide settings
    #[inline(always)]
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Trial permutation and the seed that produced it
    fn trial_order(&self, n_trials: usize) -> (Vec<usize>, Option<u64>) {
        let mut order: Vec<usize> = (0..n_trials).collect();
        if !self.config.shuffle {
            return (order, None);
        }
        let seed = match self.config.seed {
            Some(seed) => seed,
            None => {
                info!("Computing a new random seed");
                WyRand::new().generate::<u64>()
            }
        };
        info!("Seeding random number generator: seed is {}", seed);
        let mut rng = WyRand::new_seed(seed);
        rng.shuffle(&mut order);

        (order, Some(seed))
    }

    /// Run the search
    ///
    /// # Arguments:
    /// images: The fitting trials, handed to the loader as is
    /// voxel_data: `[n_trials × n_voxels]` responses, rows in the order of `images`
    /// loader: Produces the features of each candidate model
    /// models: The ordered candidate models
    pub fn fit<T, L>(
        &self,
        images: &L::Images,
        voxel_data: &DMatrix<T>,
        loader: &mut L,
        models: &[CandidateModel],
    ) -> Result<FitResult<T>, FitError>
    where
        T: Real,
        L: FeatureLoader<T>,
        R: LinReg<T>,
    {
        let t0 = Instant::now();
        let config = &self.config;

        let n_trials = loader.n_trials(images);
        if voxel_data.nrows() != n_trials {
            return Err(FitError::Config(format!(
                "{} image trials but {} rows of voxel data",
                n_trials,
                voxel_data.nrows()
            )));
        }
        let trn_size = config.validate(n_trials)?;
        let n_holdout = config.holdout_size;
        let n_voxels = voxel_data.ncols();
        info!(
            "trn_size = {} ({:.1}%), {} voxels, {} candidate models",
            trn_size,
            trn_size as f64 * 100.0 / n_trials as f64,
            n_voxels,
            models.len()
        );

        let (trial_order, seed) = self.trial_order(n_trials);
        let ordered = voxel_data.select_rows(trial_order.iter());
        let trn_data = ordered.rows(0, trn_size).into_owned();
        let out_data = ordered.rows(trn_size, n_holdout).into_owned();

        let image_size = loader.image_size(images);
        loader.init_for_fitting(image_size, models)?;
        let max_features = loader.max_features()?;
        let versions = loader.partial_versions()?;
        if versions.width() != max_features {
            return Err(FitError::Consistency(format!(
                "partial version masks span {} features, the loader produces up to {}",
                versions.width(),
                max_features
            )));
        }
        let masks = if config.add_bias {
            versions.with_bias()
        } else {
            versions.clone()
        };
        info!("partial versions: {:?}", versions.names());

        let mut best = BestParams::new(
            n_voxels,
            max_features,
            versions.names().to_vec(),
            n_holdout,
            config.add_bias,
            config.zscore,
        );

        let n_models = if config.debug {
            models.len().min(DEBUG_ITERATIONS)
        } else {
            models.len()
        };
        let mut n_batches = (n_voxels + config.voxel_batch_size - 1) / config.voxel_batch_size;
        if config.debug {
            n_batches = n_batches.min(DEBUG_ITERATIONS);
        }
        let mut setup_time = 0.0;
        let mut vox_loop_time = 0.0;

        for (m, model) in models.iter().enumerate().take(n_models) {
            info!(
                "Getting features for prf {}: [x,y,sigma] is [{:.2} {:.2} {:.4}]",
                m, model.x, model.y, model.sigma
            );
            let t = Instant::now();
            let Features { matrix, mut defined } =
                loader.load(images, model, m, ExtractionMode::Fit)?;
            let declared = loader.n_features(m)?;
            check_features(&matrix, &defined, n_trials, max_features, declared, m)?;

            let mut x = matrix.select_rows(trial_order.iter());
            drop(matrix);

            let stats = if config.zscore {
                Some(zscore_columns(&mut x, &defined))
            } else {
                None
            };
            if config.add_bias {
                let n_cols = x.ncols();
                x = x.insert_column(n_cols, T::one());
                defined = defined.with_bias();
            }
            let trn_x = x.rows(0, trn_size).into_owned();
            let out_x = x.rows(trn_size, n_holdout).into_owned();
            let defined_positions = defined.positions();
            setup_time += t.elapsed().as_secs_f64();

            let mut improved = vec![false; n_voxels];
            for v in 0..masks.len() {
                let mask = masks.mask(v);
                let (columns, positions): (Vec<usize>, Vec<usize>) = defined_positions
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| mask[**p])
                    .map(|(k, p)| (k, *p))
                    .unzip();
                debug!(
                    "Fitting version {} of {}: {}, {} active columns",
                    v,
                    masks.len(),
                    masks.names()[v],
                    columns.len()
                );
                let candidate = CandidateFit {
                    model_index: m,
                    positions: &positions,
                    stats: stats.as_ref().map(|(mean, std)| (mean, std)),
                };

                if columns.is_empty() {
                    // Nothing to regress on, such a candidate never wins the full model
                    if v > 0 {
                        record_empty(&mut best, v, &candidate, &improved, n_holdout);
                    }
                    continue;
                }

                let xtrn = trn_x.select_columns(columns.iter());
                let xout = out_x.select_columns(columns.iter());
                let cof = self.regressor.cofactor(&xtrn)?;

                let vox_start = Instant::now();
                for b in 0..n_batches {
                    let start = b * config.voxel_batch_size;
                    let len = config.voxel_batch_size.min(n_voxels - start);
                    trace!(
                        "fitting model {} of {}, voxels [{}:{}]",
                        m,
                        n_models,
                        start,
                        start + len
                    );

                    let vtrn = trn_data.columns(start, len).into_owned();
                    let vout = out_data.columns(start, len).into_owned();
                    let eval = cof.evaluate(&vtrn, &xout, &vout)?;

                    let per_target = eval.best_per_target();
                    for (j, (loss, lambda_index)) in per_target.into_iter().enumerate() {
                        let voxel = start + j;
                        let loss = nalgebra::convert_unchecked::<T, f64>(loss);
                        if v == 0 {
                            improved[voxel] = best.improves(voxel, loss);
                        }
                        if !improved[voxel] {
                            continue;
                        }
                        let weights = eval.weights(lambda_index, j);
                        let held_out_pred = &xout * &weights;
                        let fit = VoxelFit {
                            loss,
                            lambda_index: Some(lambda_index),
                            weights,
                            held_out_pred,
                        };
                        best.record(v, voxel, &candidate, fit);
                    }
                }
                vox_loop_time += vox_start.elapsed().as_secs_f64();
            }

            let n_improved = improved.iter().filter(|i| **i).count();
            info!(
                "prf {} improved {} of {} voxels, took {:.3}s",
                m,
                n_improved,
                n_voxels,
                t.elapsed().as_secs_f64()
            );
        }
        loader.clear_maps();

        let total = t0.elapsed().as_secs_f64();
        let per_voxel = |secs: f64| if n_voxels > 0 { secs / n_voxels as f64 } else { 0.0 };
        info!("---------------------------------------");
        info!("total time = {:.3}s", total);
        info!("total throughput = {:.6}s/voxel", per_voxel(total));
        info!("voxel throughput = {:.6}s/voxel", per_voxel(vox_loop_time));
        info!(
            "setup throughput = {:.6}s/model",
            if n_models > 0 { setup_time / n_models as f64 } else { 0.0 }
        );

        Ok(FitResult {
            best,
            models: models.to_vec(),
            lambdas: self.regressor.lambdas().to_vec(),
            trial_order,
            trn_size,
            seed,
        })
    }
}

/// The shapes a loader returns must agree with what it declared
fn check_features<T: Real>(
    matrix: &DMatrix<T>,
    defined: &DefinedMask,
    n_trials: usize,
    max_features: usize,
    declared: usize,
    model_index: usize,
) -> Result<(), FitError> {
    if matrix.nrows() != n_trials {
        return Err(FitError::Consistency(format!(
            "features of model {} have {} rows, expected {}",
            model_index,
            matrix.nrows(),
            n_trials
        )));
    }
    if defined.len() != max_features {
        return Err(FitError::Consistency(format!(
            "defined mask of model {} spans {} features, expected {}",
            model_index,
            defined.len(),
            max_features
        )));
    }
    if matrix.ncols() != defined.count() {
        return Err(FitError::Consistency(format!(
            "model {} returned {} columns but marked {} as defined",
            model_index,
            matrix.ncols(),
            defined.count()
        )));
    }
    if matrix.ncols() != declared || declared > max_features {
        return Err(FitError::Consistency(format!(
            "model {} returned {} columns, declared {} of at most {}",
            model_index,
            matrix.ncols(),
            declared,
            max_features
        )));
    }

    Ok(())
}

/// Z-score the columns of `x` in place with the population standard deviation.
///
/// # Returns:
/// Mean and standard deviation scattered over the `max_features` positions,
/// undefined positions hold 0 and 1
fn zscore_columns<T: Real>(x: &mut DMatrix<T>, defined: &DefinedMask) -> (DVector<T>, DVector<T>) {
    let mut mean = DVector::<T>::zeros(defined.len());
    let mut std = DVector::<T>::from_element(defined.len(), T::one());
    let n = x.nrows().max(1) as f64;

    for (k, p) in defined.positions().into_iter().enumerate() {
        let col: Vec<f64> = x
            .column(k)
            .iter()
            .map(|v| nalgebra::convert_unchecked::<T, f64>(*v))
            .collect();
        let m = col.iter().sum::<f64>() / n;
        let s = (col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n).sqrt() + ZSCORE_EPSILON;
        for (dst, v) in x.column_mut(k).iter_mut().zip(col.iter()) {
            *dst = nalgebra::convert::<f64, T>((v - m) / s);
        }
        mean[p] = nalgebra::convert::<f64, T>(m);
        std[p] = nalgebra::convert::<f64, T>(s);
    }

    (mean, std)
}

/// Records for voxels whose full model improved while this version has no active column
fn record_empty<T: Real>(
    best: &mut BestParams<T>,
    version: usize,
    candidate: &CandidateFit<T>,
    improved: &[bool],
    n_holdout: usize,
) {
    for (voxel, _) in improved.iter().enumerate().filter(|(_, i)| **i) {
        let fit = VoxelFit {
            loss: f64::INFINITY,
            lambda_index: None,
            weights: DVector::zeros(0),
            held_out_pred: DVector::zeros(n_holdout),
        };
        best.record(version, voxel, candidate, fit);
    }
}

#[cfg(test)]
mod tests {
    use round::round;

    use super::*;

    #[test]
    fn zscore_scatters_stats() {
        let mut x = DMatrix::from_row_slice(4, 2, &[1.0, 10.0, 2.0, 10.0, 3.0, 10.0, 4.0, 10.0]);
        let defined = DefinedMask::new(vec![false, true, false, true]);
        let (mean, std) = zscore_columns(&mut x, &defined);

        assert_eq!(mean.as_slice(), &[0.0, 2.5, 0.0, 10.0]);
        assert_eq!(round(std[1], 6), round(1.25_f64.sqrt() + ZSCORE_EPSILON, 6));
        assert_eq!(std[2], 1.0);
        assert_eq!(round(std[3], 9), ZSCORE_EPSILON);

        assert_eq!(round(x.column(0).sum(), 9), 0.0);
        // a constant column becomes zero instead of blowing up
        assert!(x.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn consistency_checks() {
        let m = DMatrix::<f64>::zeros(5, 2);
        let defined = DefinedMask::leading(2, 3);
        assert!(check_features(&m, &defined, 5, 3, 2, 0).is_ok());
        assert!(check_features(&m, &defined, 6, 3, 2, 0).is_err());
        assert!(check_features(&m, &defined, 5, 4, 2, 0).is_err());
        assert!(check_features(&m, &DefinedMask::leading(1, 3), 5, 3, 2, 0).is_err());
        assert!(check_features(&m, &defined, 5, 3, 1, 0).is_err());
        assert!(check_features(&m, &defined, 5, 3, 4, 0).is_err());
        // fewer columns than declared
        assert!(check_features(&m, &defined, 5, 3, 3, 0).is_err());
    }
}
