use std::collections::BTreeSet;

use common::{ExtractionMode, FeatureLoader, Features, Real};
use nalgebra::{DMatrix, DVector};

use crate::{corrcoef, r2, FitError, FitResult};

/// Performance of the recorded parameters on validation trials
#[derive(Debug, Clone)]
pub struct Validation<T> {
    /// `[n_voxels × n_versions]` correlation between predicted and actual responses
    pub val_cc: DMatrix<f64>,
    /// `[n_voxels × n_versions]` coefficient of determination
    pub val_r2: DMatrix<f64>,
    /// One `[n_val_trials × n_voxels]` prediction matrix per partial version
    pub predictions: Vec<DMatrix<T>>,
}

/// Predict validation responses with the parameters recorded by a fit.
/// The loader must be the one used for fitting, its reductions are applied in transform mode.
/// Voxels without a recorded model get NaN scores.
///
/// # Arguments:
/// images: The validation trials
/// val_data: `[n_val_trials × n_voxels]` responses
/// loader: The loader the fit was run with
/// fit: The result of that fit
pub fn validate<T, L>(
    images: &L::Images,
    val_data: &DMatrix<T>,
    loader: &mut L,
    fit: &FitResult<T>,
) -> Result<Validation<T>, FitError>
where
    T: Real,
    L: FeatureLoader<T>,
{
    let n_trials = loader.n_trials(images);
    let best = &fit.best;
    let n_voxels = best.n_voxels();
    let max_features = best.max_features();
    if val_data.shape() != (n_trials, n_voxels) {
        return Err(FitError::Config(format!(
            "validation data is {:?}, expected ({}, {})",
            val_data.shape(),
            n_trials,
            n_voxels
        )));
    }

    let winners: BTreeSet<usize> = best
        .versions()
        .iter()
        .flat_map(|v| v.model_index.iter().flatten().copied())
        .collect();
    info!("validating {} voxels over {} distinct winning models", n_voxels, winners.len());

    let mut predictions = vec![DMatrix::<T>::zeros(n_trials, n_voxels); best.n_versions()];
    for m in winners {
        let Features { matrix, defined } =
            loader.load(images, &fit.models[m], m, ExtractionMode::Transform)?;
        if matrix.nrows() != n_trials
            || defined.len() != max_features
            || matrix.ncols() != defined.count()
        {
            return Err(FitError::Consistency(format!(
                "validation features of model {} are {:?} with {} of {} positions defined",
                m,
                matrix.shape(),
                defined.count(),
                defined.len()
            )));
        }
        let positions = defined.positions();

        for (state, pred) in best.versions().iter().zip(predictions.iter_mut()) {
            for voxel in (0..n_voxels).filter(|v| state.model_index[*v] == Some(m)) {
                let mut column = DVector::<T>::zeros(n_trials);
                for (k, p) in positions.iter().enumerate() {
                    let w = state.weights[(voxel, *p)];
                    let (mean, std) = match (&state.features_mean, &state.features_std) {
                        (Some(mean), Some(std)) => (mean[(voxel, *p)], std[(voxel, *p)]),
                        _ => (T::zero(), T::one()),
                    };
                    for t in 0..n_trials {
                        column[t] += (matrix[(t, k)] - mean) / std * w;
                    }
                }
                if let Some(bias) = &state.bias {
                    column.add_scalar_mut(bias[voxel]);
                }
                pred.set_column(voxel, &column);
            }
        }
    }

    let mut val_cc = DMatrix::from_element(n_voxels, best.n_versions(), f64::NAN);
    let mut val_r2 = DMatrix::from_element(n_voxels, best.n_versions(), f64::NAN);
    for (v, (state, pred)) in best.versions().iter().zip(predictions.iter()).enumerate() {
        let cc = corrcoef(val_data, pred)?;
        let r = r2(val_data, pred)?;
        for voxel in 0..n_voxels {
            if state.model_index[voxel].is_some() {
                val_cc[(voxel, v)] = cc[voxel];
                val_r2[(voxel, v)] = r[voxel];
            }
        }
    }

    Ok(Validation {
        val_cc,
        val_r2,
        predictions,
    })
}
