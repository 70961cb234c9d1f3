use common::Real;
use nalgebra::{DMatrix, DVector};

/// Best parameters of every voxel for one partial version
#[derive(Debug, Clone)]
pub struct VersionState<T> {
    /// Held-out sum of squared errors, `+∞` until a candidate is recorded
    pub losses: Vec<f64>,
    /// Index into the penalties, `None` when nothing was recorded or no feature was active
    pub lambda_index: Vec<Option<usize>>,
    /// Index into the candidate models
    pub model_index: Vec<Option<usize>>,
    /// `[n_voxels × max_features]`, zero outside the active columns
    pub weights: DMatrix<T>,
    /// Additive bias per voxel, present when fitting with a bias column
    pub bias: Option<DVector<T>>,
    /// `[n_voxels × max_features]` feature means used for z-scoring
    pub features_mean: Option<DMatrix<T>>,
    /// `[n_voxels × max_features]` feature standard deviations (plus epsilon) used for z-scoring
    pub features_std: Option<DMatrix<T>>,
    /// `[n_holdout × n_voxels]` held-out predictions of the recorded parameters
    pub held_out_pred: DMatrix<T>,
}

impl<T: Real> VersionState<T> {
    fn new(
        n_voxels: usize,
        max_features: usize,
        n_holdout: usize,
        add_bias: bool,
        zscore: bool,
    ) -> Self {
        Self {
            losses: vec![f64::INFINITY; n_voxels],
            lambda_index: vec![None; n_voxels],
            model_index: vec![None; n_voxels],
            weights: DMatrix::zeros(n_voxels, max_features),
            bias: add_bias.then(|| DVector::zeros(n_voxels)),
            features_mean: zscore.then(|| DMatrix::zeros(n_voxels, max_features)),
            features_std: zscore.then(|| DMatrix::from_element(n_voxels, max_features, T::one())),
            held_out_pred: DMatrix::zeros(n_holdout, n_voxels),
        }
    }
}

/// What one candidate model contributes to the records of one partial version
#[derive(Debug)]
pub(crate) struct CandidateFit<'a, T> {
    pub(crate) model_index: usize,
    /// Position of every active design column, positions past `max_features` are the bias
    pub(crate) positions: &'a [usize],
    /// Dense z-score statistics over `max_features`
    pub(crate) stats: Option<(&'a DVector<T>, &'a DVector<T>)>,
}

/// The outcome of the ridge solve for one voxel
#[derive(Debug)]
pub(crate) struct VoxelFit<T> {
    pub(crate) loss: f64,
    pub(crate) lambda_index: Option<usize>,
    /// One weight per active column
    pub(crate) weights: DVector<T>,
    pub(crate) held_out_pred: DVector<T>,
}

/// Keeps track of the best parameters seen so far for every voxel and partial version.
/// Only a strictly lower full model loss replaces a record, so the first seen candidate wins ties.
#[derive(Debug, Clone)]
pub struct BestParams<T> {
    versions: Vec<VersionState<T>>,
    names: Vec<String>,
    max_features: usize,
}

impl<T: Real> BestParams<T> {
    /// Create empty records
    ///
    /// # Arguments:
    /// n_voxels: Number of target columns
    /// max_features: Width of the dense weight vectors, bias excluded
    /// names: One name per partial version, the full model first
    /// n_holdout: Number of held-out trials
    /// add_bias: Whether to track a bias per voxel
    /// zscore: Whether to track normalization statistics per voxel
    pub fn new(
        n_voxels: usize,
        max_features: usize,
        names: Vec<String>,
        n_holdout: usize,
        add_bias: bool,
        zscore: bool,
    ) -> Self {
        let versions = names
            .iter()
            .map(|_| VersionState::new(n_voxels, max_features, n_holdout, add_bias, zscore))
            .collect();

        Self {
            versions,
            names,
            max_features,
        }
    }

    #[inline(always)]
    pub fn n_versions(&self) -> usize {
        self.versions.len()
    }

    #[inline(always)]
    pub fn n_voxels(&self) -> usize {
        self.versions.first().map(|v| v.losses.len()).unwrap_or(0)
    }

    #[inline(always)]
    pub fn max_features(&self) -> usize {
        self.max_features
    }

    #[inline(always)]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The records of partial version `version`
    #[inline(always)]
    pub fn version(&self, version: usize) -> &VersionState<T> {
        &self.versions[version]
    }

    #[inline(always)]
    pub fn versions(&self) -> &[VersionState<T>] {
        &self.versions
    }

    /// Whether `loss` beats the full model record of `voxel`
    #[inline(always)]
    pub(crate) fn improves(&self, voxel: usize, loss: f64) -> bool {
        loss < self.versions[0].losses[voxel]
    }

    /// Overwrite every record of `voxel` in `version`
    pub(crate) fn record(
        &mut self,
        version: usize,
        voxel: usize,
        candidate: &CandidateFit<T>,
        fit: VoxelFit<T>,
    ) {
        let max_features = self.max_features;
        let state = &mut self.versions[version];

        state.losses[voxel] = fit.loss;
        state.lambda_index[voxel] = fit.lambda_index;
        state.model_index[voxel] = Some(candidate.model_index);

        state.weights.row_mut(voxel).fill(T::zero());
        if let Some(bias) = state.bias.as_mut() {
            bias[voxel] = T::zero();
        }
        for (w, p) in fit.weights.iter().zip(candidate.positions.iter()) {
            if *p < max_features {
                state.weights[(voxel, *p)] = *w;
            } else if let Some(bias) = state.bias.as_mut() {
                bias[voxel] = *w;
            }
        }

        if let (Some((mean, std)), Some(m), Some(s)) = (
            candidate.stats,
            state.features_mean.as_mut(),
            state.features_std.as_mut(),
        ) {
            m.set_row(voxel, &mean.transpose());
            s.set_row(voxel, &std.transpose());
        }

        state.held_out_pred.set_column(voxel, &fit.held_out_pred);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_scatters_weights() {
        let mut best = BestParams::<f64>::new(
            2,
            3,
            vec!["full_model".to_string(), "just_a".to_string()],
            2,
            true,
            true,
        );
        assert_eq!(best.n_voxels(), 2);
        assert!(best.improves(1, 10.0));
        assert!(!best.improves(1, f64::INFINITY));

        let mean = DVector::from_vec(vec![1.0, 2.0, 0.0]);
        let std = DVector::from_vec(vec![0.5, 0.25, 1.0]);
        let positions = [0, 2, 3];
        let candidate = CandidateFit {
            model_index: 4,
            positions: &positions,
            stats: Some((&mean, &std)),
        };
        let fit = VoxelFit {
            loss: 1.5,
            lambda_index: Some(2),
            weights: DVector::from_vec(vec![7.0, -1.0, 0.5]),
            held_out_pred: DVector::from_vec(vec![1.0, 2.0]),
        };
        best.record(0, 1, &candidate, fit);

        let full = best.version(0);
        assert_eq!(full.losses, vec![f64::INFINITY, 1.5]);
        assert_eq!(full.lambda_index, vec![None, Some(2)]);
        assert_eq!(full.model_index, vec![None, Some(4)]);
        assert_eq!(full.weights.row(1).iter().copied().collect::<Vec<_>>(), vec![7.0, 0.0, -1.0]);
        assert_eq!(full.bias.as_ref().unwrap()[1], 0.5);
        assert_eq!(full.features_mean.as_ref().unwrap()[(1, 1)], 2.0);
        assert_eq!(full.features_std.as_ref().unwrap()[(0, 1)], 1.0);
        assert_eq!(full.held_out_pred.column(1)[1], 2.0);

        assert!(best.improves(1, 1.0));
        assert!(!best.improves(1, 1.5));
        assert_eq!(best.version(1).model_index, vec![None, None]);
    }
}
