use common::{
    CandidateModel, DefinedMask, ExtractionMode, FeatureError, FeatureLoader, Features,
    PartialVersions, Real,
};
use nalgebra::DMatrix;

use crate::grouped_versions;

/// Serves feature matrices computed ahead of time, one per candidate model.
/// The image batch is a list of trial indices into the rows of those matrices.
/// Narrower candidates occupy the leading feature positions.
#[derive(Debug, Clone)]
pub struct PrecomputedLoader<T> {
    features: Vec<DMatrix<T>>,
    channel_groups: Vec<(String, Vec<usize>)>,
    initialized: bool,
}

impl<T: Real> PrecomputedLoader<T> {
    /// Create a new loader
    ///
    /// # Arguments:
    /// features: One `[n_stored_trials × width]` matrix per candidate model, in candidate order
    pub fn new(features: Vec<DMatrix<T>>) -> Self {
        Self {
            features,
            channel_groups: vec![],
            initialized: false,
        }
    }

    /// Add named column groups, each one becomes a `just_<name>` partial version
    pub fn with_groups(mut self, groups: Vec<(String, Vec<usize>)>) -> Result<Self, FeatureError> {
        grouped_versions(self.widest(), &groups)?;
        self.channel_groups = groups;
        Ok(self)
    }

    fn widest(&self) -> usize {
        self.features.iter().map(|f| f.ncols()).max().unwrap_or(0)
    }

    fn stored(&self, model_index: usize) -> Result<&DMatrix<T>, FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized);
        }
        self.features.get(model_index).ok_or(FeatureError::UnknownModel {
            index: model_index,
            n_models: self.features.len(),
        })
    }
}

impl<T: Real> FeatureLoader<T> for PrecomputedLoader<T> {
    type Images = [usize];

    fn image_size(&self, _images: &Self::Images) -> (usize, usize) {
        (1, 1)
    }

    #[inline(always)]
    fn n_trials(&self, images: &Self::Images) -> usize {
        images.len()
    }

    fn init_for_fitting(
        &mut self,
        _image_size: (usize, usize),
        models: &[CandidateModel],
    ) -> Result<(), FeatureError> {
        if models.len() != self.features.len() {
            return Err(FeatureError::InvalidInput(format!(
                "{} candidate models but features for {}",
                models.len(),
                self.features.len()
            )));
        }
        if let Some(first) = self.features.first() {
            if self.features.iter().any(|f| f.nrows() != first.nrows()) {
                return Err(FeatureError::InvalidInput(
                    "stored feature matrices differ in trial count".to_string(),
                ));
            }
        }
        self.initialized = true;

        Ok(())
    }

    fn max_features(&self) -> Result<usize, FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized);
        }
        Ok(self.widest())
    }

    fn n_features(&self, model_index: usize) -> Result<usize, FeatureError> {
        Ok(self.stored(model_index)?.ncols())
    }

    fn partial_versions(&self) -> Result<PartialVersions, FeatureError> {
        grouped_versions(self.max_features()?, &self.channel_groups)
    }

    fn load(
        &mut self,
        images: &Self::Images,
        _model: &CandidateModel,
        model_index: usize,
        _mode: ExtractionMode,
    ) -> Result<Features<T>, FeatureError> {
        let stored = self.stored(model_index)?;
        if let Some(t) = images.iter().find(|t| **t >= stored.nrows()) {
            return Err(FeatureError::InvalidInput(format!(
                "trial {} out of range for {} stored trials",
                t,
                stored.nrows()
            )));
        }
        let matrix = stored.select_rows(images.iter());

        Ok(Features {
            defined: DefinedMask::leading(matrix.ncols(), self.widest()),
            matrix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_selected_rows() {
        let a = DMatrix::from_fn(5, 2, |i, j| (10 * i + j) as f64);
        let b = DMatrix::from_fn(5, 3, |i, j| -((10 * i + j) as f64));
        let mut loader = PrecomputedLoader::new(vec![a, b]);
        let models = vec![CandidateModel::new(0.0, 0.0, 1.0); 2];

        loader.init_for_fitting((1, 1), &models).unwrap();
        assert_eq!(loader.max_features().unwrap(), 3);
        assert_eq!(loader.n_features(0).unwrap(), 2);

        let trials = [4, 0];
        let f = loader.load(&trials[..], &models[0], 0, ExtractionMode::Fit).unwrap();
        assert_eq!(f.matrix, DMatrix::from_row_slice(2, 2, &[40.0, 41.0, 0.0, 1.0]));
        assert_eq!(f.defined.as_slice(), &[true, true, false]);

        assert!(loader.load(&[5][..], &models[1], 1, ExtractionMode::Fit).is_err());
    }

    #[test]
    fn init_checks() {
        let mut loader = PrecomputedLoader::new(vec![DMatrix::<f64>::zeros(4, 2)]);
        assert_eq!(loader.max_features().unwrap_err(), FeatureError::NotInitialized);
        assert!(loader.init_for_fitting((1, 1), &[]).is_err());

        let loader = PrecomputedLoader::new(vec![DMatrix::<f64>::zeros(4, 2)])
            .with_groups(vec![("a".to_string(), vec![2])]);
        assert!(loader.is_err());
    }
}
