use nalgebra::DMatrix;

use crate::{CandidateModel, DefinedMask, FeatureError, PartialVersions, Real};

/// Whether an extraction may fit internal transforms or only apply them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Fit any per candidate reduction on these trials, then transform them.
    /// Allowed exactly once per candidate.
    Fit,
    /// Apply reductions fit earlier, as done for validation trials
    Transform,
}

/// Features of one candidate model over a batch of trials
#[derive(Debug, Clone)]
pub struct Features<T> {
    /// `[n_trials × n_features]`, column `k` belongs to the `k`-th defined position
    pub matrix: DMatrix<T>,
    /// Which of the `max_features` positions the columns occupy
    pub defined: DefinedMask,
}

/// Anything that maps images and a candidate spatial model to a feature matrix
pub trait FeatureLoader<T: Real> {
    /// The image batch type the loader consumes
    type Images: ?Sized;

    /// Spatial size (rows, columns) of the images in `images`
    fn image_size(&self, images: &Self::Images) -> (usize, usize);

    /// Number of trials in `images`
    fn n_trials(&self, images: &Self::Images) -> usize;

    /// Prepare for a fitting run over the given candidates.
    /// Called once before the search starts.
    fn init_for_fitting(
        &mut self,
        image_size: (usize, usize),
        models: &[CandidateModel],
    ) -> Result<(), FeatureError>;

    /// Widest feature matrix any candidate can produce
    fn max_features(&self) -> Result<usize, FeatureError>;

    /// Width of the features `load` returns for candidate `model_index`
    fn n_features(&self, model_index: usize) -> Result<usize, FeatureError>;

    /// The variance partition versions over `max_features` columns
    fn partial_versions(&self) -> Result<PartialVersions, FeatureError>;

    /// Extract the features of one candidate for every trial in `images`
    fn load(
        &mut self,
        images: &Self::Images,
        model: &CandidateModel,
        model_index: usize,
        mode: ExtractionMode,
    ) -> Result<Features<T>, FeatureError>;

    /// Release any cached maps, called once fitting is done
    fn clear_maps(&mut self) {}
}
