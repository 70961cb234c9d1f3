use std::cmp::Ordering;

use common::{
    CandidateModel, DefinedMask, ExtractionMode, FeatureError, FeatureLoader, Features,
    PartialVersions, Real,
};
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Parameters of the principal component reduction
#[derive(Debug, Clone)]
pub struct PcaParams {
    /// Upper bound on the retained components, also the `max_features` of the loader
    pub max_components: usize,
    /// Keep the fewest components whose cumulative explained variance exceeds this percentage
    pub min_pct_var: f64,
}

impl Default for PcaParams {
    fn default() -> Self {
        Self {
            max_components: 100,
            min_pct_var: 99.0,
        }
    }
}

/// A fitted principal component projection of one candidate's raw features
#[derive(Debug, Clone)]
pub struct PcaTransform {
    /// Mean of every raw feature over the fitting trials
    pub mean: DVector<f64>,
    /// `[n_kept × n_raw]`, rows are the retained components
    pub components: DMatrix<f64>,
    /// Percentage of variance of each candidate component, before truncation
    pub pct_var_expl: Vec<f64>,
}

impl PcaTransform {
    /// Fit on `[n_trials × n_raw]` features, returns the transform and the fitting scores
    fn fit<T: Real>(features: &DMatrix<T>, params: &PcaParams) -> (Self, DMatrix<T>) {
        let x: DMatrix<f64> = features.map(|v| nalgebra::convert_unchecked::<T, f64>(v));
        let (n_trials, n_raw) = x.shape();
        let mean = DVector::from_fn(n_raw, |j, _| x.column(j).mean());
        let centered = DMatrix::from_fn(n_trials, n_raw, |i, j| x[(i, j)] - mean[j]);

        let denom = n_trials.saturating_sub(1).max(1) as f64;
        let cov = centered.tr_mul(&centered) / denom;
        let eigen = SymmetricEigen::new(cov);

        let mut order: Vec<usize> = (0..n_raw).collect();
        order.sort_by(|a, b| {
            eigen.eigenvalues[*b]
                .partial_cmp(&eigen.eigenvalues[*a])
                .unwrap_or(Ordering::Equal)
        });
        let n_candidates = params.max_components.min(n_raw).min(n_trials);
        order.truncate(n_candidates);

        let ev: Vec<f64> = order.iter().map(|k| eigen.eigenvalues[*k].max(0.0)).collect();
        let total: f64 = ev.iter().sum();
        let pct_var_expl: Vec<f64> = ev
            .iter()
            .map(|v| if total > 0.0 { v / total * 100.0 } else { 0.0 })
            .collect();

        let mut n_kept = n_candidates;
        let mut cumulative = 0.0;
        for (k, pct) in pct_var_expl.iter().enumerate() {
            cumulative += pct;
            if cumulative > params.min_pct_var {
                n_kept = k + 1;
                break;
            }
        }

        let components = DMatrix::from_fn(n_kept, n_raw, |k, j| eigen.eigenvectors[(j, order[k])]);
        let scores = centered * components.transpose();
        info!(
            "retaining {} of {} components to explain {}% of variance",
            n_kept, n_candidates, params.min_pct_var
        );

        let transform = Self {
            mean,
            components,
            pct_var_expl,
        };
        (transform, scores.map(|v| nalgebra::convert::<f64, T>(v)))
    }

    /// Project raw features with the fitted components
    fn apply<T: Real>(&self, features: &DMatrix<T>) -> DMatrix<T> {
        let centered = DMatrix::from_fn(features.nrows(), features.ncols(), |i, j| {
            nalgebra::convert_unchecked::<T, f64>(features[(i, j)]) - self.mean[j]
        });
        (centered * self.components.transpose()).map(|v| nalgebra::convert::<f64, T>(v))
    }

    /// Number of retained components
    #[inline(always)]
    pub fn n_kept(&self) -> usize {
        self.components.nrows()
    }
}

/// Where a candidate's reduction is in its lifecycle
#[derive(Debug, Clone)]
pub enum ReductionState {
    /// Not fit yet, only an `ExtractionMode::Fit` extraction may follow
    Unfit,
    /// Fit on the fitting trials, only `ExtractionMode::Transform` extractions may follow
    Fitted(PcaTransform),
}

/// Wraps a loader and reduces each candidate's raw features with its own principal components.
/// The reduction of a candidate is fit exactly once, on the trials of its fitting extraction,
/// and reused for every later transform extraction.
#[derive(Debug, Clone)]
pub struct PcaReducingLoader<L> {
    inner: L,
    params: PcaParams,
    states: Vec<ReductionState>,
}

impl<L> PcaReducingLoader<L> {
    /// Create a new reducing loader around `inner`
    pub fn new(inner: L, params: PcaParams) -> Result<Self, FeatureError> {
        if params.max_components == 0 {
            return Err(FeatureError::InvalidInput(
                "max_components must be at least 1".to_string(),
            ));
        }
        if !(params.min_pct_var > 0.0 && params.min_pct_var <= 100.0) {
            return Err(FeatureError::InvalidInput(format!(
                "min_pct_var must be in (0, 100], got {}",
                params.min_pct_var
            )));
        }

        Ok(Self {
            inner,
            params,
            states: vec![],
        })
    }

    /// Reduction state of candidate `model_index`, `None` before initialization
    #[inline(always)]
    pub fn state(&self, model_index: usize) -> Option<&ReductionState> {
        self.states.get(model_index)
    }

    /// Retained component count of candidate `model_index`, once fit
    pub fn n_components(&self, model_index: usize) -> Option<usize> {
        match self.states.get(model_index) {
            Some(ReductionState::Fitted(t)) => Some(t.n_kept()),
            _ => None,
        }
    }

    /// The wrapped loader
    #[inline(always)]
    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<T, L> FeatureLoader<T> for PcaReducingLoader<L>
where
    T: Real,
    L: FeatureLoader<T>,
{
    type Images = L::Images;

    #[inline(always)]
    fn image_size(&self, images: &Self::Images) -> (usize, usize) {
        self.inner.image_size(images)
    }

    #[inline(always)]
    fn n_trials(&self, images: &Self::Images) -> usize {
        self.inner.n_trials(images)
    }

    fn init_for_fitting(
        &mut self,
        image_size: (usize, usize),
        models: &[CandidateModel],
    ) -> Result<(), FeatureError> {
        self.inner.init_for_fitting(image_size, models)?;
        info!(
            "initializing pca state for {} candidates, at most {} components each",
            models.len(),
            self.params.max_components
        );
        self.states = vec![ReductionState::Unfit; models.len()];

        Ok(())
    }

    fn max_features(&self) -> Result<usize, FeatureError> {
        self.inner.max_features()?;
        Ok(self.params.max_components)
    }

    /// The retained component count once fit, the upper bound before that
    fn n_features(&self, model_index: usize) -> Result<usize, FeatureError> {
        match self.states.get(model_index) {
            Some(ReductionState::Fitted(t)) => Ok(t.n_kept()),
            _ => Ok(self.inner.n_features(model_index)?.min(self.params.max_components)),
        }
    }

    fn partial_versions(&self) -> Result<PartialVersions, FeatureError> {
        Ok(PartialVersions::full_only(self.max_features()?))
    }

    fn load(
        &mut self,
        images: &Self::Images,
        model: &CandidateModel,
        model_index: usize,
        mode: ExtractionMode,
    ) -> Result<Features<T>, FeatureError> {
        if self.states.is_empty() {
            return Err(FeatureError::NotInitialized);
        }
        if model_index >= self.states.len() {
            return Err(FeatureError::UnknownModel {
                index: model_index,
                n_models: self.states.len(),
            });
        }

        let raw = self.inner.load(images, model, model_index, mode)?;
        let declared = self.inner.n_features(model_index)?;
        if raw.matrix.ncols() != declared {
            return Err(FeatureError::WidthMismatch {
                model_index,
                declared,
                actual: raw.matrix.ncols(),
            });
        }
        debug!("raw features of candidate {}: {:?}", model_index, raw.matrix.shape());

        let reduced = match (mode, &self.states[model_index]) {
            (ExtractionMode::Fit, ReductionState::Unfit) => {
                let (transform, scores) = PcaTransform::fit(&raw.matrix, &self.params);
                self.states[model_index] = ReductionState::Fitted(transform);
                scores
            }
            (ExtractionMode::Fit, ReductionState::Fitted(_)) => {
                return Err(FeatureError::AlreadyFit { model_index })
            }
            (ExtractionMode::Transform, ReductionState::Fitted(transform)) => {
                transform.apply(&raw.matrix)
            }
            (ExtractionMode::Transform, ReductionState::Unfit) => {
                return Err(FeatureError::NotFit { model_index })
            }
        };

        Ok(Features {
            defined: DefinedMask::leading(reduced.ncols(), self.params.max_components),
            matrix: reduced,
        })
    }

    fn clear_maps(&mut self) {
        self.inner.clear_maps()
    }
}
