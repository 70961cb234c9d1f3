use common::{
    CandidateModel, DefinedMask, ExtractionMode, FeatureError, FeatureLoader, Features,
    PartialVersions, Real,
};
use nalgebra::DMatrix;

use crate::{grouped_versions, make_gaussian_mass};

/// Parameters of the pRF pooling loader
#[derive(Debug, Clone)]
pub struct PoolingParams {
    /// Number of feature map channels every trial carries
    pub n_channels: usize,
    /// Extent of the image in the units of the candidate models
    pub aperture: f64,
    /// Optional named channel groups, each one becomes a `just_<name>` partial version
    pub channel_groups: Vec<(String, Vec<usize>)>,
}

impl Default for PoolingParams {
    fn default() -> Self {
        Self {
            n_channels: 1,
            aperture: 1.0,
            channel_groups: vec![],
        }
    }
}

/// Pools precomputed feature maps with the gaussian of each candidate model.
/// A trial is a vector of `n_channels` square maps; its features are the
/// gaussian weighted sums of each map.
#[derive(Debug, Clone)]
pub struct PrfPoolingLoader {
    params: PoolingParams,
    n_models: Option<usize>,
    n_pix: usize,
}

impl PrfPoolingLoader {
    /// Create a new loader, channel groups are checked against `n_channels`
    pub fn new(params: PoolingParams) -> Result<Self, FeatureError> {
        if params.n_channels == 0 {
            return Err(FeatureError::InvalidInput("need at least one channel".to_string()));
        }
        grouped_versions(params.n_channels, &params.channel_groups)?;

        Ok(Self {
            params,
            n_models: None,
            n_pix: 0,
        })
    }

    #[inline(always)]
    pub fn params(&self) -> &PoolingParams {
        &self.params
    }

    fn check_model(&self, model_index: usize) -> Result<(), FeatureError> {
        let n_models = self.n_models.ok_or(FeatureError::NotInitialized)?;
        if model_index >= n_models {
            return Err(FeatureError::UnknownModel {
                index: model_index,
                n_models,
            });
        }
        Ok(())
    }
}

impl<T: Real> FeatureLoader<T> for PrfPoolingLoader {
    type Images = [Vec<DMatrix<T>>];

    fn image_size(&self, images: &Self::Images) -> (usize, usize) {
        images
            .first()
            .and_then(|channels| channels.first())
            .map(|m| m.shape())
            .unwrap_or((0, 0))
    }

    #[inline(always)]
    fn n_trials(&self, images: &Self::Images) -> usize {
        images.len()
    }

    fn init_for_fitting(
        &mut self,
        image_size: (usize, usize),
        models: &[CandidateModel],
    ) -> Result<(), FeatureError> {
        if image_size.0 != image_size.1 || image_size.0 == 0 {
            return Err(FeatureError::InvalidInput(format!(
                "feature maps must be square and non-empty, got {:?}",
                image_size
            )));
        }
        info!(
            "pooling loader initialized for {} candidates over {} channels of {}x{} maps",
            models.len(),
            self.params.n_channels,
            image_size.0,
            image_size.1
        );
        self.n_models = Some(models.len());
        self.n_pix = image_size.0;

        Ok(())
    }

    fn max_features(&self) -> Result<usize, FeatureError> {
        self.n_models.ok_or(FeatureError::NotInitialized)?;
        Ok(self.params.n_channels)
    }

    fn n_features(&self, model_index: usize) -> Result<usize, FeatureError> {
        self.check_model(model_index)?;
        Ok(self.params.n_channels)
    }

    fn partial_versions(&self) -> Result<PartialVersions, FeatureError> {
        self.n_models.ok_or(FeatureError::NotInitialized)?;
        grouped_versions(self.params.n_channels, &self.params.channel_groups)
    }

    fn load(
        &mut self,
        images: &Self::Images,
        model: &CandidateModel,
        model_index: usize,
        _mode: ExtractionMode,
    ) -> Result<Features<T>, FeatureError> {
        self.check_model(model_index)?;
        let prf: DMatrix<T> =
            make_gaussian_mass(model.x, model.y, model.sigma, self.n_pix, self.params.aperture)?;

        let n_channels = self.params.n_channels;
        let mut matrix = DMatrix::<T>::zeros(images.len(), n_channels);
        for (t, channels) in images.iter().enumerate() {
            if channels.len() != n_channels {
                return Err(FeatureError::WidthMismatch {
                    model_index,
                    declared: n_channels,
                    actual: channels.len(),
                });
            }
            for (c, map) in channels.iter().enumerate() {
                if map.shape() != prf.shape() {
                    return Err(FeatureError::InvalidInput(format!(
                        "trial {} channel {} is {:?}, expected {:?}",
                        t,
                        c,
                        map.shape(),
                        prf.shape()
                    )));
                }
                matrix[(t, c)] = map.dot(&prf);
            }
        }
        debug!(
            "pooled {} trials for candidate {} at [{:.2} {:.2} {:.4}]",
            images.len(),
            model_index,
            model.x,
            model.y,
            model.sigma
        );

        Ok(Features {
            matrix,
            defined: DefinedMask::leading(n_channels, n_channels),
        })
    }
}
