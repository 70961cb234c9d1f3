use common::FeatureError;
use lin_reg::LinRegError;
use thiserror::Error;

/// Everything that aborts a fit or a validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    /// Settings that cannot work with the data at hand
    #[error("Configuration error: {0}")]
    Config(String),

    /// The feature loader failed
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// The ridge solve failed
    #[error(transparent)]
    Numerical(#[from] LinRegError),

    /// Shapes reported by a collaborator disagree with each other
    #[error("Consistency error: {0}")]
    Consistency(String),
}
