use thiserror::Error;

/// Failures raised by feature loaders
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureError {
    /// `init_for_fitting` has not been called yet
    #[error("Feature loader is not initialized, call init_for_fitting first")]
    NotInitialized,

    /// A model index outside of the candidate list
    #[error("Candidate model index {index} is out of range for {n_models} candidates")]
    UnknownModel {
        /// The offending index
        index: usize,
        /// Number of known candidates
        n_models: usize,
    },

    /// The features produced do not match the width the loader declared
    #[error("Candidate model {model_index} declared {declared} features, got {actual}")]
    WidthMismatch {
        /// Candidate index
        model_index: usize,
        /// Declared width
        declared: usize,
        /// Width actually produced
        actual: usize,
    },

    /// A reduction was fit a second time for the same candidate
    #[error("Reduction for candidate model {model_index} has already been fit")]
    AlreadyFit {
        /// Candidate index
        model_index: usize,
    },

    /// A reduction was applied before being fit
    #[error("Reduction for candidate model {model_index} has not been fit yet")]
    NotFit {
        /// Candidate index
        model_index: usize,
    },

    /// Malformed variance partition masks
    #[error("Invalid partial versions: {0}")]
    InvalidPartialVersions(String),

    /// Malformed loader parameters or inputs
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
