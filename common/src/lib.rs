//! This crate provides the types shared between feature loaders and the model fitting

#![deny(unused_imports)]
#![warn(missing_docs)]

mod candidate;
mod error;
mod feature_loader;
mod mask;
mod partial_versions;

pub use candidate::CandidateModel;
pub use error::FeatureError;
pub use feature_loader::{ExtractionMode, FeatureLoader, Features};
pub use lin_reg::Real;
pub use mask::DefinedMask;
pub use partial_versions::{PartialVersions, FULL_MODEL};
