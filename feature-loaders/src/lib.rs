//! Reference implementations of `common::FeatureLoader`

#[macro_use]
extern crate log;

mod gaussian;
mod groups;
mod pca;
mod pooling;
mod precomputed;

pub use gaussian::make_gaussian_mass;
pub use groups::grouped_versions;
pub use pca::{PcaParams, PcaReducingLoader, PcaTransform, ReductionState};
pub use pooling::{PoolingParams, PrfPoolingLoader};
pub use precomputed::PrecomputedLoader;
