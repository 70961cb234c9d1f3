//! Voxel-wise feature weighted receptive field fitting

#[macro_use]
extern crate log;

mod best_params;
mod config;
mod error;
mod grid_search;
mod stats;
mod validate;

pub use best_params::{BestParams, VersionState};
pub use config::{FitConfig, DEBUG_ITERATIONS};
pub use error::FitError;
pub use grid_search::{FitResult, GridSearch, ZSCORE_EPSILON};
pub use stats::{corrcoef, r2, shared_unique_var, SharedUniqueVar};
pub use validate::{validate, Validation};
