use crate::FitError;

/// Number of candidate models and voxel batches visited in debug mode
pub const DEBUG_ITERATIONS: usize = 2;

/// Run wide settings of a fit, created once and passed into the fitter
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Z-score every feature column over the fitting trials before the ridge solve
    pub zscore: bool,
    /// Append a constant column so every voxel gets an additive bias
    pub add_bias: bool,
    /// Number of voxels scored together against one cofactor
    pub voxel_batch_size: usize,
    /// Trials withheld from the ridge solve, used to pick the penalty and the candidate
    pub holdout_size: usize,
    /// Permute the trials once before splitting
    pub shuffle: bool,
    /// Optional seed for the trial permutation.
    /// When `None` a fresh one is drawn and reported in the result.
    pub seed: Option<u64>,
    /// Only visit the first few candidate models and voxel batches
    pub debug: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            zscore: false,
            add_bias: false,
            voxel_batch_size: 100,
            holdout_size: 100,
            shuffle: true,
            seed: None,
            debug: false,
        }
    }
}

impl FitConfig {
    /// Check the settings against the number of fitting trials
    ///
    /// # Returns:
    /// The number of training trials
    pub fn validate(&self, n_trials: usize) -> Result<usize, FitError> {
        if self.voxel_batch_size == 0 {
            return Err(FitError::Config("voxel_batch_size must be positive".to_string()));
        }
        if self.holdout_size == 0 {
            return Err(FitError::Config(
                "holdout_size must be positive, the held-out loss selects the model".to_string(),
            ));
        }
        if self.holdout_size >= n_trials {
            return Err(FitError::Config(format!(
                "Training size needs to be greater than zero, {} trials with a holdout of {}",
                n_trials, self.holdout_size
            )));
        }

        Ok(n_trials - self.holdout_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_split() {
        let config = FitConfig {
            holdout_size: 20,
            ..Default::default()
        };
        assert_eq!(config.validate(100).unwrap(), 80);
        assert!(matches!(config.validate(20), Err(FitError::Config(_))));
        assert!(matches!(config.validate(5), Err(FitError::Config(_))));

        let config = FitConfig {
            holdout_size: 0,
            ..Default::default()
        };
        assert!(config.validate(100).is_err());

        let config = FitConfig {
            voxel_batch_size: 0,
            holdout_size: 10,
            ..Default::default()
        };
        assert!(config.validate(100).is_err());
    }
}
