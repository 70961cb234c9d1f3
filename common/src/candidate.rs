use std::f64::consts::PI;

/// A spatial population receptive field hypothesis.
/// Identified by its index into the ordered candidate list it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateModel {
    /// Horizontal center, in units of the image aperture
    pub x: f64,
    /// Vertical center, in units of the image aperture
    pub y: f64,
    /// Standard deviation of the gaussian
    pub sigma: f64,
}

impl CandidateModel {
    /// Create a new candidate
    #[inline(always)]
    pub fn new(x: f64, y: f64, sigma: f64) -> Self {
        Self { x, y, sigma }
    }

    /// Candidates placed on concentric rings.
    /// Sizes vary slowest, then eccentricity, then polar angle.
    /// A zero eccentricity contributes a single centered candidate.
    ///
    /// # Arguments:
    /// eccentricities: Distances of the rings from the center
    /// n_angles: Number of evenly spaced polar angles per ring
    /// sigmas: Sizes to place at each position
    pub fn polar_grid(eccentricities: &[f64], n_angles: usize, sigmas: &[f64]) -> Vec<Self> {
        let mut models = Vec::with_capacity(sigmas.len() * eccentricities.len() * n_angles.max(1));
        for &sigma in sigmas {
            for &ecc in eccentricities {
                if ecc == 0.0 {
                    models.push(Self::new(0.0, 0.0, sigma));
                    continue;
                }
                for a in 0..n_angles {
                    let angle = 2.0 * PI * a as f64 / n_angles as f64;
                    models.push(Self::new(ecc * angle.cos(), ecc * angle.sin(), sigma));
                }
            }
        }

        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polar_grid_layout() {
        let models = CandidateModel::polar_grid(&[0.0, 0.2], 4, &[0.05, 0.1]);
        assert_eq!(models.len(), 2 * (1 + 4));

        assert_eq!(models[0], CandidateModel::new(0.0, 0.0, 0.05));
        assert!((models[1].x - 0.2).abs() < 1e-12);
        assert!(models[1].y.abs() < 1e-12);
        assert!((models[2].y - 0.2).abs() < 1e-12);
        assert_eq!(models[5].sigma, 0.1);
    }
}
