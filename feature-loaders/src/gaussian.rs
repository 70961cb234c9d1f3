use common::{FeatureError, Real};
use nalgebra::DMatrix;

/// A gaussian receptive field sampled on an `n_pix × n_pix` grid and normalized to unit mass.
/// The grid spans `aperture` in both directions, centered on the origin, with `y` pointing
/// up so row 0 is the top of the image.
pub fn make_gaussian_mass<T: Real>(
    x: f64,
    y: f64,
    sigma: f64,
    n_pix: usize,
    aperture: f64,
) -> Result<DMatrix<T>, FeatureError> {
    if !(sigma > 0.0) || !(aperture > 0.0) || n_pix == 0 {
        return Err(FeatureError::InvalidInput(format!(
            "gaussian needs sigma > 0, aperture > 0 and n_pix > 0, got {}, {}, {}",
            sigma, aperture, n_pix
        )));
    }

    let pix = aperture / n_pix as f64;
    let center = |k: usize| -aperture / 2.0 + pix * (k as f64 + 0.5);
    let g = DMatrix::<f64>::from_fn(n_pix, n_pix, |r, c| {
        let dx = center(c) - x;
        let dy = -center(r) - y;
        (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
    });
    let mass = g.sum();
    if !(mass > 0.0) {
        return Err(FeatureError::InvalidInput(format!(
            "gaussian at ({}, {}) with sigma {} has no mass on the grid",
            x, y, sigma
        )));
    }

    Ok(g.map(|v| nalgebra::convert::<f64, T>(v / mass)))
}

#[cfg(test)]
mod tests {
    use round::round;

    use super::*;

    fn argmax(m: &DMatrix<f64>) -> (usize, usize) {
        let mut best = (0, 0);
        for r in 0..m.nrows() {
            for c in 0..m.ncols() {
                if m[(r, c)] > m[best] {
                    best = (r, c);
                }
            }
        }
        best
    }

    #[test]
    fn unit_mass_and_placement() {
        let g: DMatrix<f64> = make_gaussian_mass(0.0, 0.0, 0.1, 11, 1.0).unwrap();
        assert_eq!(round(g.sum(), 9), 1.0);
        assert_eq!(argmax(&g), (5, 5));

        // right and up
        let g: DMatrix<f64> = make_gaussian_mass(0.3, 0.3, 0.05, 11, 1.0).unwrap();
        let (r, c) = argmax(&g);
        assert!(c > 5);
        assert!(r < 5);
    }

    #[test]
    fn single_precision() {
        let g: DMatrix<f32> = make_gaussian_mass(0.0, 0.1, 0.2, 8, 1.0).unwrap();
        assert!((g.sum() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn invalid_parameters() {
        assert!(make_gaussian_mass::<f64>(0.0, 0.0, 0.0, 8, 1.0).is_err());
        assert!(make_gaussian_mass::<f64>(0.0, 0.0, 0.1, 0, 1.0).is_err());
    }
}
