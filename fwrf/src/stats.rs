//! Goodness of fit measures, computed along the trial axis

use common::Real;
use nalgebra::DMatrix;

use crate::FitError;

fn check_shapes<T>(actual: &DMatrix<T>, predicted: &DMatrix<T>) -> Result<(), FitError> {
    if actual.shape() != predicted.shape() {
        return Err(FitError::Consistency(format!(
            "actual values are {:?} but predictions are {:?}",
            actual.shape(),
            predicted.shape()
        )));
    }
    Ok(())
}

fn column_f64<T: Real>(m: &DMatrix<T>, c: usize) -> Vec<f64> {
    m.column(c).iter().map(|v| nalgebra::convert_unchecked::<T, f64>(*v)).collect()
}

/// Coefficient of determination `1 - SSres / SStot` of every column.
/// Make sure the arguments are actual and then predicted, not flipped.
pub fn r2<T: Real>(actual: &DMatrix<T>, predicted: &DMatrix<T>) -> Result<Vec<f64>, FitError> {
    check_shapes(actual, predicted)?;

    Ok((0..actual.ncols())
        .map(|c| {
            let a = column_f64(actual, c);
            let p = column_f64(predicted, c);
            let mean = a.iter().sum::<f64>() / a.len() as f64;
            let ss_res: f64 = a.iter().zip(p.iter()).map(|(a, p)| (p - a).powi(2)).sum();
            let ss_tot: f64 = a.iter().map(|a| (a - mean).powi(2)).sum();
            if ss_tot == 0.0 {
                warn!("column {} has zero variance, r2 is undefined", c);
                return f64::NAN;
            }
            1.0 - ss_res / ss_tot
        })
        .collect())
}

/// Pearson correlation between the matching columns of `actual` and `predicted`.
/// A column without variance yields NaN.
pub fn corrcoef<T: Real>(
    actual: &DMatrix<T>,
    predicted: &DMatrix<T>,
) -> Result<Vec<f64>, FitError> {
    check_shapes(actual, predicted)?;

    Ok((0..actual.ncols())
        .map(|c| {
            let a = column_f64(actual, c);
            let p = column_f64(predicted, c);
            let n = a.len() as f64;
            let ma = a.iter().sum::<f64>() / n;
            let mp = p.iter().sum::<f64>() / n;
            let mut cov = 0.0;
            let mut va = 0.0;
            let mut vp = 0.0;
            for (a, p) in a.iter().zip(p.iter()) {
                cov += (a - ma) * (p - mp);
                va += (a - ma).powi(2);
                vp += (p - mp).powi(2);
            }
            if va == 0.0 || vp == 0.0 {
                warn!("column {} has zero variance, correlation is NaN", c);
                return f64::NAN;
            }
            cov / (va * vp).sqrt()
        })
        .collect())
}

/// Variance partition of two feature groups
#[derive(Debug, Clone, PartialEq)]
pub struct SharedUniqueVar {
    /// Explained by both groups
    pub shared: Vec<f64>,
    /// Explained by group a alone
    pub unique_a: Vec<f64>,
    /// Explained by group b alone
    pub unique_b: Vec<f64>,
}

/// Split the explained variance of a combined model into shared and unique parts.
///
/// # Arguments:
/// combined: Explained variance of the model using both groups
/// just_a: Explained variance of the model using only group a
/// just_b: Explained variance of the model using only group b
pub fn shared_unique_var(
    combined: &[f64],
    just_a: &[f64],
    just_b: &[f64],
) -> Result<SharedUniqueVar, FitError> {
    if combined.len() != just_a.len() || combined.len() != just_b.len() {
        return Err(FitError::Consistency(format!(
            "variance vectors differ in length: {}, {}, {}",
            combined.len(),
            just_a.len(),
            just_b.len()
        )));
    }

    let zip = || combined.iter().zip(just_a.iter()).zip(just_b.iter());
    Ok(SharedUniqueVar {
        shared: zip().map(|((c, a), b)| a + b - c).collect(),
        unique_a: zip().map(|((c, _), b)| c - b).collect(),
        unique_b: zip().map(|((c, a), _)| c - a).collect(),
    })
}

#[cfg(test)]
mod tests {
    use round::round;

    use super::*;

    #[test]
    fn perfect_and_flipped() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let actual = DMatrix::from_column_slice(4, 2, &[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0]);
        let predicted = DMatrix::from_column_slice(4, 2, &[1.0, 2.0, 3.0, 4.0, 4.0, 3.0, 2.0, 1.0]);

        let cc = corrcoef(&actual, &predicted).unwrap();
        assert_eq!(round(cc[0], 9), 1.0);
        assert_eq!(round(cc[1], 9), -1.0);

        let r2 = r2(&actual, &predicted).unwrap();
        assert_eq!(round(r2[0], 9), 1.0);
        // SSres = 9 + 1 + 1 + 9, SStot = 5
        assert_eq!(round(r2[1], 9), -3.0);
    }

    #[test]
    fn zero_variance_is_nan() {
        let actual = DMatrix::from_column_slice(3, 1, &[1.0, 2.0, 3.0]);
        let flat = DMatrix::from_column_slice(3, 1, &[2.0, 2.0, 2.0]);
        assert!(corrcoef(&actual, &flat).unwrap()[0].is_nan());
        assert!(r2(&flat, &actual).unwrap()[0].is_nan());
        assert!(r2(&actual, &DMatrix::zeros(2, 1)).is_err());
    }

    #[test]
    fn variance_partition() {
        let parts = shared_unique_var(&[0.5, 0.3], &[0.3, 0.3], &[0.4, 0.0]).unwrap();
        let r = |v: &[f64]| v.iter().map(|v| round(*v, 9)).collect::<Vec<_>>();
        assert_eq!(r(&parts.shared), vec![0.2, 0.0]);
        assert_eq!(r(&parts.unique_a), vec![0.1, 0.3]);
        assert_eq!(r(&parts.unique_b), vec![0.2, 0.0]);

        assert!(shared_unique_var(&[0.5], &[], &[0.1]).is_err());
    }
}
