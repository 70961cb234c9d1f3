use crate::FeatureError;

/// Name of the version using every feature
pub const FULL_MODEL: &str = "full_model";

/// Ordered feature subsets used for variance partitioning.
/// The first version is always the full model.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialVersions {
    masks: Vec<Vec<bool>>,
    names: Vec<String>,
}

impl PartialVersions {
    /// Only the full model, over `width` features
    pub fn full_only(width: usize) -> Self {
        Self {
            masks: vec![vec![true; width]],
            names: vec![FULL_MODEL.to_string()],
        }
    }

    /// Validate and wrap a set of masks.
    ///
    /// # Arguments:
    /// masks: One boolean vector per version, all of the same width
    /// names: One name per version
    pub fn new(masks: Vec<Vec<bool>>, names: Vec<String>) -> Result<Self, FeatureError> {
        if masks.is_empty() {
            return Err(FeatureError::InvalidPartialVersions("no versions given".to_string()));
        }
        if masks.len() != names.len() {
            return Err(FeatureError::InvalidPartialVersions(format!(
                "{} masks but {} names",
                masks.len(),
                names.len()
            )));
        }
        let width = masks[0].len();
        if masks.iter().any(|m| m.len() != width) {
            return Err(FeatureError::InvalidPartialVersions(
                "masks differ in width".to_string(),
            ));
        }
        if !masks[0].iter().all(|m| *m) {
            return Err(FeatureError::InvalidPartialVersions(format!(
                "the first version ({}) must include every feature",
                names[0]
            )));
        }

        Ok(Self { masks, names })
    }

    /// Number of versions
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// Never true for a validated set
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Width of every mask
    #[inline(always)]
    pub fn width(&self) -> usize {
        self.masks[0].len()
    }

    #[inline(always)]
    #[allow(missing_docs)]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The mask of version `version`
    #[inline(always)]
    pub fn mask(&self, version: usize) -> &[bool] {
        &self.masks[version]
    }

    /// Every mask extended by an always included intercept column
    pub fn with_bias(&self) -> Self {
        let masks = self
            .masks
            .iter()
            .map(|m| {
                let mut m = m.clone();
                m.push(true);
                m
            })
            .collect();

        Self {
            masks,
            names: self.names.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        let ok = PartialVersions::new(
            vec![vec![true, true, true], vec![true, false, false]],
            vec![FULL_MODEL.to_string(), "just_a".to_string()],
        )
        .unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok.width(), 3);
        assert_eq!(ok.with_bias().mask(1), &[true, false, false, true]);

        assert!(PartialVersions::new(vec![], vec![]).is_err());
        assert!(PartialVersions::new(vec![vec![true]], vec![]).is_err());
        assert!(PartialVersions::new(
            vec![vec![true, true], vec![true]],
            vec!["a".to_string(), "b".to_string()]
        )
        .is_err());
        assert!(PartialVersions::new(vec![vec![true, false]], vec!["a".to_string()]).is_err());
    }
}
