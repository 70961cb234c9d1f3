use common::{FeatureError, PartialVersions, FULL_MODEL};

/// The full model followed by one `just_<name>` version per named group of feature columns.
/// Without groups this is only the full model.
pub fn grouped_versions(
    width: usize,
    groups: &[(String, Vec<usize>)],
) -> Result<PartialVersions, FeatureError> {
    if groups.is_empty() {
        return Ok(PartialVersions::full_only(width));
    }

    let mut masks = vec![vec![true; width]];
    let mut names = vec![FULL_MODEL.to_string()];
    for (name, cols) in groups {
        let mut mask = vec![false; width];
        for &c in cols {
            if c >= width {
                return Err(FeatureError::InvalidPartialVersions(format!(
                    "group {} refers to column {} of {}",
                    name, c, width
                )));
            }
            mask[c] = true;
        }
        masks.push(mask);
        names.push(format!("just_{}", name));
    }

    PartialVersions::new(masks, names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn just_versions() {
        let v = grouped_versions(3, &[("a".to_string(), vec![0]), ("b".to_string(), vec![1, 2])])
            .unwrap();
        assert_eq!(v.names(), &["full_model", "just_a", "just_b"]);
        assert_eq!(v.mask(2), &[false, true, true]);

        assert!(grouped_versions(2, &[("a".to_string(), vec![2])]).is_err());
        assert_eq!(grouped_versions(2, &[]).unwrap().len(), 1);
    }
}
