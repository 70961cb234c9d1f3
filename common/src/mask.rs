/// Marks which of the `max_features` columns a feature extraction actually produced.
/// Column `k` of a feature matrix belongs to the `k`-th `true` position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedMask(Vec<bool>);

impl DefinedMask {
    /// Wrap a boolean vector of length `max_features`
    #[inline(always)]
    pub fn new(defined: Vec<bool>) -> Self {
        Self(defined)
    }

    /// The first `n_defined` of `max_features` columns are defined
    pub fn leading(n_defined: usize, max_features: usize) -> Self {
        Self((0..max_features).map(|i| i < n_defined).collect())
    }

    /// Total width, defined or not
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the mask has zero width
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of defined columns
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.0.iter().filter(|d| **d).count()
    }

    /// Whether column `i` is defined
    #[inline(always)]
    pub fn get(&self, i: usize) -> bool {
        self.0.get(i).copied().unwrap_or(false)
    }

    #[inline(always)]
    #[allow(missing_docs)]
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Positions of the defined columns, in order
    pub fn positions(&self) -> Vec<usize> {
        self.0.iter().enumerate().filter(|(_, d)| **d).map(|(i, _)| i).collect()
    }

    /// The mask with an always defined intercept column appended
    pub fn with_bias(&self) -> Self {
        let mut defined = self.0.clone();
        defined.push(true);
        Self(defined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_and_positions() {
        let m = DefinedMask::leading(2, 4);
        assert_eq!(m.as_slice(), &[true, true, false, false]);
        assert_eq!(m.count(), 2);
        assert_eq!(m.positions(), vec![0, 1]);

        let b = m.with_bias();
        assert_eq!(b.len(), 5);
        assert_eq!(b.positions(), vec![0, 1, 4]);
        assert!(!b.get(9));
    }
}
