pub mod grubbs;
pub mod none;

use std::collections::HashSet;

/// Trait for pluggable rejection of outlying bucket members
pub trait OutlierExcluder {
    /// Returns indices of values to reject
    fn find_outliers(&self, values: &[f64]) -> Vec<usize>;

    /// Name of the algorithm for logging
    fn name(&self) -> &'static str;
}

/// Configuration for bucket outlier rejection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutlierMethod {
    /// Average every bucket member
    #[default]
    None,
    /// Grubbs' test on the reference values with significance level `alpha`
    Grubbs { alpha: f64 },
}

impl OutlierMethod {
    /// Create an outlier excluder instance
    pub fn create(&self) -> Box<dyn OutlierExcluder> {
        match self {
            OutlierMethod::None => Box::new(none::NoOutlierExcluder),
            OutlierMethod::Grubbs { alpha } => Box::new(grubbs::GrubbsExcluder::new(*alpha)),
        }
    }
}

/// Keep the items whose key `excluder` does not flag, in order
pub fn retain_inliers<T: Copy>(
    excluder: &dyn OutlierExcluder,
    items: &[T],
    key: impl Fn(&T) -> f64,
) -> Vec<T> {
    let values: Vec<f64> = items.iter().map(&key).collect();
    let rejected: HashSet<usize> = excluder.find_outliers(&values).into_iter().collect();

    items
        .iter()
        .enumerate()
        .filter(|(i, _)| !rejected.contains(i))
        .map(|(_, item)| *item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockExcluder;

    impl OutlierExcluder for MockExcluder {
        fn find_outliers(&self, _values: &[f64]) -> Vec<usize> {
            vec![1, 3]
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    #[test]
    fn test_retain_inliers_drops_flagged_items() {
        let items = vec![(1.0, 'a'), (100.0, 'b'), (2.0, 'c'), (200.0, 'd'), (3.0, 'e')];
        let kept = retain_inliers(&MockExcluder, &items, |item| item.0);

        assert_eq!(kept, vec![(1.0, 'a'), (2.0, 'c'), (3.0, 'e')]);
    }

    #[test]
    fn test_outlier_method_default_is_none() {
        assert_eq!(OutlierMethod::default(), OutlierMethod::None);
        assert_eq!(OutlierMethod::default().create().name(), "None");
    }

    #[test]
    fn test_outlier_method_create_grubbs() {
        let excluder = OutlierMethod::Grubbs { alpha: 0.05 }.create();
        assert_eq!(excluder.name(), "Grubbs");
    }
}
