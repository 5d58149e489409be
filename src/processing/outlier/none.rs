use super::OutlierExcluder;

/// Keeps every bucket member
pub struct NoOutlierExcluder;

impl OutlierExcluder for NoOutlierExcluder {
    fn find_outliers(&self, _values: &[f64]) -> Vec<usize> {
        Vec::new()
    }

    fn name(&self) -> &'static str {
        "None"
    }
}
