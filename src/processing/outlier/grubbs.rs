use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

use super::OutlierExcluder;

/// Iterated two-sided Grubbs' test
///
/// Removes the most extreme value while its G statistic exceeds the critical
/// value, stopping when fewer than 3 values remain.
pub struct GrubbsExcluder {
    alpha: f64,
}

impl GrubbsExcluder {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// Critical G for a sample of size `n`
    fn critical_value(&self, n: usize) -> f64 {
        let n = n as f64;
        let df = n - 2.0;

        let Ok(t_dist) = StudentsT::new(0.0, 1.0, df) else {
            return f64::INFINITY;
        };
        let t = t_dist.inverse_cdf(1.0 - self.alpha / (2.0 * n));
        let t2 = t * t;

        (n - 1.0) / n.sqrt() * (t2 / (df + t2)).sqrt()
    }
}

/// Position and G statistic of the value furthest from the mean
fn most_extreme(values: &[f64]) -> Option<(usize, f64)> {
    let mean = values.mean();
    let std_dev = values.std_dev();

    if std_dev.is_nan() || std_dev == 0.0 {
        return None;
    }

    values
        .iter()
        .map(|v| (v - mean).abs() / std_dev)
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

impl OutlierExcluder for GrubbsExcluder {
    fn find_outliers(&self, values: &[f64]) -> Vec<usize> {
        let mut remaining: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
        let mut outliers = Vec::new();

        while remaining.len() >= 3 {
            let current: Vec<f64> = remaining.iter().map(|(_, v)| *v).collect();

            let Some((position, g)) = most_extreme(&current) else {
                break;
            };
            if g <= self.critical_value(current.len()) {
                break;
            }

            let (index, _) = remaining.remove(position);
            outliers.push(index);
        }

        outliers
    }

    fn name(&self) -> &'static str {
        "Grubbs"
    }
}
