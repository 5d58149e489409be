use serde::Serialize;
use statrs::statistics::Statistics;

use super::outlier::{OutlierExcluder, retain_inliers};
use crate::error::CalibrationError;
use crate::protocol::AlignedObservation;

/// Default bucket width in photodiode millivolts
pub const DEFAULT_BUCKET_WIDTH: f64 = 5.0;

/// One non-empty photodiode value bucket and its averaged observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    /// `floor((x - min) / width)`
    pub index: usize,
    /// Inclusive lower edge, `min + index * width`
    pub lower_bound: f64,
    /// Observations assigned to the bucket
    pub members: usize,
    /// Members left out of the average by outlier rejection
    pub rejected: usize,
    pub representative: AlignedObservation,
}

/// Averages observations over fixed-width photodiode value buckets
pub struct Smoother {
    width: f64,
    excluder: Box<dyn OutlierExcluder>,
}

impl Smoother {
    pub fn new(width: f64, excluder: Box<dyn OutlierExcluder>) -> Self {
        Self { width, excluder }
    }

    /// Bucket observations by photodiode value and average each bucket
    ///
    /// Buckets start at the smallest photodiode value and are `width` wide.
    /// Empty buckets produce nothing. Output is ordered by photodiode value.
    /// Fails when the photodiode span holds more buckets than `usize` can index.
    pub fn smooth(
        &self,
        observations: &[AlignedObservation],
    ) -> Result<Vec<Bucket>, CalibrationError> {
        let mut sorted = observations.to_vec();
        sorted.sort_by(|a, b| a.photodiode_value.total_cmp(&b.photodiode_value));

        let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
            return Ok(Vec::new());
        };
        let min = first.photodiode_value;

        let last_index = ((last.photodiode_value - min) / self.width).floor();
        if !last_index.is_finite() || last_index >= usize::MAX as f64 {
            return Err(CalibrationError::Config(format!(
                "bucket width {} is too small for a photodiode span of {}",
                self.width,
                last.photodiode_value - min
            )));
        }

        let index_of =
            |o: &AlignedObservation| ((o.photodiode_value - min) / self.width).floor() as usize;

        let buckets: Vec<Bucket> = sorted
            .chunk_by(|a, b| index_of(a) == index_of(b))
            .map(|members| {
                let index = index_of(&members[0]);
                self.average(index, min + index as f64 * self.width, members)
            })
            .collect();

        tracing::debug!(
            "Smoothed {} observations into {} buckets of width {} ({} outlier rejection)",
            observations.len(),
            buckets.len(),
            self.width,
            self.excluder.name()
        );

        Ok(buckets)
    }

    fn average(&self, index: usize, lower_bound: f64, members: &[AlignedObservation]) -> Bucket {
        let inliers = retain_inliers(self.excluder.as_ref(), members, |o| o.reference_value);
        // Never average an empty set
        let averaged = if inliers.is_empty() {
            members
        } else {
            &inliers[..]
        };

        let representative = AlignedObservation::new(
            averaged.iter().map(|o| o.photodiode_value).mean(),
            averaged.iter().map(|o| o.reference_value).mean(),
        );

        Bucket {
            index,
            lower_bound,
            members: members.len(),
            rejected: members.len() - averaged.len(),
            representative,
        }
    }
}
