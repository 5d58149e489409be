use chrono::TimeDelta;

use crate::protocol::{AlignedObservation, Sample};

/// How reference readings are matched to photodiode readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentMode {
    /// Latest photodiode sample at or before each reference sample
    #[default]
    Asof,
    /// Only photodiode samples with exactly the reference timestamp
    Exact,
}

/// Pairs the reference series with the photodiode series by timestamp
#[derive(Debug, Clone)]
pub struct TimeAligner {
    mode: AlignmentMode,
    tolerance: Option<TimeDelta>,
    truncate: usize,
}

impl TimeAligner {
    pub fn new(mode: AlignmentMode, tolerance: Option<TimeDelta>, truncate: usize) -> Self {
        Self {
            mode,
            tolerance,
            truncate,
        }
    }

    pub fn truncate(&self) -> usize {
        self.truncate
    }

    /// Align two sample series
    ///
    /// Both inputs are sorted by timestamp (stable) and trimmed by `truncate`
    /// samples at each end first. Output follows reference time order. A
    /// reference sample with no photodiode sample at or before it, or one
    /// further back than the tolerance, produces nothing.
    pub fn align(&self, reference: &[Sample], photodiode: &[Sample]) -> Vec<AlignedObservation> {
        let reference = sorted_and_truncated(reference, self.truncate);
        let photodiode = sorted_and_truncated(photodiode, self.truncate);

        let mut aligned = Vec::with_capacity(reference.len());
        // Number of photodiode samples at or before the current reference time
        let mut cursor = 0;

        for sample in &reference {
            while cursor < photodiode.len() && photodiode[cursor].timestamp <= sample.timestamp {
                cursor += 1;
            }

            let Some(candidate) = cursor.checked_sub(1).map(|i| &photodiode[i]) else {
                continue;
            };

            if !self.accepts(candidate, sample) {
                continue;
            }

            aligned.push(AlignedObservation::new(candidate.value, sample.value));
        }

        tracing::debug!(
            "Aligned {} of {} reference samples ({:?}, truncate={})",
            aligned.len(),
            reference.len(),
            self.mode,
            self.truncate
        );

        aligned
    }

    fn accepts(&self, photodiode: &Sample, reference: &Sample) -> bool {
        let gap = reference.timestamp.signed_duration_since(photodiode.timestamp);

        match self.mode {
            AlignmentMode::Exact => gap.is_zero(),
            AlignmentMode::Asof => self.tolerance.is_none_or(|tolerance| gap <= tolerance),
        }
    }
}

fn sorted_and_truncated(samples: &[Sample], truncate: usize) -> Vec<Sample> {
    if samples.len() <= truncate.saturating_mul(2) {
        return Vec::new();
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by_key(|s| s.timestamp);
    sorted[truncate..sorted.len() - truncate].to_vec()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone};
    use chrono_tz::America::Los_Angeles;
    use chrono_tz::Tz;

    use super::*;

    fn at(minute: u32) -> DateTime<Tz> {
        Los_Angeles
            .with_ymd_and_hms(2022, 8, 30, 10, minute, 0)
            .unwrap()
    }

    fn sample(minute: u32, value: f64) -> Sample {
        Sample::new(at(minute), value).unwrap()
    }

    fn asof() -> TimeAligner {
        TimeAligner::new(AlignmentMode::Asof, None, 0)
    }

    #[test]
    fn test_asof_matches_equal_timestamps() {
        let reference: Vec<Sample> = (0..5).map(|m| sample(m, 100.0 + m as f64)).collect();
        let photodiode: Vec<Sample> = (0..5).map(|m| sample(m, 10.0 + m as f64)).collect();

        let aligned = asof().align(&reference, &photodiode);

        assert_eq!(aligned.len(), 5);
        assert_eq!(aligned[0], AlignedObservation::new(10.0, 100.0));
        assert_eq!(aligned[4], AlignedObservation::new(14.0, 104.0));
    }

    #[test]
    fn test_asof_uses_latest_preceding_sample() {
        let reference = vec![sample(5, 500.0), sample(9, 900.0)];
        let photodiode = vec![sample(2, 2.0), sample(4, 4.0), sample(7, 7.0), sample(10, 10.0)];

        let aligned = asof().align(&reference, &photodiode);

        assert_eq!(
            aligned,
            vec![
                AlignedObservation::new(4.0, 500.0),
                AlignedObservation::new(7.0, 900.0)
            ]
        );
    }

    #[test]
    fn test_asof_never_pairs_with_later_sample() {
        let reference = vec![sample(1, 100.0), sample(6, 600.0)];
        let photodiode = vec![sample(3, 3.0), sample(8, 8.0)];

        let aligned = asof().align(&reference, &photodiode);

        // Minute 1 has no preceding photodiode sample
        assert_eq!(aligned, vec![AlignedObservation::new(3.0, 600.0)]);
    }

    #[test]
    fn test_asof_property_no_closer_sample_skipped() {
        let reference: Vec<Sample> = [3, 7, 8, 15, 21].iter().map(|&m| sample(m, m as f64)).collect();
        let photodiode: Vec<Sample> =
            [1, 2, 6, 8, 12, 20].iter().map(|&m| sample(m, m as f64)).collect();

        let aligned = asof().align(&reference, &photodiode);

        // Values encode minutes, so each pair can be checked against the inputs
        for pair in &aligned {
            let pd = pair.photodiode_value;
            let rf = pair.reference_value;
            assert!(pd <= rf);
            assert!(
                !photodiode
                    .iter()
                    .any(|s| s.value > pd && s.value <= rf)
            );
        }
        assert_eq!(aligned.len(), 5);
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let reference = vec![sample(9, 900.0), sample(5, 500.0)];
        let photodiode = vec![sample(7, 7.0), sample(4, 4.0)];

        let aligned = asof().align(&reference, &photodiode);

        assert_eq!(
            aligned,
            vec![
                AlignedObservation::new(4.0, 500.0),
                AlignedObservation::new(7.0, 900.0)
            ]
        );
    }

    #[test]
    fn test_duplicate_photodiode_timestamps_take_last() {
        let reference = vec![sample(5, 500.0)];
        let photodiode = vec![sample(5, 1.0), sample(5, 2.0)];

        let aligned = asof().align(&reference, &photodiode);

        assert_eq!(aligned, vec![AlignedObservation::new(2.0, 500.0)]);
    }

    #[test]
    fn test_exact_mode_drops_unmatched_minutes() {
        let aligner = TimeAligner::new(AlignmentMode::Exact, None, 0);
        let reference = vec![sample(5, 500.0), sample(6, 600.0), sample(8, 800.0)];
        let photodiode = vec![sample(5, 5.0), sample(7, 7.0), sample(8, 8.0)];

        let aligned = aligner.align(&reference, &photodiode);

        assert_eq!(
            aligned,
            vec![
                AlignedObservation::new(5.0, 500.0),
                AlignedObservation::new(8.0, 800.0)
            ]
        );
    }

    #[test]
    fn test_tolerance_limits_asof_gap() {
        let aligner = TimeAligner::new(AlignmentMode::Asof, Some(TimeDelta::minutes(2)), 0);
        let reference = vec![sample(5, 500.0), sample(20, 2000.0)];
        let photodiode = vec![sample(4, 4.0)];

        let aligned = aligner.align(&reference, &photodiode);

        assert_eq!(aligned, vec![AlignedObservation::new(4.0, 500.0)]);
    }

    #[test]
    fn test_truncate_removes_both_ends_of_each_series() {
        let aligner = TimeAligner::new(AlignmentMode::Exact, None, 1);
        let reference: Vec<Sample> = (0..5).map(|m| sample(m, 100.0 + m as f64)).collect();
        let photodiode: Vec<Sample> = (0..5).map(|m| sample(m, m as f64)).collect();

        let aligned = aligner.align(&reference, &photodiode);

        let reference_values: Vec<f64> = aligned.iter().map(|o| o.reference_value).collect();
        assert_eq!(reference_values, vec![101.0, 102.0, 103.0]);
    }

    #[test]
    fn test_truncate_longer_than_series_yields_nothing() {
        let aligner = TimeAligner::new(AlignmentMode::Asof, None, 3);
        let reference: Vec<Sample> = (0..6).map(|m| sample(m, m as f64)).collect();
        let photodiode: Vec<Sample> = (0..10).map(|m| sample(m, m as f64)).collect();

        assert!(aligner.align(&reference, &photodiode).is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(asof().align(&[], &[sample(1, 1.0)]).is_empty());
        assert!(asof().align(&[sample(1, 1.0)], &[]).is_empty());
    }

    #[test]
    fn test_cross_zone_samples_align_as_instants() {
        let reference = vec![sample(5, 500.0)];
        let utc = chrono_tz::UTC
            .with_ymd_and_hms(2022, 8, 30, 17, 5, 0)
            .unwrap();
        let photodiode = vec![Sample::new(utc, 5.0).unwrap()];

        let aligner = TimeAligner::new(AlignmentMode::Exact, None, 0);
        assert_eq!(
            aligner.align(&reference, &photodiode),
            vec![AlignedObservation::new(5.0, 500.0)]
        );
    }
}
