use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::RecordError;

/// A single timestamped reading from one of the two logs
///
/// Timestamps carry their zone so that readings recorded in different
/// zones compare as instants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Tz>,
    pub value: f64,
}

impl Sample {
    /// Create a sample, rejecting NaN and infinite readings
    pub fn new(timestamp: DateTime<Tz>, value: f64) -> Result<Self, RecordError> {
        if !value.is_finite() {
            return Err(RecordError::NonFinite(value));
        }
        Ok(Self { timestamp, value })
    }
}

/// One photodiode reading paired with the reference PAR reading it was matched to
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignedObservation {
    /// Photodiode output in millivolts (fit input `x`)
    pub photodiode_value: f64,
    /// Reference PAR reading (fit target `y`)
    pub reference_value: f64,
}

impl AlignedObservation {
    pub fn new(photodiode_value: f64, reference_value: f64) -> Self {
        Self {
            photodiode_value,
            reference_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::America::Los_Angeles;

    use super::*;

    #[test]
    fn test_sample_accepts_finite_value() {
        let ts = Los_Angeles.with_ymd_and_hms(2022, 8, 30, 10, 5, 0).unwrap();
        let sample = Sample::new(ts, 412.5).unwrap();

        assert_eq!(sample.value, 412.5);
        assert_eq!(sample.timestamp, ts);
    }

    #[test]
    fn test_sample_rejects_non_finite_value() {
        let ts = Los_Angeles.with_ymd_and_hms(2022, 8, 30, 10, 5, 0).unwrap();

        assert!(Sample::new(ts, f64::NAN).is_err());
        assert!(matches!(
            Sample::new(ts, f64::INFINITY),
            Err(RecordError::NonFinite(_))
        ));
    }

    #[test]
    fn test_samples_in_different_zones_compare_as_instants() {
        let local = Los_Angeles.with_ymd_and_hms(2022, 8, 30, 10, 5, 0).unwrap();
        let utc = chrono_tz::UTC.with_ymd_and_hms(2022, 8, 30, 17, 5, 0).unwrap();

        assert_eq!(local, utc.with_timezone(&Los_Angeles));
        assert!(local.with_timezone(&chrono_tz::UTC) == utc);
    }
}
