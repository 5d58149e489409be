use std::io::{self, BufRead};

use chrono_tz::Tz;
use csv::{ReaderBuilder, Trim};

use super::{LogFormat, ParseStats};
use crate::error::{CalibrationError, RecordError};
use crate::protocol::{Sample, parse_photodiode_fields};

/// Column holding the photodiode reading in millivolts
const VALUE_COLUMN: usize = 1;

/// Column holding the UTC `created_at` stamp
const CREATED_AT_COLUMN: usize = 3;

/// CSV feed export from the photodiode logger
///
/// Layout: `id,value,feed_id,created_at,...` with a header row. Timestamps
/// are UTC and get converted to `tz`.
pub struct PhotodiodeLog {
    tz: Tz,
}

impl PhotodiodeLog {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    fn parse_record(&self, record: &csv::StringRecord) -> Result<Sample, RecordError> {
        let value = record
            .get(VALUE_COLUMN)
            .ok_or(RecordError::MissingField("value"))?;
        let created_at = record
            .get(CREATED_AT_COLUMN)
            .ok_or(RecordError::MissingField("created_at"))?;

        parse_photodiode_fields(value, created_at, self.tz)
    }
}

impl LogFormat for PhotodiodeLog {
    fn read_samples(&self, reader: &mut dyn BufRead) -> Result<Vec<Sample>, CalibrationError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut samples = Vec::new();
        let mut stats = ParseStats::default();

        for (index, result) in csv_reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(io::Error::from(e).into()),
                Err(e) => {
                    stats.skipped += 1;
                    tracing::trace!("Skipping photodiode record {}: {}", index + 1, e);
                    continue;
                }
            };

            match self.parse_record(&record) {
                Ok(sample) => {
                    stats.accepted += 1;
                    samples.push(sample);
                }
                Err(e) => {
                    stats.skipped += 1;
                    tracing::trace!("Skipping photodiode record {}: {}", index + 1, e);
                }
            }
        }

        stats.log_summary(self.name());
        Ok(samples)
    }

    fn name(&self) -> &'static str {
        "photodiode"
    }
}
