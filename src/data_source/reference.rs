use std::io::BufRead;

use chrono_tz::Tz;

use super::{LogFormat, ParseStats};
use crate::error::CalibrationError;
use crate::protocol::{Sample, parse_reference_line};

/// Tab-separated log written by the reference PAR meter
///
/// No header row; the meter clock runs in local time `tz`.
pub struct ReferenceLog {
    tz: Tz,
}

impl ReferenceLog {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl LogFormat for ReferenceLog {
    fn read_samples(&self, reader: &mut dyn BufRead) -> Result<Vec<Sample>, CalibrationError> {
        let mut samples = Vec::new();
        let mut stats = ParseStats::default();
        let mut buf = Vec::new();
        let mut line_number = 0usize;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_number += 1;

            // Undecodable bytes become U+FFFD and fail field parsing below
            let line = String::from_utf8_lossy(&buf);
            if line.trim().is_empty() {
                continue;
            }

            match parse_reference_line(&line, self.tz) {
                Ok(sample) => {
                    stats.accepted += 1;
                    samples.push(sample);
                }
                Err(e) => {
                    stats.skipped += 1;
                    tracing::trace!("Skipping reference line {}: {}", line_number, e);
                }
            }
        }

        stats.log_summary(self.name());
        Ok(samples)
    }

    fn name(&self) -> &'static str {
        "reference"
    }
}
