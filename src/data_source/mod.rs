pub mod photodiode;
pub mod reference;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::CalibrationError;
use crate::protocol::Sample;

pub use photodiode::PhotodiodeLog;
pub use reference::ReferenceLog;

/// Trait for the supported sensor log formats
///
/// Implementations turn a line source into samples. Malformed rows are
/// skipped, never reported as errors; only I/O failures are.
pub trait LogFormat {
    /// Read every sample the source contains, in file order
    fn read_samples(&self, reader: &mut dyn BufRead) -> Result<Vec<Sample>, CalibrationError>;

    /// Name of the format for logging
    fn name(&self) -> &'static str;
}

/// Accepted/skipped row tally for one parse pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    pub accepted: usize,
    pub skipped: usize,
}

impl ParseStats {
    fn log_summary(&self, format: &str) {
        tracing::debug!(
            "{} log: {} rows accepted, {} rows skipped",
            format,
            self.accepted,
            self.skipped
        );
    }
}

/// Open `path` and parse it with `format`
///
/// The file handle only lives for the duration of the parse.
pub fn load_samples(path: &Path, format: &dyn LogFormat) -> Result<Vec<Sample>, CalibrationError> {
    let samples = {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        format.read_samples(&mut reader)?
    };

    tracing::info!(
        "Loaded {} samples from {} log {:?}",
        samples.len(),
        format.name(),
        path
    );

    Ok(samples)
}
