use thiserror::Error;

/// Main error type for the calibration pipeline
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No aligned observations left after {stage} (truncated {truncate} samples from each end)")]
    EmptyAlignment { stage: &'static str, truncate: usize },

    #[error("Insufficient data for fit: {points} smoothed points for {parameters} free parameters")]
    InsufficientData { points: usize, parameters: usize },

    #[error(
        "Curve fit did not converge after {evaluations} evaluations ({reason}); last parameters: {parameters:?}"
    )]
    FitDidNotConverge {
        reason: String,
        parameters: Vec<f64>,
        evaluations: usize,
    },

    #[error("Plot rendering error: {0}")]
    Render(String),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_json::Error),
}

/// Per-line record errors. These never leave a parser: the offending line is
/// logged and skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Validity flag is not set: {0:?}")]
    InvalidFlag(String),

    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("Non-finite reading: {0}")]
    NonFinite(f64),

    #[error("Invalid timestamp format: {0:?}")]
    InvalidTimestamp(String),

    #[error("Local time does not exist in source timezone: {0}")]
    NonexistentLocalTime(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_display() {
        let err = RecordError::InvalidFlag("0".to_string());
        assert!(err.to_string().contains("Validity flag"));

        let err = RecordError::InvalidNumber("abc".to_string());
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_calibration_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CalibrationError = io_err.into();
        assert!(matches!(err, CalibrationError::Io(_)));
    }

    #[test]
    fn test_empty_alignment_names_stage() {
        let err = CalibrationError::EmptyAlignment {
            stage: "alignment",
            truncate: 3,
        };
        let message = err.to_string();
        assert!(message.contains("after alignment"));
        assert!(message.contains("truncated 3 samples"));
    }

    #[test]
    fn test_fit_did_not_converge_reports_last_iterate() {
        let err = CalibrationError::FitDidNotConverge {
            reason: "lost patience".to_string(),
            parameters: vec![1.5, 2.0],
            evaluations: 300,
        };
        let message = err.to_string();
        assert!(message.contains("300 evaluations"));
        assert!(message.contains("1.5"));
    }
}
