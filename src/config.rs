use std::path::PathBuf;

use chrono::TimeDelta;
use chrono_tz::Tz;
use clap::Parser;

use crate::error::CalibrationError;
use crate::processing::alignment::AlignmentMode;
use crate::processing::fit::FitSettings;
use crate::processing::model::ModelKind;
use crate::processing::outlier::OutlierMethod;
use crate::service::pipeline::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "par-calibration")]
#[command(about = "Fit a photodiode-to-PAR calibration curve from two sensor logs")]
#[command(version)]
pub struct Cli {
    /// Reference quantum sensor log (tab separated: valid flag, datetime, PAR)
    #[arg(short, long)]
    pub reference: PathBuf,

    /// Photodiode CSV export (value in column 1, created_at in column 3)
    #[arg(short, long)]
    pub photodiode: PathBuf,

    /// Minimum PAR change between consecutive observations (negative disables)
    #[arg(long, default_value = "1.0", allow_negative_numbers = true)]
    pub par_threshold: f64,

    /// Minimum photodiode change in mV between consecutive observations (negative disables)
    #[arg(long, default_value = "1.0", allow_negative_numbers = true)]
    pub photodiode_threshold: f64,

    /// Photodiode bucket width in mV
    #[arg(long, default_value = "5.0")]
    pub bucket_width: f64,

    /// Samples dropped from each end of both logs before alignment
    #[arg(long, default_value = "0")]
    pub truncate: usize,

    /// Calibration curve family
    #[arg(long, value_enum, default_value = "log")]
    pub model: ModelArg,

    /// How reference readings are paired with photodiode readings
    #[arg(long, value_enum, default_value = "asof")]
    pub alignment: AlignmentArg,

    /// Largest gap in minutes accepted by asof alignment
    #[arg(long)]
    pub tolerance_minutes: Option<i64>,

    /// IANA timezone of the reference log's wall clock
    #[arg(long, default_value = "America/Los_Angeles")]
    pub reference_tz: String,

    /// Starting parameters for the optimizer, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub initial_guess: Option<Vec<f64>>,

    /// Relative sum-of-squares reduction considered converged
    #[arg(long, default_value = "1e-12")]
    pub ftol: f64,

    /// Relative parameter change considered converged
    #[arg(long, default_value = "1e-12")]
    pub xtol: f64,

    /// Residual/Jacobian orthogonality considered converged
    #[arg(long, default_value = "0")]
    pub gtol: f64,

    /// Evaluation budget, in multiples of (parameters + 1)
    #[arg(long, default_value = "10000")]
    pub patience: usize,

    /// Outlier rejection applied to bucket members before averaging
    #[arg(long, value_enum, default_value = "none")]
    pub outlier_method: OutlierMethodArg,

    /// Alpha value for Grubbs test (significance level)
    #[arg(long, default_value = "0.05")]
    pub grubbs_alpha: f64,

    /// Render observations and the fitted curve to this file (.png or .svg)
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Write the calibration report as JSON to this file
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelArg {
    /// PAR = a*ln(b*x + c) + d (default)
    #[default]
    Log,
    /// PAR = x/a + exp((x - c)/b)
    LinExp,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlignmentArg {
    /// Latest photodiode sample at or before each reference sample (default)
    #[default]
    Asof,
    /// Identical minute timestamps only
    Exact,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutlierMethodArg {
    /// No outlier exclusion (default)
    #[default]
    None,
    /// Grubbs' test
    Grubbs,
}

impl Cli {
    /// Timezone the reference wall clock is interpreted in
    pub fn reference_tz(&self) -> Result<Tz, CalibrationError> {
        self.reference_tz.parse::<Tz>().map_err(|e| {
            CalibrationError::Config(format!("unknown timezone {:?}: {}", self.reference_tz, e))
        })
    }

    /// Convert CLI args to OutlierMethod
    pub fn to_outlier_method(&self) -> OutlierMethod {
        match self.outlier_method {
            OutlierMethodArg::None => OutlierMethod::None,
            OutlierMethodArg::Grubbs => OutlierMethod::Grubbs {
                alpha: self.grubbs_alpha,
            },
        }
    }

    /// Convert CLI args to a validated PipelineConfig
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig, CalibrationError> {
        let tolerance = match self.tolerance_minutes {
            Some(minutes) => Some(TimeDelta::try_minutes(minutes).ok_or_else(|| {
                CalibrationError::Config(format!("tolerance of {minutes} minutes is out of range"))
            })?),
            None => None,
        };

        let config = PipelineConfig {
            par_threshold: self.par_threshold,
            photodiode_threshold: self.photodiode_threshold,
            bucket_width: self.bucket_width,
            truncate: self.truncate,
            alignment: match self.alignment {
                AlignmentArg::Asof => AlignmentMode::Asof,
                AlignmentArg::Exact => AlignmentMode::Exact,
            },
            tolerance,
            model: match self.model {
                ModelArg::Log => ModelKind::Logarithmic,
                ModelArg::LinExp => ModelKind::LinearExponential,
            },
            initial_guess: self.initial_guess.clone(),
            fit: FitSettings {
                ftol: self.ftol,
                xtol: self.xtol,
                gtol: self.gtol,
                patience: self.patience,
            },
            outlier_method: self.to_outlier_method(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 5] = [
        "par-calibration",
        "--reference",
        "licor.txt",
        "--photodiode",
        "adafruit.csv",
    ];

    fn parse(extra: &[&str]) -> Cli {
        Cli::parse_from(REQUIRED.iter().chain(extra).copied())
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&[]);

        assert_eq!(cli.reference, PathBuf::from("licor.txt"));
        assert_eq!(cli.photodiode, PathBuf::from("adafruit.csv"));
        assert_eq!(cli.model, ModelArg::Log);
        assert_eq!(cli.alignment, AlignmentArg::Asof);
        assert!(cli.plot.is_none());
        assert!(cli.json.is_none());

        let config = cli.to_pipeline_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(cli.reference_tz().unwrap(), chrono_tz::America::Los_Angeles);
    }

    #[test]
    fn test_missing_inputs_rejected() {
        let result = Cli::try_parse_from(["par-calibration", "--reference", "licor.txt"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_options() {
        let cli = parse(&[
            "--par-threshold",
            "2.5",
            "--photodiode-threshold",
            "-1",
            "--bucket-width",
            "10",
            "--truncate",
            "3",
            "--model",
            "lin-exp",
            "--alignment",
            "exact",
            "--tolerance-minutes",
            "2",
            "--initial-guess",
            "2.2,45,290",
            "--patience",
            "50",
            "--plot",
            "fit.svg",
        ]);

        let config = cli.to_pipeline_config().unwrap();
        assert_eq!(config.par_threshold, 2.5);
        assert_eq!(config.photodiode_threshold, -1.0);
        assert_eq!(config.bucket_width, 10.0);
        assert_eq!(config.truncate, 3);
        assert_eq!(config.model, ModelKind::LinearExponential);
        assert_eq!(config.alignment, AlignmentMode::Exact);
        assert_eq!(config.tolerance, Some(TimeDelta::minutes(2)));
        assert_eq!(config.initial_guess, Some(vec![2.2, 45.0, 290.0]));
        assert_eq!(config.fit.patience, 50);
        assert_eq!(cli.plot, Some(PathBuf::from("fit.svg")));
    }

    #[test]
    fn test_negative_initial_guess() {
        let cli = parse(&["--initial-guess", "-40,1,2,-900"]);

        assert_eq!(cli.initial_guess, Some(vec![-40.0, 1.0, 2.0, -900.0]));
    }

    #[test]
    fn test_to_outlier_method() {
        let cli = parse(&["--outlier-method", "none"]);
        assert!(matches!(cli.to_outlier_method(), OutlierMethod::None));

        let cli = parse(&["--outlier-method", "grubbs", "--grubbs-alpha", "0.01"]);
        if let OutlierMethod::Grubbs { alpha } = cli.to_outlier_method() {
            assert!((alpha - 0.01).abs() < 0.001);
        } else {
            panic!("Expected Grubbs method");
        }
    }

    #[test]
    fn test_guess_length_must_match_model() {
        let cli = parse(&["--initial-guess", "1,2,3"]);

        assert!(matches!(
            cli.to_pipeline_config(),
            Err(CalibrationError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_bucket_width() {
        let cli = parse(&["--bucket-width", "0"]);

        assert!(matches!(
            cli.to_pipeline_config(),
            Err(CalibrationError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_timezone() {
        let cli = parse(&["--reference-tz", "Mars/Olympus_Mons"]);

        assert!(matches!(cli.reference_tz(), Err(CalibrationError::Config(_))));
    }

    #[test]
    fn test_other_timezone() {
        let cli = parse(&["--reference-tz", "Europe/Berlin"]);

        assert_eq!(cli.reference_tz().unwrap(), chrono_tz::Europe::Berlin);
    }
}
