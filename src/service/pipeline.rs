use chrono::TimeDelta;
use serde::Serialize;

use crate::error::CalibrationError;
use crate::processing::alignment::{AlignmentMode, TimeAligner};
use crate::processing::binning::{Bucket, DEFAULT_BUCKET_WIDTH, Smoother};
use crate::processing::fit::{CurveFitter, FitResult, FitSettings, r_squared};
use crate::processing::model::ModelKind;
use crate::processing::noise::{DEFAULT_PAR_THRESHOLD, DEFAULT_PHOTODIODE_THRESHOLD, NoiseFilter};
use crate::processing::outlier::OutlierMethod;
use crate::protocol::{AlignedObservation, Sample};

/// Settings for one calibration run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Minimum PAR step between consecutive observations; negative disables
    pub par_threshold: f64,
    /// Minimum photodiode step (mV) between consecutive observations; negative disables
    pub photodiode_threshold: f64,
    pub bucket_width: f64,
    /// Samples dropped from each end of both series before alignment
    pub truncate: usize,
    pub alignment: AlignmentMode,
    /// Largest asof gap accepted; unbounded when `None`
    pub tolerance: Option<TimeDelta>,
    pub model: ModelKind,
    pub initial_guess: Option<Vec<f64>>,
    pub fit: FitSettings,
    pub outlier_method: OutlierMethod,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            par_threshold: DEFAULT_PAR_THRESHOLD,
            photodiode_threshold: DEFAULT_PHOTODIODE_THRESHOLD,
            bucket_width: DEFAULT_BUCKET_WIDTH,
            truncate: 0,
            alignment: AlignmentMode::default(),
            tolerance: None,
            model: ModelKind::default(),
            initial_guess: None,
            fit: FitSettings::default(),
            outlier_method: OutlierMethod::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !self.bucket_width.is_finite() || self.bucket_width <= 0.0 {
            return Err(CalibrationError::Config(format!(
                "bucket width must be a positive number, got {}",
                self.bucket_width
            )));
        }

        if !self.par_threshold.is_finite() || !self.photodiode_threshold.is_finite() {
            return Err(CalibrationError::Config(
                "noise thresholds must be finite".to_string(),
            ));
        }

        if let Some(tolerance) = self.tolerance {
            if tolerance < TimeDelta::zero() {
                return Err(CalibrationError::Config(
                    "alignment tolerance must not be negative".to_string(),
                ));
            }
        }

        let expected = self.model.create().parameter_count();
        if let Some(guess) = &self.initial_guess {
            if guess.len() != expected {
                return Err(CalibrationError::Config(format!(
                    "{} model takes {} initial parameters, got {}",
                    self.model.name(),
                    expected,
                    guess.len()
                )));
            }
            if guess.iter().any(|p| !p.is_finite()) {
                return Err(CalibrationError::Config(
                    "initial guess must be finite".to_string(),
                ));
            }
        }

        let FitSettings {
            ftol, xtol, gtol, ..
        } = self.fit;
        if [ftol, xtol, gtol].iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(CalibrationError::Config(
                "optimizer tolerances must be finite and non-negative".to_string(),
            ));
        }
        if self.fit.patience == 0 {
            return Err(CalibrationError::Config(
                "optimizer patience must be at least 1".to_string(),
            ));
        }

        if let OutlierMethod::Grubbs { alpha } = self.outlier_method {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(CalibrationError::Config(format!(
                    "Grubbs alpha must be in (0, 1), got {alpha}"
                )));
            }
        }

        Ok(())
    }
}

/// How many items survived each stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub reference_samples: usize,
    pub photodiode_samples: usize,
    pub aligned: usize,
    pub filtered: usize,
    pub buckets: usize,
}

/// Outcome of a successful calibration run
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationReport {
    pub fit: FitResult,
    pub equation: String,
    pub r_squared: Option<f64>,
    pub counts: StageCounts,
    pub buckets: Vec<Bucket>,
}

impl CalibrationReport {
    /// Bucket representatives the curve was fitted to
    pub fn points(&self) -> Vec<AlignedObservation> {
        self.buckets.iter().map(|b| b.representative).collect()
    }
}

/// Align, filter, smooth and fit two sample series
pub struct CalibrationPipeline {
    aligner: TimeAligner,
    noise_filter: NoiseFilter,
    smoother: Smoother,
    fitter: CurveFitter,
}

impl CalibrationPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self, CalibrationError> {
        config.validate()?;

        Ok(Self {
            aligner: TimeAligner::new(config.alignment, config.tolerance, config.truncate),
            noise_filter: NoiseFilter::new(config.par_threshold, config.photodiode_threshold),
            smoother: Smoother::new(config.bucket_width, config.outlier_method.create()),
            fitter: CurveFitter::new(config.model, config.initial_guess.clone(), config.fit),
        })
    }

    /// Run every stage; each one returns a new sequence
    pub fn run(
        &self,
        reference: &[Sample],
        photodiode: &[Sample],
    ) -> Result<CalibrationReport, CalibrationError> {
        let mut counts = StageCounts {
            reference_samples: reference.len(),
            photodiode_samples: photodiode.len(),
            ..StageCounts::default()
        };

        let aligned = self.aligner.align(reference, photodiode);
        counts.aligned = aligned.len();
        if aligned.is_empty() {
            return Err(CalibrationError::EmptyAlignment {
                stage: "alignment",
                truncate: self.aligner.truncate(),
            });
        }

        let filtered = self.noise_filter.filter(&aligned);
        counts.filtered = filtered.len();
        if filtered.is_empty() {
            return Err(CalibrationError::EmptyAlignment {
                stage: "noise filtering",
                truncate: self.aligner.truncate(),
            });
        }

        let buckets = self.smoother.smooth(&filtered)?;
        counts.buckets = buckets.len();

        let (x, y): (Vec<f64>, Vec<f64>) = buckets
            .iter()
            .map(|b| (b.representative.photodiode_value, b.representative.reference_value))
            .unzip();

        let fit = self.fitter.fit(&x, &y)?;

        let predicted: Vec<f64> = x.iter().map(|&x| fit.predict(x)).collect();
        let r_squared = r_squared(&y, &predicted);
        let equation = fit.equation();

        tracing::info!(
            "Fitted {} model to {} buckets: {} (R² = {})",
            fit.model.name(),
            counts.buckets,
            equation,
            r_squared.map_or_else(|| "n/a".to_string(), |r| format!("{r:.5}"))
        );

        Ok(CalibrationReport {
            fit,
            equation,
            r_squared,
            counts,
            buckets,
        })
    }
}
