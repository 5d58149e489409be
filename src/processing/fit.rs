use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use nalgebra::{DMatrix, DVector, Dyn, Owned};
use serde::Serialize;
use statrs::statistics::Statistics;

use super::model::{CurveModel, ModelKind};
use crate::error::CalibrationError;

/// Residual substituted where the model is undefined, so the solver rejects
/// the step instead of aborting
const UNDEFINED_RESIDUAL: f64 = 1e100;

/// Optimizer settings for the Levenberg–Marquardt solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSettings {
    /// Relative reduction of the sum of squares considered converged
    pub ftol: f64,
    /// Relative parameter change considered converged
    pub xtol: f64,
    /// Orthogonality between residuals and Jacobian columns considered converged
    pub gtol: f64,
    /// Evaluation budget, in multiples of `parameters + 1`
    pub patience: usize,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 0.0,
            patience: 10_000,
        }
    }
}

/// Fitted curve parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub model: ModelKind,
    pub parameters: Vec<f64>,
}

impl FitResult {
    /// Model value at `x` with the fitted parameters
    pub fn predict(&self, x: f64) -> f64 {
        self.model.create().evaluate(x, &self.parameters)
    }

    pub fn equation(&self) -> String {
        self.model.create().equation(&self.parameters)
    }
}

/// Least squares problem `min sum (f(x_i; p) - y_i)^2` over the bucket representatives
struct CurveProblem<'a> {
    model: &'a dyn CurveModel,
    x: &'a [f64],
    y: &'a [f64],
    params: DVector<f64>,
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for CurveProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, p: &DVector<f64>) {
        self.params.copy_from(p);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let p = self.params.as_slice();
        let residuals = DVector::from_iterator(
            self.x.len(),
            self.x.iter().zip(self.y).map(|(&x, &y)| {
                let r = self.model.evaluate(x, p) - y;
                if r.is_finite() { r } else { UNDEFINED_RESIDUAL }
            }),
        );

        Some(residuals)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let p = self.params.as_slice();
        let mut jacobian = DMatrix::zeros(self.x.len(), p.len());

        for (row, &x) in self.x.iter().enumerate() {
            for (col, derivative) in self.model.gradient(x, p).into_iter().enumerate() {
                jacobian[(row, col)] = derivative;
            }
        }

        jacobian.iter().all(|v| v.is_finite()).then_some(jacobian)
    }
}

/// Fits a calibration curve to smoothed observations
pub struct CurveFitter {
    kind: ModelKind,
    model: Box<dyn CurveModel>,
    initial_guess: Option<Vec<f64>>,
    settings: FitSettings,
}

impl CurveFitter {
    pub fn new(kind: ModelKind, initial_guess: Option<Vec<f64>>, settings: FitSettings) -> Self {
        Self {
            kind,
            model: kind.create(),
            initial_guess,
            settings,
        }
    }

    /// Fit the model to `(x, y)` pairs
    ///
    /// Fails with `InsufficientData` when there are fewer points than
    /// parameters, and with `FitDidNotConverge` (carrying the last iterate)
    /// when the solver stops for any reason other than convergence.
    pub fn fit(&self, x: &[f64], y: &[f64]) -> Result<FitResult, CalibrationError> {
        let parameters = self.model.parameter_count();
        let points = x.len().min(y.len());

        if points < parameters {
            return Err(CalibrationError::InsufficientData { points, parameters });
        }

        let start = match &self.initial_guess {
            Some(guess) if guess.len() != parameters => {
                return Err(CalibrationError::Config(format!(
                    "initial guess has {} values, {} model takes {}",
                    guess.len(),
                    self.kind.name(),
                    parameters
                )));
            }
            Some(guess) => guess.clone(),
            None => self.model.initial_guess(&x[..points], &y[..points]),
        };

        tracing::debug!(
            "Fitting {} model to {} points from {:?}",
            self.kind.name(),
            points,
            start
        );

        let problem = CurveProblem {
            model: self.model.as_ref(),
            x: &x[..points],
            y: &y[..points],
            params: DVector::from_vec(start),
        };

        let (problem, report) = LevenbergMarquardt::new()
            .with_ftol(self.settings.ftol)
            .with_xtol(self.settings.xtol)
            .with_gtol(self.settings.gtol)
            .with_patience(self.settings.patience)
            .minimize(problem);

        let fitted: Vec<f64> = problem.params.iter().copied().collect();

        // Hitting machine precision on exact data is as good as converging
        let converged = report.termination.was_successful()
            || matches!(
                report.termination,
                TerminationReason::NoImprovementPossible(_)
            );

        if !converged {
            return Err(CalibrationError::FitDidNotConverge {
                reason: format!("{:?}", report.termination),
                parameters: fitted,
                evaluations: report.number_of_evaluations,
            });
        }

        tracing::debug!(
            "Fit converged after {} evaluations ({:?}), objective {:.6e}",
            report.number_of_evaluations,
            report.termination,
            report.objective_function
        );

        Ok(FitResult {
            model: self.kind,
            parameters: fitted,
        })
    }
}

/// Squared Pearson correlation between observed and predicted values
///
/// `None` when fewer than two points are given or either side is constant.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> Option<f64> {
    if observed.len() < 2 || observed.len() != predicted.len() {
        return None;
    }

    let denominator = observed.std_dev() * predicted.std_dev();
    if denominator.is_nan() || denominator == 0.0 {
        return None;
    }

    let r = observed.covariance(predicted) / denominator;
    Some(r * r)
}
