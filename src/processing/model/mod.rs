pub mod linear_exponential;
pub mod logarithmic;

use serde::Serialize;

/// Trait for pluggable parametric calibration curves `y = f(x; p)`
pub trait CurveModel {
    /// Parameter names in the order `evaluate` expects them
    fn parameter_names(&self) -> &'static [&'static str];

    /// Model value at `x`
    fn evaluate(&self, x: f64, params: &[f64]) -> f64;

    /// Partial derivatives of the model with respect to each parameter at `x`
    fn gradient(&self, x: f64, params: &[f64]) -> Vec<f64>;

    /// Starting point for the optimizer, derived from the data
    fn initial_guess(&self, x: &[f64], y: &[f64]) -> Vec<f64>;

    /// Human readable equation with the parameters substituted
    fn equation(&self, params: &[f64]) -> String;

    fn parameter_count(&self) -> usize {
        self.parameter_names().len()
    }
}

/// Which calibration curve family to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// `a*ln(b*x + c) + d`
    #[default]
    Logarithmic,
    /// `x/a + exp((x - c)/b)`
    LinearExponential,
}

impl ModelKind {
    /// Create the model implementation
    pub fn create(&self) -> Box<dyn CurveModel> {
        match self {
            ModelKind::Logarithmic => Box::new(logarithmic::Logarithmic),
            ModelKind::LinearExponential => Box::new(linear_exponential::LinearExponential),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Logarithmic => "logarithmic",
            ModelKind::LinearExponential => "linear+exponential",
        }
    }
}

/// Slope and intercept of the ordinary least squares line through `(u, y)`
///
/// Returns `None` when `u` has no spread.
pub(crate) fn linear_regression(u: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    use statrs::statistics::Statistics;

    if u.len() < 2 || u.len() != y.len() {
        return None;
    }

    let variance = u.variance();
    if variance.is_nan() || variance <= 0.0 {
        return None;
    }

    let slope = u.covariance(y) / variance;
    let intercept = y.mean() - slope * u.mean();
    Some((slope, intercept))
}
