use super::{CurveModel, linear_regression};

/// Logarithmic response `y = a*ln(b*x + c) + d`
///
/// `b` and `d` trade off against each other (`a*ln(b) + d` is one degree of
/// freedom), so only the curve, `a` and `c/b` are uniquely determined by data.
pub struct Logarithmic;

impl CurveModel for Logarithmic {
    fn parameter_names(&self) -> &'static [&'static str] {
        &["a", "b", "c", "d"]
    }

    fn evaluate(&self, x: f64, params: &[f64]) -> f64 {
        let [a, b, c, d] = unpack(params);
        a * (b * x + c).ln() + d
    }

    fn gradient(&self, x: f64, params: &[f64]) -> Vec<f64> {
        let [a, b, c, _] = unpack(params);
        let u = b * x + c;
        vec![u.ln(), a * x / u, a / u, 1.0]
    }

    /// Start from `ln(x + 1)`, shifted further when readings go negative so
    /// every `b*x + c >= 1`, then solve `a` and `d` linearly.
    fn initial_guess(&self, x: &[f64], y: &[f64]) -> Vec<f64> {
        let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
        let c = if x_min.is_finite() {
            1.0 - x_min.min(0.0)
        } else {
            1.0
        };

        let u: Vec<f64> = x.iter().map(|&x| (x + c).ln()).collect();
        let (a, d) = linear_regression(&u, y).unwrap_or_else(|| {
            let mean = if y.is_empty() {
                0.0
            } else {
                y.iter().sum::<f64>() / y.len() as f64
            };
            (1.0, mean)
        });

        vec![a, 1.0, c, d]
    }

    fn equation(&self, params: &[f64]) -> String {
        let [a, b, c, d] = unpack(params);
        format!("PAR = {a:.6} * ln({b:.6} * x + {c:.6}) + {d:.6}")
    }
}

fn unpack(params: &[f64]) -> [f64; 4] {
    let mut p = [f64::NAN; 4];
    for (slot, value) in p.iter_mut().zip(params) {
        *slot = *value;
    }
    p
}
