use super::CurveModel;

/// Linear response with an exponential knee `y = x/a + exp((x - c)/b)`
///
/// Converges poorly from a blind start; pass an explicit initial guess when the
/// knee position is known.
pub struct LinearExponential;

impl CurveModel for LinearExponential {
    fn parameter_names(&self) -> &'static [&'static str] {
        &["a", "b", "c"]
    }

    fn evaluate(&self, x: f64, params: &[f64]) -> f64 {
        let [a, b, c] = unpack(params);
        x / a + ((x - c) / b).exp()
    }

    fn gradient(&self, x: f64, params: &[f64]) -> Vec<f64> {
        let [a, b, c] = unpack(params);
        let e = ((x - c) / b).exp();
        vec![-x / (a * a), -e * (x - c) / (b * b), -e / b]
    }

    /// Split the top of the range evenly between the linear and exponential
    /// terms, with the exponential rising over a quarter of the x span.
    fn initial_guess(&self, x: &[f64], y: &[f64]) -> Vec<f64> {
        let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let y_max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let span = x_max - x_min;
        let b = if span.is_finite() && span > 0.0 {
            span / 4.0
        } else {
            1.0
        };

        let half_top = if y_max.is_finite() { y_max / 2.0 } else { 1.0 };
        let c = if x_max.is_finite() {
            x_max - b * half_top.max(1.0).ln()
        } else {
            0.0
        };

        let a = if x_max.is_finite() && x_max != 0.0 && half_top > 0.0 {
            x_max / half_top
        } else {
            1.0
        };

        vec![a, b, c]
    }

    fn equation(&self, params: &[f64]) -> String {
        let [a, b, c] = unpack(params);
        format!("PAR = x / {a:.6} + exp((x - {c:.6}) / {b:.6})")
    }
}

fn unpack(params: &[f64]) -> [f64; 3] {
    let mut p = [f64::NAN; 3];
    for (slot, value) in p.iter_mut().zip(params) {
        *slot = *value;
    }
    p
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const PARAMS: [f64; 3] = [2.0, 40.0, 300.0];

    #[test]
    fn test_evaluate() {
        // At the knee the exponential term is exactly 1
        assert_relative_eq!(
            LinearExponential.evaluate(300.0, &PARAMS),
            151.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            LinearExponential.evaluate(0.0, &PARAMS),
            (-7.5_f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let x = 340.0;
        let gradient = LinearExponential.gradient(x, &PARAMS);
        let h = 1e-5;

        for i in 0..3 {
            let mut plus = PARAMS;
            let mut minus = PARAMS;
            plus[i] += h;
            minus[i] -= h;
            let numeric = (LinearExponential.evaluate(x, &plus)
                - LinearExponential.evaluate(x, &minus))
                / (2.0 * h);
            assert_relative_eq!(gradient[i], numeric, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_initial_guess_is_finite() {
        let x = [10.0, 100.0, 200.0, 400.0];
        let y = [5.0, 50.0, 101.0, 212.0];
        let guess = LinearExponential.initial_guess(&x, &y);

        assert_eq!(guess.len(), 3);
        assert!(guess.iter().all(|p| p.is_finite()));
        assert!(guess[1] > 0.0);
        for &xi in &x {
            assert!(LinearExponential.evaluate(xi, &guess).is_finite());
        }
    }

    #[test]
    fn test_equation_format() {
        assert_eq!(
            LinearExponential.equation(&[2.0, 40.0, 300.0]),
            "PAR = x / 2.000000 + exp((x - 300.000000) / 40.000000)"
        );
    }
}
