use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use super::Renderer;
use crate::error::CalibrationError;
use crate::processing::fit::FitResult;
use crate::protocol::AlignedObservation;

const PLOT_WIDTH: u32 = 1280;
const PLOT_HEIGHT: u32 = 800;
const CURVE_SAMPLES: usize = 400;
const RANGE_PADDING: f64 = 0.05;

/// Image format, chosen by output file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotFormat {
    Png,
    Svg,
}

impl PlotFormat {
    pub fn from_path(path: &Path) -> Result<Self, CalibrationError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("png") => Ok(PlotFormat::Png),
            Some("svg") => Ok(PlotFormat::Svg),
            _ => Err(CalibrationError::Config(format!(
                "plot path {path:?} must end in .png or .svg"
            ))),
        }
    }
}

/// Scatter of bucket averages with the fitted curve drawn through them
pub struct PlotRenderer {
    path: PathBuf,
    format: PlotFormat,
}

impl PlotRenderer {
    pub fn new(path: PathBuf) -> Result<Self, CalibrationError> {
        let format = PlotFormat::from_path(&path)?;
        Ok(Self { path, format })
    }
}

impl Renderer for PlotRenderer {
    fn render(
        &self,
        points: &[AlignedObservation],
        fit: &FitResult,
        equation: &str,
    ) -> Result<(), CalibrationError> {
        let size = (PLOT_WIDTH, PLOT_HEIGHT);
        let result = match self.format {
            PlotFormat::Png => {
                let root = BitMapBackend::new(&self.path, size).into_drawing_area();
                draw_chart(root, points, fit, equation)
            }
            PlotFormat::Svg => {
                let root = SVGBackend::new(&self.path, size).into_drawing_area();
                draw_chart(root, points, fit, equation)
            }
        };
        result.map_err(|e| CalibrationError::Render(e.to_string()))?;

        tracing::info!("Saved {:?} calibration plot to {:?}", self.format, self.path);
        Ok(())
    }
}

fn draw_chart<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    points: &[AlignedObservation],
    fit: &FitResult,
    equation: &str,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let xs: Vec<f64> = points.iter().map(|p| p.photodiode_value).collect();
    let x_range = padded_range(&xs);
    let curve = sample_curve(fit, &x_range);

    let ys: Vec<f64> = points
        .iter()
        .map(|p| p.reference_value)
        .chain(curve.iter().map(|&(_, y)| y))
        .collect();
    let y_range = padded_range(&ys);

    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(equation, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Photodiode (mV)")
        .y_desc("PAR (µmol m⁻² s⁻¹)")
        .light_line_style(WHITE.mix(0.7))
        .label_style(("sans-serif", 12))
        .draw()?;

    chart
        .draw_series(points.iter().map(|p| {
            Circle::new((p.photodiode_value, p.reference_value), 3, BLUE.filled())
        }))?
        .label("Bucket averages")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));

    chart
        .draw_series(LineSeries::new(curve, RED.stroke_width(2)))?
        .label(fit.model.name())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 12))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Finite min..max of `values` widened by a fraction on each side
///
/// A single distinct value gets a unit margin; no finite values gives `0..1`.
fn padded_range(values: &[f64]) -> Range<f64> {
    let (min, max) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() {
        return 0.0..1.0;
    }

    let span = max - min;
    let pad = if span > 0.0 { span * RANGE_PADDING } else { 1.0 };
    (min - pad)..(max + pad)
}

/// Fitted curve over `range`, skipping points where the model is undefined
fn sample_curve(fit: &FitResult, range: &Range<f64>) -> Vec<(f64, f64)> {
    let step = (range.end - range.start) / (CURVE_SAMPLES - 1) as f64;

    (0..CURVE_SAMPLES)
        .map(|i| range.start + step * i as f64)
        .map(|x| (x, fit.predict(x)))
        .filter(|(_, y)| y.is_finite())
        .collect()
}
