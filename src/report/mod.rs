pub mod plot;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::CalibrationError;
use crate::processing::fit::FitResult;
use crate::protocol::AlignedObservation;
use crate::service::pipeline::CalibrationReport;

pub use plot::PlotRenderer;

/// Trait for displaying a fitted calibration curve against its observations
pub trait Renderer {
    fn render(
        &self,
        points: &[AlignedObservation],
        fit: &FitResult,
        equation: &str,
    ) -> Result<(), CalibrationError>;
}

/// Write the report as pretty-printed JSON
pub fn write_json(report: &CalibrationReport, path: &Path) -> Result<(), CalibrationError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;

    tracing::info!("Wrote calibration report to {:?}", path);
    Ok(())
}

/// Human readable summary of a calibration run
pub fn summary(report: &CalibrationReport) -> String {
    let names = report.fit.model.create().parameter_names();
    let c = &report.counts;

    let mut lines = vec![
        format!("Model:      {}", report.fit.model.name()),
        format!("Equation:   {}", report.equation),
    ];
    lines.extend(
        names
            .iter()
            .zip(&report.fit.parameters)
            .map(|(name, value)| format!("  {name} = {value:.9e}")),
    );
    lines.push(match report.r_squared {
        Some(r) => format!("R²:         {r:.6}"),
        None => "R²:         n/a".to_string(),
    });
    lines.push(format!(
        "Samples:    {} reference, {} photodiode",
        c.reference_samples, c.photodiode_samples
    ));
    lines.push(format!(
        "Pipeline:   {} aligned -> {} after noise filter -> {} buckets",
        c.aligned, c.filtered, c.buckets
    ));

    lines.join("\n")
}
