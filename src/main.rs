use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
mod data_source;
mod error;
mod processing;
mod protocol;
mod report;
mod service;

use config::Cli;
use data_source::{PhotodiodeLog, ReferenceLog, load_samples};
use error::CalibrationError;
use report::{PlotRenderer, Renderer};
use service::pipeline::CalibrationPipeline;

fn main() {
    // Initialize tracing with colors and stderr output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "par_calibration=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        tracing::debug!("Calibration failed: {:?}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CalibrationError> {
    let config = cli.to_pipeline_config()?;
    let tz = cli.reference_tz()?;

    // Fail on a bad plot path before doing any work
    let renderer = cli.plot.clone().map(PlotRenderer::new).transpose()?;

    tracing::info!(
        "Calibrating {:?} against {:?} ({} model, {:?} alignment, reference time in {})",
        cli.photodiode,
        cli.reference,
        config.model.name(),
        config.alignment,
        tz
    );

    let reference = load_samples(&cli.reference, &ReferenceLog::new(tz))?;
    let photodiode = load_samples(&cli.photodiode, &PhotodiodeLog::new(tz))?;

    let pipeline = CalibrationPipeline::new(&config)?;
    let calibration = pipeline.run(&reference, &photodiode)?;

    println!("{}", report::summary(&calibration));

    if let Some(path) = &cli.json {
        report::write_json(&calibration, path)?;
    }

    if let Some(renderer) = renderer {
        renderer.render(&calibration.points(), &calibration.fit, &calibration.equation)?;
    }

    Ok(())
}
