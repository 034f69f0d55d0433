//! prisma: apply a replayable transformation pipeline to an image.
//!
//! Loads an image, builds a pipeline from `--step` arguments, runs it
//! over the original, and writes the result. Per-step timing is printed
//! as a report (or JSON with `--json`).
//!
//! # Usage
//!
//! ```text
//! prisma photo.jpg out.png \
//!     --step color:grayscale \
//!     --step filter:blur:radius=2 \
//!     --step binary:otsu
//! ```
//!
//! Step syntax is `category:method[:key=value,...]`. Categories are
//! `color`, `filter`, `edge`, `binary` and `morphology`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::Parser;
use prisma_io::PREVIEW_MAX_SIZE;
use prisma_pipeline::types::{MAX_INTENSITY, MAX_ITERATIONS, MIN_INTENSITY, MIN_ITERATIONS};
use prisma_pipeline::{Clock, PipelineStep, ProcessingDefaults, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Apply color, filter, edge, binarization and morphology steps to an image.
#[derive(Parser, Debug)]
#[command(name = "prisma", version)]
struct Cli {
    /// Input image (PNG, JPEG, GIF, BMP, TIFF).
    input: PathBuf,

    /// Where to write the processed image (PNG or JPEG; other formats
    /// known to the encoder are tried as a fallback).
    output: Option<PathBuf>,

    /// Pipeline step, `category:method[:key=value,...]`. Repeatable;
    /// steps run in the order given.
    #[arg(short, long = "step", value_name = "STEP", value_parser = parse_step)]
    steps: Vec<PipelineStep>,

    /// Default effect intensity for steps without their own override.
    #[arg(
        long,
        default_value_t = ProcessingDefaults::DEFAULT_INTENSITY,
        value_parser = parse_intensity
    )]
    intensity: f64,

    /// Default repeat count for iterated families.
    #[arg(
        long,
        default_value_t = ProcessingDefaults::DEFAULT_ITERATIONS,
        value_parser = iterations_parser()
    )]
    iterations: u32,

    /// Save a snapshot after the first N steps have been added.
    #[arg(long, value_name = "N")]
    snapshot_after: Option<usize>,

    /// Revert to the saved snapshot before running (an empty pipeline if
    /// no snapshot was saved).
    #[arg(long)]
    revert: bool,

    /// Also write a downsampled preview to this path.
    #[arg(long, value_name = "PATH")]
    preview: Option<PathBuf>,

    /// Preview bounding box.
    #[arg(
        long,
        value_name = "WxH",
        value_parser = parse_size,
        default_value_t = Size(PREVIEW_MAX_SIZE.0, PREVIEW_MAX_SIZE.1)
    )]
    preview_size: Size,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

/// `width x height` bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Size(u32, u32);

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.0, self.1)
    }
}

fn parse_step(raw: &str) -> Result<PipelineStep, String> {
    prisma_pipeline::parse_spec(raw).map_err(|e| e.to_string())
}

fn parse_intensity(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if (MIN_INTENSITY..=MAX_INTENSITY).contains(&value) {
        Ok(value)
    } else {
        Err(format!("must be between {MIN_INTENSITY} and {MAX_INTENSITY}"))
    }
}

fn iterations_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(i64::from(MIN_ITERATIONS)..=i64::from(MAX_ITERATIONS))
}

fn parse_size(raw: &str) -> Result<Size, String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {raw:?}"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("width: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("height: {e}"))?;
    if w == 0 || h == 0 {
        return Err("preview dimensions must be positive".to_owned());
    }
    Ok(Size(w, h))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("prisma={log_level},prisma_pipeline={log_level},prisma_io={log_level}")
                    .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(err) = run(&cli) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut session = Session::new();
    session.state.set_intensity(cli.intensity);
    session.state.set_iterations(cli.iterations);

    let original = prisma_io::load_image(&cli.input)
        .with_context(|| format!("reading input {}", cli.input.display()))?;
    session.state.import_file(&cli.input);
    tracing::info!(
        path = %cli.input.display(),
        width = original.width(),
        height = original.height(),
        "loaded image"
    );
    session.load(original);

    for (index, step) in cli.steps.iter().enumerate() {
        if cli.snapshot_after == Some(index) {
            session.pipeline.save_snapshot();
        }
        session.pipeline.push(step.clone());
    }
    if cli.snapshot_after.is_some_and(|n| n >= cli.steps.len()) {
        session.pipeline.save_snapshot();
    }
    if cli.revert {
        session.pipeline.revert_to_snapshot();
        tracing::info!(steps = session.pipeline.len(), "reverted to snapshot");
    }

    for (index, step) in session.pipeline.steps().iter().enumerate() {
        tracing::info!(index, step = %step, "pipeline step");
    }

    let (_, diagnostics) = session.run_pipeline_with_diagnostics(&StdClock)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&diagnostics)
            .context("serializing diagnostics")?;
        println!("{json}");
    } else {
        println!("{}", diagnostics.report());
    }

    let processed = session.export_image()?;

    if let Some(output) = &cli.output {
        if output == &cli.input {
            bail!("refusing to overwrite the input image {}", output.display());
        }
        prisma_io::save_image(processed, output)
            .with_context(|| format!("writing output {}", output.display()))?;
        tracing::info!(path = %output.display(), "saved result");
    }

    if let Some(preview_path) = &cli.preview {
        let Size(w, h) = cli.preview_size;
        let preview = prisma_io::create_preview(processed, w, h);
        prisma_io::save_image(&preview, preview_path)
            .with_context(|| format!("writing preview {}", preview_path.display()))?;
        tracing::info!(
            path = %preview_path.display(),
            width = preview.width(),
            height = preview.height(),
            "saved preview"
        );
    }

    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn parses_repeated_steps_in_order() {
        let cli = Cli::try_parse_from([
            "prisma",
            "in.png",
            "out.png",
            "--step",
            "color:grayscale",
            "-s",
            "filter:blur:radius=2",
            "--step",
            "binary:otsu",
        ])
        .unwrap();
        let labels: Vec<String> = cli.steps.iter().map(PipelineStep::label).collect();
        assert_eq!(
            labels,
            ["color:grayscale", "filter:blur(radius=2)", "binary:otsu"]
        );
        assert_eq!(cli.preview_size, Size(400, 300));
    }

    #[test]
    fn rejects_malformed_step() {
        assert!(Cli::try_parse_from(["prisma", "in.png", "--step", "filter"]).is_err());
    }

    #[test]
    fn rejects_out_of_range_defaults() {
        assert!(Cli::try_parse_from(["prisma", "in.png", "--intensity", "5"]).is_err());
        assert!(Cli::try_parse_from(["prisma", "in.png", "--iterations", "0"]).is_err());
        assert!(Cli::try_parse_from(["prisma", "in.png", "--iterations", "10"]).is_ok());
    }

    #[test]
    fn parses_preview_size() {
        assert_eq!(parse_size("640x480"), Ok(Size(640, 480)));
        assert_eq!(parse_size("64X48"), Ok(Size(64, 48)));
        assert!(parse_size("640").is_err());
        assert!(parse_size("0x10").is_err());
    }
}
