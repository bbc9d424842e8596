//! `make-sample` - render shaped text to an SVG file.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use alif_tools::cli::MakeSampleCli;
use alif_tools::sample::{parse_color, parse_features, render_sample, SampleOptions};
use alif_tools::{init_logging, Font, Settings};

fn main() -> ExitCode {
    let cli = MakeSampleCli::parse();
    init_logging(cli.global.verbosity());

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &MakeSampleCli) -> anyhow::Result<()> {
    let settings = Settings::load_from(cli.global.settings.clone())?;

    // Flags win over the configured colours.
    let foreground = match &cli.foreground {
        Some(color) => Some(parse_color(color)?),
        None => settings.sample_foreground()?,
    };
    let background = match &cli.background {
        Some(color) => Some(parse_color(color)?),
        None => settings.sample_background()?,
    };
    let options = SampleOptions {
        features: parse_features(&cli.features)?,
        foreground,
        background,
        margin: settings.sample.margin,
    };

    let font = Font::load(&cli.font)?;
    let svg = render_sample(&font, &cli.text, &options)?;
    std::fs::write(&cli.output, svg)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    info!(output = %cli.output.display(), "Wrote sample");
    Ok(())
}
