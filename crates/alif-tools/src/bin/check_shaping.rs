//! `check-shaping` - run a font's shaping regression tests and write an HTML
//! report.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use alif_tools::check::{generate_html, run_checks, CheckConfig};
use alif_tools::cli::CheckShapingCli;
use alif_tools::{init_logging, Font, Settings};

fn main() -> ExitCode {
    let cli = CheckShapingCli::parse();
    init_logging(cli.global.verbosity());

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            info!(report = %cli.html.display(), "Some shaping checks failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &CheckShapingCli) -> anyhow::Result<bool> {
    let settings = Settings::load_from(cli.global.settings.clone())?;
    let config = CheckConfig::load(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?;
    let font = Font::load(&cli.font)?;

    let results = run_checks(&config, &font)?;
    let (html, all_pass) = generate_html(&results, &settings.report);
    std::fs::write(&cli.html, html)
        .with_context(|| format!("writing {}", cli.html.display()))?;
    info!(report = %cli.html.display(), all_pass, "Wrote shaping report");
    Ok(all_pass)
}
