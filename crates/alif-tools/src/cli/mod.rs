//! Command-line interfaces of the alif-tools binaries.
//!
//! Each binary has its own parser; the logging and settings flags are shared
//! through [`GlobalArgs`].

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::logging::Verbosity;

/// Flags accepted by every binary.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Path to a custom settings file
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl GlobalArgs {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

/// check-shaping - Run shaping regression tests against a font
///
/// Reads every JSON test file in the configured test directory, runs the
/// regression, forbidden glyph and collision checks, and writes an HTML
/// report. Exits with status 1 when any check fails.
#[derive(Debug, Parser)]
#[command(name = "check-shaping")]
#[command(author, version, about, long_about = None)]
pub struct CheckShapingCli {
    /// Font file to test
    #[arg(value_name = "FONT")]
    pub font: PathBuf,

    /// YAML configuration naming the test directory
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Where to write the HTML report
    #[arg(value_name = "HTML")]
    pub html: PathBuf,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// update-shaping-tests - Record current shaping output as test expectations
#[derive(Debug, Parser)]
#[command(name = "update-shaping-tests")]
#[command(author, version, about, long_about = None)]
pub struct UpdateShapingTestsCli {
    /// YAML file listing the texts to shape
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// JSON test file to write
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Fonts to shape with
    #[arg(value_name = "FONT", required = true)]
    pub fonts: Vec<PathBuf>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// make-sample - Render shaped text to an SVG sample
#[derive(Debug, Parser)]
#[command(name = "make-sample")]
#[command(author, version, about, long_about = None)]
pub struct MakeSampleCli {
    /// Font file to render with
    #[arg(value_name = "FONT")]
    pub font: PathBuf,

    /// Text to render; newlines start new rows
    #[arg(short, long)]
    pub text: String,

    /// Comma separated features, e.g. "+kern,-liga,ss01[2:4]"
    #[arg(short, long, default_value = "", allow_hyphen_values = true)]
    pub features: String,

    /// Output SVG file
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Glyph colour (RRGGBB, #RRGGBB, 0xRRGGBB or RRGGBBAA)
    #[arg(long, value_name = "COLOR")]
    pub foreground: Option<String>,

    /// Canvas colour (RRGGBB, #RRGGBB, 0xRRGGBB or RRGGBBAA)
    #[arg(long, value_name = "COLOR")]
    pub background: Option<String>,

    #[command(flatten)]
    pub global: GlobalArgs,
}
