//! `alif-tools` - shaping regression tests and samples for font projects
//!
//! This library backs three binaries: `check-shaping` runs JSON shaping test
//! files against a font and writes an HTML report, `update-shaping-tests`
//! records the current shaping output as expectations, and `make-sample`
//! renders shaped text to SVG.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod brew;
pub mod check;
pub mod cli;
pub mod collide;
pub mod config;
pub mod diff;
pub mod error;
pub mod font;
pub mod logging;
pub mod sample;
pub mod shaping;
pub mod svg;
pub mod update;

#[cfg(test)]
mod testing;

pub use config::Settings;
pub use error::{Error, Result};
pub use font::Font;
pub use logging::init_logging;
pub use shaping::{shape, GlyphRun, ShapingParameters};
