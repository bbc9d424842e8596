//! Tool settings for alif-tools.
//!
//! Settings are loaded with figment from built-in defaults, an optional TOML
//! file and `ALIF_TOOLS_` environment variables. They tune presentation only
//! (report title, image sizes, sample margins and colours); the shaping tests
//! themselves are described by their own YAML/JSON files.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sample::{parse_color, Rgba};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the user configuration directory.
const CONFIG_DIR_NAME: &str = "alif-tools";

/// Application settings.
///
/// Loaded from (in order of precedence, highest first):
/// 1. Environment variables prefixed with `ALIF_TOOLS_`, nested keys separated
///    by a double underscore (`ALIF_TOOLS_SAMPLE__MARGIN=50`)
/// 2. TOML file at `~/.config/alif-tools/config.toml` or `--settings`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTML report settings.
    pub report: ReportSettings,
    /// Sample rendering settings.
    pub sample: SampleSettings,
}

/// Settings for the `check-shaping` HTML report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Page title and top-level heading.
    pub title: String,
    /// Display height of rendered glyph runs, in CSS pixels.
    pub image_height: u32,
}

/// Settings for `make-sample`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSettings {
    /// Space around and between rows, in font units.
    pub margin: f32,
    /// Foreground colour used when `--foreground` is not given.
    pub foreground: Option<String>,
    /// Background colour used when `--background` is not given.
    pub background: Option<String>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "Shaping checks results".to_string(),
            image_height: 100,
        }
    }
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            margin: 100.0,
            foreground: None,
            background: None,
        }
    }
}

impl Settings {
    /// Load settings with an optional custom settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load_from(settings_path: Option<PathBuf>) -> Result<Self> {
        let settings_file = settings_path.unwrap_or_else(Self::default_settings_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(&settings_file))
            .merge(Env::prefixed("ALIF_TOOLS_").split("__"));

        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get the default settings file path.
    #[must_use]
    pub fn default_settings_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range or a colour is malformed.
    pub fn validate(&self) -> Result<()> {
        if self.report.image_height == 0 {
            return Err(Error::ConfigValidation {
                message: "report.image_height must be greater than 0".to_string(),
            });
        }

        if !(self.sample.margin.is_finite() && self.sample.margin >= 0.0) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "sample.margin must be a non-negative number, got {}",
                    self.sample.margin
                ),
            });
        }

        self.sample_foreground()?;
        self.sample_background()?;
        Ok(())
    }

    /// The configured default foreground colour, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the colour string is malformed.
    pub fn sample_foreground(&self) -> Result<Option<Rgba>> {
        self.sample.foreground.as_deref().map(parse_color).transpose()
    }

    /// The configured default background colour, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the colour string is malformed.
    pub fn sample_background(&self) -> Result<Option<Rgba>> {
        self.sample.background.as_deref().map(parse_color).transpose()
    }
}
