//! Error types for alif-tools.
//!
//! This module defines the error type shared by the shaping checker, the test
//! updater and the sample renderer.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for alif-tools operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Font Errors ===
    /// Failed to read a font file from disk.
    #[error("failed to read font {path}: {source}")]
    FontRead {
        /// Path to the font file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The font data could not be parsed.
    #[error("failed to parse font {path}")]
    FontParse {
        /// Path to the font file.
        path: PathBuf,
    },

    /// An OpenType table could not be read.
    #[error("failed to read '{table}' table: {message}")]
    FontTable {
        /// Tag of the table.
        table: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// A configuration file does not exist.
    #[error("configuration file {path} not found")]
    ConfigNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Shaping Errors ===
    /// A shaping input file is malformed.
    #[error("{path} does not contain a valid shaping input: {message}")]
    InvalidShapingInput {
        /// Path to the input file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// A shaping parameter could not be understood.
    #[error("invalid shaping parameter {name} '{value}'")]
    InvalidParameter {
        /// Parameter name (script, language, feature, ...).
        name: &'static str,
        /// The offending value.
        value: String,
    },

    /// A serialized glyph run could not be parsed.
    #[error("couldn't parse glyph {item} in {text}")]
    ExpectationParse {
        /// The item that failed to parse.
        item: String,
        /// The whole serialized text.
        text: String,
    },

    /// A string pattern (recipe) is invalid.
    #[error("invalid pattern '{recipe}': {message}")]
    Pattern {
        /// The recipe being expanded.
        recipe: String,
        /// Description of the problem.
        message: String,
    },

    /// A colour string could not be parsed.
    #[error("invalid colour '{0}', expected RRGGBB, #RRGGBB, 0xRRGGBB or RRGGBBAA")]
    InvalidColor(String),

    /// A regular expression failed to compile.
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for alif-tools operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<read_fonts::ReadError> for Error {
    fn from(err: read_fonts::ReadError) -> Self {
        Self::FontTable {
            table: "font",
            message: err.to_string(),
        }
    }
}

impl Error {
    /// Create an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.into(),
        }
    }

    /// Create a pattern error.
    #[must_use]
    pub fn pattern(recipe: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pattern {
            recipe: recipe.into(),
            message: message.into(),
        }
    }

    /// Create a font table error.
    #[must_use]
    pub fn font_table(table: &'static str, err: &read_fonts::ReadError) -> Self {
        Self::FontTable {
            table,
            message: err.to_string(),
        }
    }

    /// Check if this error comes from user-supplied shaping data.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidShapingInput { .. }
                | Self::InvalidParameter { .. }
                | Self::ExpectationParse { .. }
                | Self::Pattern { .. }
        )
    }
}
