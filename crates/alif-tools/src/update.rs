//! Generate regression test files from the current shaping output.
//!
//! The input is a YAML list of texts with shaping parameters; the output is a
//! JSON test file with one test per font, text and named instance.

use std::path::Path;

use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::check::{Expectation, OneOrMany, TestCase, TestConfiguration};
use crate::error::{Error, Result};
use crate::font::Font;
use crate::shaping::{shape, ShapingParameters, Variations};

/// What the recorded expectation contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Glyph names, clusters and positions.
    #[default]
    Full,
    /// Glyph names only.
    Glyphstream,
}

/// One entry of the `input` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapingInput {
    /// Texts shaped with these parameters.
    #[serde(default)]
    pub text: Vec<String>,
    /// Expectation format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_mode: Option<ComparisonMode>,
    /// Shaping parameters.
    #[serde(flatten)]
    pub parameters: ShapingParameters,
}

/// A YAML shaping input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapingInputFile {
    /// Test file configuration, copied to the output unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
    /// Texts to shape.
    pub input: Vec<ShapingInput>,
}

/// The generated JSON test file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapingOutput {
    /// Configuration copied from the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
    /// Generated tests.
    pub tests: Vec<TestCase>,
}

/// Read and validate a YAML shaping input file.
///
/// # Errors
///
/// Returns [`Error::InvalidShapingInput`] if the file is missing, is not
/// valid YAML, has no `input` list, or uses an unknown direction or
/// comparison mode.
pub fn load_shaping_input(path: &Path) -> Result<ShapingInputFile> {
    let invalid = |message: String| Error::InvalidShapingInput {
        path: path.to_path_buf(),
        message,
    };
    if !path.is_file() {
        return Err(invalid("file not found".to_string()));
    }
    let input: ShapingInputFile = Figment::from(Yaml::file(path))
        .extract()
        .map_err(|err| invalid(err.to_string()))?;
    debug!(path = %path.display(), inputs = input.input.len(), "Loaded shaping input");
    Ok(input)
}

fn test_configuration(input: &ShapingInputFile) -> Result<TestConfiguration> {
    match &input.configuration {
        Some(configuration) => Ok(serde_json::from_value(configuration.clone())?),
        None => Ok(TestConfiguration::default()),
    }
}

/// Shape one text and record the result as a test for `font`.
///
/// `variations` overrides the input's own location, for named instances.
///
/// # Errors
///
/// Returns an error if shaping fails.
pub fn shape_run(
    font: &Font,
    text: &str,
    input: &ShapingInput,
    defaults: &ShapingParameters,
    variations: Option<&Variations>,
) -> Result<TestCase> {
    let mut own = input.parameters.clone().without_empty();
    if let Some(variations) = variations {
        own.variations = Some(variations.clone());
    }
    let parameters = own.or(defaults).without_empty();

    let run = shape(font, text, &parameters)?;
    let glyphs_only = input.comparison_mode.unwrap_or_default() == ComparisonMode::Glyphstream;

    Ok(TestCase {
        only: Some(OneOrMany::One(font.file_name().to_string())),
        input: Some(text.to_string()),
        expectation: Some(Expectation::Text(run.serialize(glyphs_only))),
        parameters: own,
        ..TestCase::default()
    })
}

/// Shape every input text with every font.
///
/// Variable fonts get one test per named instance unless the input pins its
/// own variations.
///
/// # Errors
///
/// Returns an error if the configuration block is malformed or shaping
/// fails.
pub fn update_shaping_output(input: &ShapingInputFile, fonts: &[Font]) -> Result<ShapingOutput> {
    let configuration = test_configuration(input)?;
    let defaults = &configuration.defaults.parameters;

    let mut tests = Vec::new();
    for font in fonts {
        let instances = font.named_instances()?;
        info!(font = font.file_name(), instances = instances.len(), "Updating expectations");
        for shaping_input in &input.input {
            let pinned = shaping_input
                .parameters
                .variations
                .as_ref()
                .is_some_and(|v| !v.is_empty());
            for text in &shaping_input.text {
                if instances.is_empty() || pinned {
                    tests.push(shape_run(font, text, shaping_input, defaults, None)?);
                } else {
                    for instance in &instances {
                        tests.push(shape_run(
                            font,
                            text,
                            shaping_input,
                            defaults,
                            Some(instance),
                        )?);
                    }
                }
            }
        }
    }

    Ok(ShapingOutput {
        configuration: input.configuration.clone(),
        tests,
    })
}

/// Write the output as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_output(path: &Path, output: &ShapingOutput) -> Result<()> {
    let json = serde_json::to_string_pretty(output)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), tests = output.tests.len(), "Wrote shaping tests");
    Ok(())
}
