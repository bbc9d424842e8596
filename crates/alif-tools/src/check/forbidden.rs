//! Forbidden glyph check: some glyph names must never come out of shaping.

use std::path::Path;

use regex::Regex;

use super::report::{create_report_item, html_escape, Message, ReportItem};
use super::{ShapingCheck, TestCase, TestConfiguration};
use crate::error::Result;
use crate::font::Font;
use crate::shaping::{shape_with_face, GlyphRun, Variations};

/// Searches shaping output for the file's `forbidden_glyphs` patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForbiddenCheck;

/// A compiled forbidden glyph pattern.
#[derive(Debug, Clone)]
pub struct ForbiddenPattern {
    /// The pattern as written in the test file.
    pub source: String,
    regex: Regex,
}

impl ForbiddenPattern {
    /// Compile a pattern, anchoring it on `|` separators on both sides.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regular expression.
    pub fn new(source: &str) -> Result<Self> {
        let mut pattern = String::new();
        if !source.starts_with(r"\|") {
            pattern.push_str(r"\|");
        }
        pattern.push_str(source);
        if !source.ends_with(r"\|") {
            pattern.push_str(r"\|");
        }
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(&pattern)?,
        })
    }

    /// Whether the glyph-name sequence `names` (`|`-separated) matches.
    #[must_use]
    pub fn is_found_in(&self, names: &str) -> bool {
        self.regex.is_match(&format!("|{names}|"))
    }
}

/// A shaped string that produced a forbidden glyph.
#[derive(Debug, Clone)]
pub struct ForbiddenFailure {
    /// The shaped string.
    pub text: String,
    /// The output.
    pub output: GlyphRun,
    /// The pattern that matched.
    pub forbidden: String,
    /// Location the string was shaped at.
    pub variations: Option<Variations>,
}

impl ShapingCheck for ForbiddenCheck {
    type State = Vec<ForbiddenPattern>;
    type Failure = ForbiddenFailure;

    fn applies(&self, _test: &TestCase, configuration: &TestConfiguration) -> bool {
        configuration.forbidden_glyphs.is_some()
    }

    fn prepare(
        &self,
        file: &Path,
        configuration: &TestConfiguration,
    ) -> std::result::Result<Vec<ForbiddenPattern>, Message> {
        configuration
            .forbidden_glyphs
            .iter()
            .flatten()
            .map(|source| {
                ForbiddenPattern::new(source).map_err(|err| {
                    Message::new(
                        "shaping-invalid-forbidden",
                        format!(
                            "{}: Invalid forbidden glyph pattern '{source}': {err}",
                            file.display()
                        ),
                    )
                })
            })
            .collect()
    }

    fn run_test(
        &self,
        font: &Font,
        patterns: &Vec<ForbiddenPattern>,
        test: &TestCase,
        configuration: &TestConfiguration,
        failures: &mut Vec<ForbiddenFailure>,
    ) -> Result<()> {
        let parameters = test.shaping_parameters(configuration);
        let face = font.face_with_variations(parameters.variations.as_ref())?;
        for text in test.input_strings(configuration)? {
            let output = shape_with_face(&face, &text, &parameters)?;
            let names = output.serialize(true);
            for pattern in patterns {
                if pattern.is_found_in(&names) {
                    failures.push(ForbiddenFailure {
                        text: text.clone(),
                        output: output.clone(),
                        forbidden: pattern.source.clone(),
                        variations: parameters.variations.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn report(
        &self,
        font: &Font,
        file: &Path,
        _configuration: &TestConfiguration,
        failures: Vec<ForbiddenFailure>,
    ) -> Result<Message> {
        let mut items = Vec::with_capacity(failures.len());
        for failure in &failures {
            let message = html_escape(&format!(
                "{} produced '{}'",
                failure.text, failure.forbidden
            ));
            items.push(create_report_item(
                font,
                &ReportItem {
                    message: &message,
                    text: Some(&failure.text),
                    actual: Some(&failure.output),
                    variations: failure.variations.as_ref(),
                    ..ReportItem::default()
                },
            )?);
        }
        Ok(Message::new(
            "shaping-forbidden",
            format!("{}: Forbidden glyphs found while shaping", file.display()),
        )
        .with_items(items))
    }
}
