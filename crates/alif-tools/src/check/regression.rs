//! Regression check: shaping output must match the recorded expectation.

use std::path::Path;

use tracing::warn;

use super::report::{create_report_item, Expected, Message, ReportItem};
use super::{ShapingCheck, TestCase, TestConfiguration};
use crate::error::Result;
use crate::font::Font;
use crate::shaping::{shape, GlyphRun, ShapingParameters};

/// Compares shaping output with each test's `expectation`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionCheck;

/// A test whose output differed from its expectation.
#[derive(Debug, Clone)]
pub struct RegressionFailure {
    /// The failing test.
    pub test: TestCase,
    /// The expectation for this font.
    pub expectation: String,
    /// Parameters the text was shaped with.
    pub parameters: ShapingParameters,
    /// The actual output.
    pub output: GlyphRun,
}

impl ShapingCheck for RegressionCheck {
    type State = ();
    type Failure = RegressionFailure;

    fn applies(&self, test: &TestCase, _configuration: &TestConfiguration) -> bool {
        test.expectation.is_some()
    }

    fn prepare(
        &self,
        _file: &Path,
        _configuration: &TestConfiguration,
    ) -> std::result::Result<(), Message> {
        Ok(())
    }

    fn run_test(
        &self,
        font: &Font,
        _state: &(),
        test: &TestCase,
        configuration: &TestConfiguration,
        failures: &mut Vec<RegressionFailure>,
    ) -> Result<()> {
        let Some(expectation) = test
            .expectation
            .as_ref()
            .and_then(|e| e.for_font(font.file_name()))
        else {
            warn!(
                font = font.file_name(),
                input = test.input.as_deref().unwrap_or_default(),
                "No expectation for this font and no default"
            );
            return Ok(());
        };

        let text = test.input.as_deref().unwrap_or_default();
        let parameters = test.shaping_parameters(configuration);
        let output = shape(font, text, &parameters)?;
        let serialized = output.serialize(!expectation.contains('+'));

        if serialized != expectation {
            failures.push(RegressionFailure {
                test: test.clone(),
                expectation: expectation.to_string(),
                parameters,
                output,
            });
        }
        Ok(())
    }

    fn report(
        &self,
        font: &Font,
        file: &Path,
        _configuration: &TestConfiguration,
        failures: Vec<RegressionFailure>,
    ) -> Result<Message> {
        let face = font.face()?;
        let mut items = Vec::with_capacity(failures.len());
        for failure in &failures {
            let mut own = failure.test.parameters.clone();
            own.shaper = None;
            let extra_data = serde_json::to_value(&own)?;

            let expected = if failure.expectation.contains('=') {
                match GlyphRun::parse(&face, &failure.expectation) {
                    Ok(run) => Expected::Run(run),
                    Err(err) => {
                        warn!(error = %err, "Drawing expectation as text");
                        Expected::Text(failure.expectation.clone())
                    }
                }
            } else {
                Expected::Text(failure.expectation.clone())
            };

            items.push(create_report_item(
                font,
                &ReportItem {
                    message: "Shaping did not match",
                    text: failure.test.input.as_deref(),
                    note: failure.test.note.as_deref(),
                    extra_data: Some(&extra_data),
                    actual: Some(&failure.output),
                    expected: Some(&expected),
                    variations: failure.parameters.variations.as_ref(),
                },
            )?);
        }

        Ok(Message::new(
            "shaping-regression",
            format!(
                "{}: Expected and actual shaping not matching",
                file.display()
            ),
        )
        .with_items(items))
    }
}
