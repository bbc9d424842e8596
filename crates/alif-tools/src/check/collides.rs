//! Collision check: shaped glyphs must not bump into each other.

use std::collections::HashSet;
use std::path::Path;

use super::report::{create_report_item, html_escape, Message, ReportItem};
use super::{ShapingCheck, TestCase, TestConfiguration};
use crate::collide::{draw_overlaps, positioned_glyphs, Collidoscope};
use crate::error::Result;
use crate::font::Font;
use crate::shaping::{shape_with_face, GlyphRun, Variations};

/// Looks for colliding glyphs in tests that ask for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollidesCheck;

/// A shaped string with collisions that are not allowed.
#[derive(Debug, Clone)]
pub struct CollisionFailure {
    /// The shaped string.
    pub text: String,
    /// `glyph1/glyph2` labels of the collisions.
    pub bumps: Vec<String>,
    /// Single-line SVG of the overlaps.
    pub drawing: String,
    /// The output.
    pub output: GlyphRun,
    /// Location the string was shaped at.
    pub variations: Option<Variations>,
}

impl ShapingCheck for CollidesCheck {
    type State = ();
    type Failure = CollisionFailure;

    fn applies(&self, test: &TestCase, configuration: &TestConfiguration) -> bool {
        test.collidoscope.is_some() || configuration.collidoscope.is_some()
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
        failures: &mut Vec<CollisionFailure>,
    ) -> Result<()> {
        let settings = test
            .collidoscope
            .or(configuration.collidoscope)
            .unwrap_or_default();
        let collidoscope = Collidoscope::new(settings);
        let allowed = test.allowed_collisions(configuration);
        let parameters = test.shaping_parameters(configuration);
        let variations = parameters.variations.as_ref();
        let face = font.face_with_variations(variations)?;

        for text in test.input_strings(configuration)? {
            let output = shape_with_face(&face, &text, &parameters)?;
            let glyphs = positioned_glyphs(font, &output, variations)?;
            let collisions = collidoscope.find_collisions(&glyphs);
            let bumps: Vec<String> = collisions
                .iter()
                .map(|c| c.label())
                .filter(|bump| !allowed.contains(bump))
                .collect();
            if bumps.is_empty() {
                continue;
            }
            failures.push(CollisionFailure {
                drawing: draw_overlaps(&glyphs, &collisions),
                text,
                bumps,
                output,
                variations: parameters.variations.clone(),
            });
        }
        Ok(())
    }

    fn report(
        &self,
        font: &Font,
        file: &Path,
        _configuration: &TestConfiguration,
        failures: Vec<CollisionFailure>,
    ) -> Result<Message> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for failure in &failures {
            if !seen.insert(failure.bumps.clone()) {
                continue;
            }
            let message = format!(
                "{} collision found in e.g. <span class='tf'>{}</span> <div>{}</div>",
                html_escape(&failure.bumps.join(",")),
                html_escape(&failure.text),
                failure.drawing
            );
            items.push(create_report_item(
                font,
                &ReportItem {
                    message: &message,
                    actual: Some(&failure.output),
                    variations: failure.variations.as_ref(),
                    ..ReportItem::default()
                },
            )?);
        }
        Ok(Message::new(
            "shaping-collides",
            format!(
                "{}: {} collisions found while shaping",
                file.display(),
                failures.len()
            ),
        )
        .with_items(items))
    }
}
