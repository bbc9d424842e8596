//! Sample images: shaped text rendered to SVG, one row per line and per
//! named instance.

use std::fmt::Write as _;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::font::{Face, Font};
use crate::shaping::{shape_with_face, FeatureValue, Features, GlyphRun, ShapingParameters, Variations};
use crate::svg::{glyph_group, Defs};

pub use crate::svg::Rgba;

/// Parse a comma separated feature list such as `+kern,-liga,aalt[3:5]=2`.
///
/// A leading `-` turns the feature off, `+` or nothing turns it on. An
/// optional `[start:end]` or `[index]` limits it to a character range and
/// `=value` sets its value.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for malformed numbers or brackets.
pub fn parse_features(text: &str) -> Result<Features> {
    let mut features = Features::new();
    for feature in text.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        let bad = || Error::invalid_parameter("feature", feature);
        let number = |s: &str| s.trim().parse::<i64>().map_err(|_| bad());

        let (mut value, rest) = match feature.as_bytes()[0] {
            b'-' => (0, &feature[1..]),
            b'+' => (1, &feature[1..]),
            _ => (1, feature),
        };
        let (rest, explicit) = match rest.split_once('=') {
            Some((rest, v)) => (rest, Some(number(v)?)),
            None => (rest, None),
        };
        if let Some(explicit) = explicit {
            value = explicit;
        }

        let (tag, start, end) = match rest.split_once('[') {
            Some((tag, range)) => {
                let range = range.strip_suffix(']').ok_or_else(bad)?;
                match range.split_once(':') {
                    Some((start, end)) => {
                        let start = if start.is_empty() { 0 } else { number(start)? };
                        let end = if end.is_empty() { -1 } else { number(end)? };
                        (tag, start, end)
                    }
                    None => {
                        let index = number(range)?;
                        (tag, index, index + 1)
                    }
                }
            }
            None => (rest, 0, -1),
        };
        if tag.is_empty() {
            return Err(bad());
        }
        features.insert(tag.to_string(), FeatureValue::Ranges(vec![[value, start, end]]));
    }
    Ok(features)
}

/// Parse `RRGGBB`, `#RRGGBB`, `0xRRGGBB` (or `0X`) or `RRGGBBAA`.
///
/// Eight digits are read as red, green, blue, alpha, and only without a
/// prefix.
///
/// # Errors
///
/// Returns [`Error::InvalidColor`] for anything else.
pub fn parse_color(text: &str) -> Result<Rgba> {
    let bad = || Error::InvalidColor(text.to_string());
    let hex = text
        .strip_prefix('#')
        .or_else(|| text.strip_prefix("0x"))
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if !hex.is_ascii() || !(hex.len() == 6 || (hex.len() == 8 && hex.len() == text.len())) {
        return Err(bad());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
    Ok(Rgba {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
        a: if hex.len() == 8 { channel(6)? } else { 255 },
    })
}

/// How a sample is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOptions {
    /// Features applied to every line.
    pub features: Features,
    /// Colour of glyphs without colour layers.
    pub foreground: Option<Rgba>,
    /// Canvas fill.
    pub background: Option<Rgba>,
    /// Space around and between rows, in font units.
    pub margin: f32,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            features: Features::new(),
            foreground: None,
            background: None,
            margin: 100.0,
        }
    }
}

/// Ink bounds `(x_min, y_min, x_max, y_max)`.
type Bounds = (f32, f32, f32, f32);

fn union(a: Bounds, b: Bounds) -> Bounds {
    (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3))
}

/// Ink bounds of a shaped line with its origin at 0,0.
#[allow(clippy::cast_precision_loss)]
fn line_bounds(face: &Face<'_>, run: &GlyphRun) -> Bounds {
    let mut bounds: Option<Bounds> = None;
    let (mut x_cursor, mut y_cursor) = (0, 0);
    for glyph in &run.glyphs {
        if let Some(extents) = face.glyph_extents(glyph.glyph_id) {
            let x = x_cursor + glyph.x_offset + extents.x_bearing;
            let y = y_cursor + glyph.y_offset + extents.y_bearing;
            let ink = (
                x as f32,
                (y + extents.height) as f32,
                (x + extents.width) as f32,
                y as f32,
            );
            bounds = Some(bounds.map_or(ink, |b| union(b, ink)));
        }
        x_cursor += glyph.x_advance;
        y_cursor += glyph.y_advance;
    }
    bounds.unwrap_or((0.0, 0.0, 0.0, 0.0))
}

/// Named instances sorted by weight, or the default location.
fn sample_locations(font: &Font) -> Result<Vec<Option<Variations>>> {
    let mut instances = font.named_instances()?;
    if instances.is_empty() {
        return Ok(vec![None]);
    }
    let weight = |v: &Variations| v.get("wght").copied().unwrap_or(0.0);
    instances.sort_by(|a, b| weight(a).total_cmp(&weight(b)));
    Ok(instances.into_iter().map(Some).collect())
}

struct Row {
    bounds: Bounds,
    y: f32,
    groups: Vec<String>,
}

/// Render `text` as an SVG document.
///
/// Each text line is drawn once per location, heaviest location and last
/// line at the bottom, rows centred horizontally.
///
/// # Errors
///
/// Returns an error if the font cannot be read or a feature is invalid.
#[allow(clippy::cast_precision_loss)]
pub fn render_sample(font: &Font, text: &str, options: &SampleOptions) -> Result<String> {
    let margin = options.margin;
    let colors = font.color_glyphs()?;
    let mut defs_out = Vec::new();
    let mut rows = Vec::new();
    let mut bounds: Option<Bounds> = None;
    let mut y = margin;

    let parameters = ShapingParameters {
        features: Some(options.features.clone()).filter(|f| !f.is_empty()),
        ..ShapingParameters::default()
    };

    let locations = sample_locations(font)?;
    for (index, location) in locations.iter().enumerate().rev() {
        let face = font.face_with_variations(location.as_ref())?;
        let mut defs = Defs::with_prefix(if locations.len() > 1 {
            format!("l{index}")
        } else {
            String::new()
        });

        for line in text.split('\n').rev() {
            let run = shape_with_face(&face, line, &parameters)?;
            let line_ink = line_bounds(&face, &run);
            let placed = (line_ink.0, line_ink.1 + y, line_ink.2, line_ink.3 + y);
            bounds = Some(bounds.map_or(placed, |b| union(b, placed)));

            let mut groups = Vec::with_capacity(run.len());
            let (mut x_cursor, mut y_cursor) = (0, 0);
            for glyph in &run.glyphs {
                groups.push(glyph_group(
                    &face,
                    &colors,
                    glyph.glyph_id,
                    x_cursor + glyph.x_offset,
                    y_cursor + glyph.y_offset,
                    &mut defs,
                ));
                x_cursor += glyph.x_advance;
                y_cursor += glyph.y_advance;
            }
            debug!(line, glyphs = run.len(), y, "Laid out sample row");
            rows.push(Row {
                bounds: placed,
                y,
                groups,
            });
            y += (line_ink.3 - line_ink.1) + margin;
        }
        defs_out.extend(defs.paths().map(str::to_owned));
    }

    let (x_min, y_min, x_max, y_max) = bounds.unwrap_or((0.0, 0.0, 0.0, 0.0));
    let (x_min, y_min, x_max, y_max) = (x_min - margin, y_min - margin, x_max + margin, y_max + margin);
    let (width, height) = (x_max - x_min, y_max - y_min);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{x_min} {} {width} {height}\">",
        -y_max
    );
    svg.push_str("<defs>\n");
    for path in &defs_out {
        svg.push_str(path);
        svg.push('\n');
    }
    svg.push_str("</defs>\n");
    if let Some(background) = options.background {
        let _ = writeln!(
            svg,
            "<rect x=\"{x_min}\" y=\"{}\" width=\"{width}\" height=\"{height}\" fill=\"{}\"/>",
            -y_max,
            background.to_svg()
        );
    }
    match options.foreground {
        Some(foreground) => {
            let _ = writeln!(
                svg,
                "<g transform=\"scale(1,-1)\" fill=\"{}\">",
                foreground.to_svg()
            );
        }
        None => svg.push_str("<g transform=\"scale(1,-1)\">\n"),
    }
    for row in &rows {
        let x = ((x_min + x_max) - (row.bounds.0 + row.bounds.2)) / 2.0;
        let _ = writeln!(svg, "<g transform=\"translate({x},{})\">", row.y);
        for group in &row.groups {
            svg.push_str(group);
            svg.push('\n');
        }
        svg.push_str("</g>\n");
    }
    svg.push_str("</g>\n</svg>\n");

    info!(rows = rows.len(), locations = locations.len(), "Rendered sample");
    Ok(svg)
}
