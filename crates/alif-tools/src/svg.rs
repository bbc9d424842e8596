//! SVG drawing of glyph runs.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rustybuzz::ttf_parser::OutlineBuilder;

use crate::error::Result;
use crate::font::{ColorGlyphs, Face, Font};
use crate::shaping::{GlyphRun, Variations};

/// An 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha, 255 is opaque.
    pub a: u8,
}

impl Rgba {
    /// SVG colour syntax: `rgb(r,g,b)`, with a percentage alpha component
    /// when not opaque.
    #[must_use]
    pub fn to_svg(&self) -> String {
        if self.a == 255 {
            format!("rgb({},{},{})", self.r, self.g, self.b)
        } else {
            let alpha = f64::from(self.a) / 255.0 * 100.0;
            format!("rgb({},{},{},{alpha:.0}%)", self.r, self.g, self.b)
        }
    }
}

/// Collects outline commands as SVG path data.
#[derive(Debug, Default)]
pub struct PathData {
    commands: Vec<String>,
}

impl PathData {
    /// The accumulated path data.
    #[must_use]
    pub fn finish(self) -> String {
        self.commands.concat()
    }
}

impl OutlineBuilder for PathData {
    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(format!("M{x},{y}"));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(format!("L{x},{y}"));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.commands.push(format!("Q{x1},{y1} {x},{y}"));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.commands.push(format!("C{x1},{y1} {x2},{y2} {x},{y}"));
    }

    fn close(&mut self) {
        self.commands.push("Z".to_string());
    }
}

/// SVG path data of one glyph, empty for glyphs without an outline.
#[must_use]
pub fn glyph_path(face: &Face<'_>, glyph_id: u32) -> String {
    let mut path = PathData::default();
    face.outline(glyph_id, &mut path);
    path.finish()
}

/// Glyph definitions shared by the `<use>` elements of one drawing.
///
/// Ids are `{prefix}g{glyph_id}`; drawings that mix several locations of a
/// variable font use one prefix per location.
#[derive(Debug, Default)]
pub(crate) struct Defs {
    prefix: String,
    paths: BTreeMap<u32, String>,
}

impl Defs {
    pub(crate) fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            paths: BTreeMap::new(),
        }
    }

    fn id(&mut self, face: &Face<'_>, glyph_id: u32) -> String {
        let id = format!("{}g{glyph_id}", self.prefix);
        self.paths.entry(glyph_id).or_insert_with(|| {
            let d = glyph_path(face, glyph_id);
            format!("<path id=\"{id}\" d=\"{d}\"/>")
        });
        id
    }

    /// The `<path>` elements, one per line.
    pub(crate) fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.values().map(String::as_str)
    }
}

/// A `<g>` placing one glyph, drawn with its colour layers when it has any.
pub(crate) fn glyph_group(
    face: &Face<'_>,
    colors: &ColorGlyphs<'_>,
    glyph_id: u32,
    x: impl std::fmt::Display,
    y: impl std::fmt::Display,
    defs: &mut Defs,
) -> String {
    let mut svg = vec![format!("<g transform=\"translate({x},{y})\">")];
    if let Some(layers) = colors.layers(glyph_id) {
        for layer in layers {
            let id = defs.id(face, layer.glyph_id);
            match layer.color {
                Some(color) => svg.push(format!(
                    "<use href=\"#{id}\" fill=\"{}\"/>",
                    color.to_svg()
                )),
                None => svg.push(format!("<use href=\"#{id}\"/>")),
            }
        }
    } else {
        let id = defs.id(face, glyph_id);
        svg.push(format!("<use href=\"#{id}\"/>"));
    }
    svg.push("</g>".to_string());
    svg.join("\n")
}

/// Draw a glyph run as a standalone SVG document.
///
/// The view box covers the font's ascender and descender plus the ink and
/// advances of every glyph.
///
/// # Errors
///
/// Returns an error if the font cannot be parsed at the given location.
pub fn draw_run(font: &Font, run: &GlyphRun, variations: Option<&Variations>) -> Result<String> {
    let face = font.face_with_variations(variations)?;
    let colors = font.color_glyphs()?;
    let mut defs = Defs::default();
    let mut groups = Vec::with_capacity(run.len());

    let mut y_max = face.ascender();
    let mut y_min = face.descender();
    let (mut x_min, mut x_max) = (0, 0);

    let (mut x_cursor, mut y_cursor) = (0, 0);
    for glyph in &run.glyphs {
        let x = x_cursor + glyph.x_offset;
        let y = y_cursor + glyph.y_offset;
        groups.push(glyph_group(&face, &colors, glyph.glyph_id, x, y, &mut defs));

        if let Some(extents) = face.glyph_extents(glyph.glyph_id) {
            x_min = x_min.min(x + extents.x_bearing.min(0));
            y_min = y_min.min(y + (extents.height + extents.y_bearing).min(glyph.y_advance));
            x_max = x_max.max(x + (extents.width + extents.x_bearing).max(glyph.x_advance));
            y_max = y_max.max(y + extents.y_bearing.max(0));
        }

        x_cursor += glyph.x_advance;
        y_cursor += glyph.y_advance;
    }

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{x_min} {y_min} {} {}\" \
         transform=\"matrix(1 0 0 -1 0 0)\">",
        x_max - x_min,
        y_max - y_min
    );
    svg.push_str("<defs>\n");
    for path in defs.paths() {
        svg.push_str(path);
        svg.push('\n');
    }
    svg.push_str("</defs>\n");
    for group in groups {
        svg.push_str(&group);
        svg.push('\n');
    }
    svg.push_str("</svg>\n");
    Ok(svg)
}

/// Draw a run and wrap it in an `<img>` tag with a base64 data URI.
///
/// Images keep glyph ids of different drawings apart, which inline SVG in a
/// single page would not.
///
/// # Errors
///
/// Returns an error if the font cannot be parsed at the given location.
pub fn run_to_img(font: &Font, run: &GlyphRun, variations: Option<&Variations>) -> Result<String> {
    let svg = draw_run(font, run, variations)?;
    let encoded = STANDARD.encode(svg.as_bytes());
    Ok(format!(
        "<img src=\"data:image/svg+xml;base64,{encoded}\" alt=\"SVG output\">"
    ))
}
