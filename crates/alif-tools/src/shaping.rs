//! Shaping parameters, shaping, and the textual glyph-run format.
//!
//! A glyph run serializes as `|`-separated items. The full form of an item is
//! `name=cluster[@x_offset,y_offset]+x_advance`; the glyphs-only form is just
//! the glyph name. Clusters count Unicode scalar values of the input text.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rustybuzz::{Feature, Language, Script, UnicodeBuffer};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::font::{parse_tag, Face, Font};

/// Axis tag to user-space coordinate.
pub type Variations = BTreeMap<String, f32>;

/// Feature tag to value.
pub type Features = BTreeMap<String, FeatureValue>;

/// Text direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Left to right.
    Ltr,
    /// Right to left.
    Rtl,
    /// Top to bottom.
    Ttb,
    /// Bottom to top.
    Btt,
}

impl From<Direction> for rustybuzz::Direction {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Ltr => Self::LeftToRight,
            Direction::Rtl => Self::RightToLeft,
            Direction::Ttb => Self::TopToBottom,
            Direction::Btt => Self::BottomToTop,
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ltr" => Ok(Self::Ltr),
            "rtl" => Ok(Self::Rtl),
            "ttb" => Ok(Self::Ttb),
            "btt" => Ok(Self::Btt),
            _ => Err(Error::invalid_parameter("direction", s)),
        }
    }
}

/// Value of an OpenType feature in a test file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Enable (`true`) or disable (`false`) for the whole text.
    Switch(bool),
    /// Set a value (alternate index) for the whole text.
    Value(u32),
    /// `[value, start, end]` ranges in character indices; `end < 0` means
    /// "to the end of the text".
    Ranges(Vec<[i64; 3]>),
}

/// Parameters that control how a text is shaped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapingParameters {
    /// ISO 15924 script tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// BCP 47 language tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Text direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// OpenType features.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Features>,
    /// Shaper to use. Only `ot` is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shaper: Option<String>,
    /// Variable font location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variations: Option<Variations>,
}

impl ShapingParameters {
    /// Fill every unset field from `defaults`.
    #[must_use]
    pub fn or(&self, defaults: &ShapingParameters) -> ShapingParameters {
        ShapingParameters {
            script: self.script.clone().or_else(|| defaults.script.clone()),
            language: self.language.clone().or_else(|| defaults.language.clone()),
            direction: self.direction.or(defaults.direction),
            features: self.features.clone().or_else(|| defaults.features.clone()),
            shaper: self.shaper.clone().or_else(|| defaults.shaper.clone()),
            variations: self
                .variations
                .clone()
                .or_else(|| defaults.variations.clone()),
        }
    }

    /// Drop empty strings and empty maps, which mean "not set".
    #[must_use]
    pub fn without_empty(mut self) -> ShapingParameters {
        self.script = self.script.filter(|s| !s.is_empty());
        self.language = self.language.filter(|s| !s.is_empty());
        self.shaper = self.shaper.filter(|s| !s.is_empty());
        self.features = self.features.filter(|f| !f.is_empty());
        self.variations = self.variations.filter(|v| !v.is_empty());
        self
    }

    /// Whether no parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == ShapingParameters::default()
    }

    fn rustybuzz_features(&self, text: &str) -> Result<Vec<Feature>> {
        let Some(features) = &self.features else {
            return Ok(Vec::new());
        };

        let mut out = Vec::with_capacity(features.len());
        for (tag, value) in features {
            let tag = parse_tag("feature", tag)?;
            match value {
                FeatureValue::Switch(on) => out.push(Feature::new(tag, u32::from(*on), ..)),
                FeatureValue::Value(value) => out.push(Feature::new(tag, *value, ..)),
                FeatureValue::Ranges(ranges) => {
                    for &[value, start, end] in ranges {
                        let value = u32::try_from(value)
                            .map_err(|_| Error::invalid_parameter("feature", value.to_string()))?;
                        let start = byte_offset(text, start);
                        if end < 0 {
                            out.push(Feature::new(tag, value, start..));
                        } else {
                            out.push(Feature::new(tag, value, start..byte_offset(text, end)));
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Byte offset of the `index`-th character, clamped to the text length.
fn byte_offset(text: &str, index: i64) -> usize {
    let Ok(index) = usize::try_from(index) else {
        return 0;
    };
    text.char_indices()
        .nth(index)
        .map_or(text.len(), |(offset, _)| offset)
}

/// One glyph of a shaped (or parsed) run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShapedGlyph {
    /// Glyph id in the font; 0 for names the font does not know.
    pub glyph_id: u32,
    /// Glyph name.
    pub name: String,
    /// Index of the first character of the cluster.
    pub cluster: u32,
    /// Horizontal offset.
    pub x_offset: i32,
    /// Vertical offset.
    pub y_offset: i32,
    /// Horizontal advance.
    pub x_advance: i32,
    /// Vertical advance.
    pub y_advance: i32,
}

/// A sequence of positioned glyphs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphRun {
    /// The glyphs in visual order.
    pub glyphs: Vec<ShapedGlyph>,
}

impl GlyphRun {
    /// Number of glyphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether the run has no glyphs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Serialize the run, either as glyph names only or with clusters and
    /// positions.
    #[must_use]
    pub fn serialize(&self, glyphs_only: bool) -> String {
        let mut items = Vec::with_capacity(self.glyphs.len());
        for glyph in &self.glyphs {
            if glyphs_only {
                items.push(glyph.name.clone());
                continue;
            }
            let mut item = format!("{}={}", glyph.name, glyph.cluster);
            if glyph.x_offset != 0 || glyph.y_offset != 0 {
                let _ = write!(item, "@{},{}", glyph.x_offset, glyph.y_offset);
            }
            let _ = write!(item, "+{}", glyph.x_advance);
            items.push(item);
        }
        items.join("|")
    }

    /// Parse the full serialized form back into a run.
    ///
    /// Glyph names unknown to `face` keep their name and get glyph id 0.
    /// Vertical advances are not part of the format and are always 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExpectationParse`] for a malformed item.
    pub fn parse(face: &Face<'_>, text: &str) -> Result<Self> {
        static ITEM: OnceLock<Regex> = OnceLock::new();
        let item_re = ITEM.get_or_init(|| {
            Regex::new(r"^(.*)=(\d+)(@(-?\d+),(-?\d+))?(\+(-?\d+))?$")
                .expect("glyph item pattern is valid")
        });

        let parse_error = |item: &str| Error::ExpectationParse {
            item: item.to_string(),
            text: text.to_string(),
        };

        let mut glyphs = Vec::new();
        for item in text.split('|') {
            let caps = item_re.captures(item).ok_or_else(|| parse_error(item))?;
            let number = |index: usize| -> Result<i32> {
                caps.get(index)
                    .map_or(Ok(0), |m| m.as_str().parse().map_err(|_| parse_error(item)))
            };
            let name = caps[1].to_string();
            glyphs.push(ShapedGlyph {
                glyph_id: face.glyph_id(&name).unwrap_or(0),
                cluster: caps[2].parse().map_err(|_| parse_error(item))?,
                x_offset: number(4)?,
                y_offset: number(5)?,
                x_advance: number(7)?,
                y_advance: 0,
                name,
            });
        }
        Ok(Self { glyphs })
    }
}

/// Shape `text` with `font`, applying the variations in `parameters`.
///
/// # Errors
///
/// Returns an error if the font cannot be parsed or a parameter is invalid.
pub fn shape(font: &Font, text: &str, parameters: &ShapingParameters) -> Result<GlyphRun> {
    let face = font.face_with_variations(parameters.variations.as_ref())?;
    shape_with_face(&face, text, parameters)
}

/// Shape `text` with an already prepared face. Variations in `parameters`
/// are ignored; they belong to the face.
///
/// # Errors
///
/// Returns an error if a parameter is invalid.
pub fn shape_with_face(
    face: &Face<'_>,
    text: &str,
    parameters: &ShapingParameters,
) -> Result<GlyphRun> {
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.guess_segment_properties();

    if let Some(script) = parameters.script.as_deref() {
        let tag = parse_tag("script", script)?;
        let script = Script::from_iso15924_tag(tag)
            .ok_or_else(|| Error::invalid_parameter("script", script))?;
        buffer.set_script(script);
    }
    if let Some(direction) = parameters.direction {
        buffer.set_direction(direction.into());
    }
    if let Some(language) = parameters.language.as_deref() {
        let language = Language::from_str(language)
            .map_err(|_| Error::invalid_parameter("language", language))?;
        buffer.set_language(language);
    }
    if let Some(shaper) = parameters.shaper.as_deref() {
        if shaper != "ot" {
            warn!(shaper, "Only the OpenType shaper is available, ignoring");
        }
    }

    let features = parameters.rustybuzz_features(text)?;
    let output = rustybuzz::shape(face.shaper(), &features, buffer);

    // rustybuzz clusters are byte offsets.
    let char_starts: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    let glyphs = output
        .glyph_infos()
        .iter()
        .zip(output.glyph_positions())
        .map(|(info, pos)| {
            let byte = usize::try_from(info.cluster).unwrap_or(usize::MAX);
            let cluster = u32::try_from(char_starts.partition_point(|&start| start < byte))
                .unwrap_or(u32::MAX);
            ShapedGlyph {
                glyph_id: info.glyph_id,
                name: face.glyph_name(info.glyph_id),
                cluster,
                x_offset: pos.x_offset,
                y_offset: pos.y_offset,
                x_advance: pos.x_advance,
                y_advance: pos.y_advance,
            }
        })
        .collect();

    let run = GlyphRun { glyphs };
    trace!(text, output = %run.serialize(false), "Shaped");
    Ok(run)
}
