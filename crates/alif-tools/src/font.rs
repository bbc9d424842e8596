//! Font loading and the glyph-level queries the tools need.
//!
//! A [`Font`] owns the file bytes. Shaping faces borrow those bytes and are
//! rebuilt for every variation setting, so no call can leave a face at some
//! other location by accident.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use read_fonts::tables::colr::Colr;
use read_fonts::types::GlyphId;
use read_fonts::{FontRef, TableProvider};
use rustybuzz::ttf_parser::{self, OutlineBuilder};
use tracing::debug;

use crate::error::{Error, Result};
use crate::shaping::Variations;
use crate::svg::Rgba;

/// Palette entry index that means "use the foreground colour".
const FOREGROUND_PALETTE_INDEX: u16 = 0xFFFF;

/// GDEF glyph class of combining marks.
const MARK_GLYPH_CLASS: u16 = 3;

/// A font file loaded into memory.
#[derive(Debug, Clone)]
pub struct Font {
    path: PathBuf,
    file_name: String,
    data: Vec<u8>,
    marks: HashSet<u32>,
}

impl Font {
    /// Read and validate a font file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a font.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read(&path).map_err(|source| Error::FontRead {
            path: path.clone(),
            source,
        })?;
        Self::from_bytes(path, data)
    }

    /// Wrap font bytes that were obtained elsewhere.
    ///
    /// `path` is only used for messages and for matching `only`/`exclude`
    /// lists against the file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not a font.
    pub fn from_bytes(path: PathBuf, data: Vec<u8>) -> Result<Self> {
        if rustybuzz::Face::from_slice(&data, 0).is_none() {
            return Err(Error::FontParse { path });
        }
        let marks = mark_glyphs(&data)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(
            font = %path.display(),
            bytes = data.len(),
            marks = marks.len(),
            "Loaded font"
        );
        Ok(Self {
            path,
            file_name,
            data,
            marks,
        })
    }

    /// Path the font was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component of the path, used by `only`/`exclude` test keys.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Build a face at the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the font data cannot be parsed.
    pub fn face(&self) -> Result<Face<'_>> {
        let inner = rustybuzz::Face::from_slice(&self.data, 0).ok_or_else(|| Error::FontParse {
            path: self.path.clone(),
        })?;
        Ok(Face {
            inner,
            marks: &self.marks,
        })
    }

    /// Build a face with the given user-space axis coordinates applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the font data cannot be parsed or an axis tag is
    /// not a valid OpenType tag.
    pub fn face_with_variations(&self, variations: Option<&Variations>) -> Result<Face<'_>> {
        let mut face = self.face()?;
        if let Some(variations) = variations.filter(|v| !v.is_empty()) {
            let variations = variations
                .iter()
                .map(|(axis, value)| {
                    Ok(rustybuzz::Variation {
                        tag: parse_tag("variation", axis)?,
                        value: *value,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            face.inner.set_variations(&variations);
        }
        Ok(face)
    }

    /// Named instances from the `fvar` table, as axis tag to user coordinate.
    ///
    /// Static fonts return an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the `fvar` table exists but is malformed.
    pub fn named_instances(&self) -> Result<Vec<Variations>> {
        let font = FontRef::new(&self.data)?;
        let Ok(fvar) = font.fvar() else {
            return Ok(Vec::new());
        };
        let arrays = fvar
            .axis_instance_arrays()
            .map_err(|err| Error::font_table("fvar", &err))?;
        let axes = arrays.axes();

        let mut instances = Vec::new();
        for instance in arrays.instances().iter() {
            let instance = instance.map_err(|err| Error::font_table("fvar", &err))?;
            let coordinates = axes
                .iter()
                .zip(instance.coordinates.iter())
                .map(|(axis, value)| {
                    #[allow(clippy::cast_possible_truncation)]
                    let value = value.get().to_f64() as f32;
                    (axis.axis_tag().to_string(), value)
                })
                .collect();
            instances.push(coordinates);
        }
        debug!(count = instances.len(), "Read named instances");
        Ok(instances)
    }

    /// COLRv0 layers and the first CPAL palette.
    ///
    /// # Errors
    ///
    /// Returns an error if the font directory cannot be read or the palette
    /// is malformed.
    pub fn color_glyphs(&self) -> Result<ColorGlyphs<'_>> {
        let font = FontRef::new(&self.data)?;
        let colr = font.colr().ok();
        let mut palette = Vec::new();
        if let Ok(cpal) = font.cpal() {
            let first = cpal
                .color_record_indices()
                .first()
                .map_or(0, |index| usize::from(index.get()));
            let count = usize::from(cpal.num_palette_entries());
            if let Some(records) = cpal.color_records_array() {
                let records = records.map_err(|err| Error::font_table("CPAL", &err))?;
                palette = records
                    .iter()
                    .skip(first)
                    .take(count)
                    .map(|record| Rgba {
                        r: record.red(),
                        g: record.green(),
                        b: record.blue(),
                        a: record.alpha(),
                    })
                    .collect();
            }
        }
        Ok(ColorGlyphs { colr, palette })
    }
}

/// Glyphs the GDEF glyph class definition puts in the mark class.
fn mark_glyphs(data: &[u8]) -> Result<HashSet<u32>> {
    let font = FontRef::new(data)?;
    let Ok(gdef) = font.gdef() else {
        return Ok(HashSet::new());
    };
    match gdef.glyph_class_def() {
        None => Ok(HashSet::new()),
        Some(Err(err)) => Err(Error::font_table("GDEF", &err)),
        Some(Ok(class_def)) => Ok(class_def
            .iter()
            .filter(|(_, class)| *class == MARK_GLYPH_CLASS)
            .map(|(glyph, _)| u32::from(glyph.to_u16()))
            .collect()),
    }
}

/// Parse a one to four character OpenType tag.
pub(crate) fn parse_tag(kind: &'static str, tag: &str) -> Result<ttf_parser::Tag> {
    if tag.is_empty() || tag.len() > 4 || !tag.is_ascii() {
        return Err(Error::invalid_parameter(kind, tag));
    }
    Ok(ttf_parser::Tag::from_bytes_lossy(tag.as_bytes()))
}

/// A shaping face borrowed from a [`Font`].
pub struct Face<'a> {
    inner: rustybuzz::Face<'a>,
    marks: &'a HashSet<u32>,
}

impl fmt::Debug for Face<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Face")
            .field("glyphs", &self.inner.number_of_glyphs())
            .field("coordinates", &self.inner.variation_coordinates().len())
            .finish()
    }
}

/// Glyph extents in HarfBuzz terms: bearings from the origin, `height` is
/// negative for glyphs that go down from `y_bearing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphExtents {
    /// Left side of the ink box.
    pub x_bearing: i32,
    /// Top of the ink box.
    pub y_bearing: i32,
    /// Ink width.
    pub width: i32,
    /// Ink height (negative).
    pub height: i32,
}

impl<'a> Face<'a> {
    /// The rustybuzz face used for shaping.
    #[must_use]
    pub fn shaper(&self) -> &rustybuzz::Face<'a> {
        &self.inner
    }

    /// Glyph name from `post` or CFF, or `gidN` when the font has none.
    #[must_use]
    pub fn glyph_name(&self, glyph_id: u32) -> String {
        u16::try_from(glyph_id)
            .ok()
            .and_then(|id| self.inner.glyph_name(ttf_parser::GlyphId(id)))
            .map_or_else(|| format!("gid{glyph_id}"), str::to_owned)
    }

    /// Look a glyph up by name. `gidN` names are accepted as well.
    #[must_use]
    pub fn glyph_id(&self, name: &str) -> Option<u32> {
        if let Some(id) = self.inner.glyph_index_by_name(name) {
            return Some(u32::from(id.0));
        }
        name.strip_prefix("gid")
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|id| *id < u32::from(self.inner.number_of_glyphs()))
    }

    /// Font ascender in font units.
    #[must_use]
    pub fn ascender(&self) -> i32 {
        i32::from(self.inner.ascender())
    }

    /// Font descender in font units (usually negative).
    #[must_use]
    pub fn descender(&self) -> i32 {
        i32::from(self.inner.descender())
    }

    /// Ink extents of a glyph, `None` for empty glyphs.
    #[must_use]
    pub fn glyph_extents(&self, glyph_id: u32) -> Option<GlyphExtents> {
        let id = u16::try_from(glyph_id).ok()?;
        let rect = self.inner.glyph_bounding_box(ttf_parser::GlyphId(id))?;
        Some(GlyphExtents {
            x_bearing: i32::from(rect.x_min),
            y_bearing: i32::from(rect.y_max),
            width: i32::from(rect.x_max) - i32::from(rect.x_min),
            height: i32::from(rect.y_min) - i32::from(rect.y_max),
        })
    }

    /// Feed the glyph outline to `builder`. Returns false for empty glyphs.
    pub fn outline(&self, glyph_id: u32, builder: &mut dyn OutlineBuilder) -> bool {
        u16::try_from(glyph_id)
            .ok()
            .and_then(|id| self.inner.outline_glyph(ttf_parser::GlyphId(id), builder))
            .is_some()
    }

    /// Whether GDEF classifies the glyph as a mark.
    #[must_use]
    pub fn is_mark(&self, glyph_id: u32) -> bool {
        self.marks.contains(&glyph_id)
    }
}

/// One layer of a COLRv0 colour glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorLayer {
    /// Glyph drawn for this layer.
    pub glyph_id: u32,
    /// Palette colour, `None` for the foreground colour.
    pub color: Option<Rgba>,
}

/// Access to COLRv0 layers with palette 0 resolved.
pub struct ColorGlyphs<'a> {
    colr: Option<Colr<'a>>,
    palette: Vec<Rgba>,
}

impl fmt::Debug for ColorGlyphs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorGlyphs")
            .field("colr", &self.colr.is_some())
            .field("palette", &self.palette)
            .finish()
    }
}

impl ColorGlyphs<'_> {
    /// Layers of a colour glyph, or `None` when the glyph is not a COLRv0
    /// glyph or the font has no palette.
    #[must_use]
    pub fn layers(&self, glyph_id: u32) -> Option<Vec<ColorLayer>> {
        let colr = self.colr.as_ref()?;
        if self.palette.is_empty() {
            return None;
        }
        let range = colr.v0_base_glyph(GlyphId::new(glyph_id)).ok()??;
        let layers = range
            .filter_map(|index| colr.v0_layer(index).ok())
            .map(|(layer_glyph, palette_index)| ColorLayer {
                glyph_id: u32::from(layer_glyph.to_u16()),
                color: if palette_index == FOREGROUND_PALETTE_INDEX {
                    None
                } else {
                    self.palette.get(usize::from(palette_index)).copied()
                },
            })
            .collect::<Vec<_>>();
        (!layers.is_empty()).then_some(layers)
    }
}
