//! Test fixtures: a tiny TrueType font assembled in memory, and scratch
//! directories that clean up after themselves.
//!
//! The glyph set is listed in [`tables`].

mod tables;

use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::font::Font;

use self::tables::{font_bytes, TableOptions};

/// Builder for the in-memory test font.
pub(crate) struct TestFontBuilder {
    options: TableOptions,
    path: PathBuf,
}

impl TestFontBuilder {
    pub(crate) fn new() -> Self {
        Self {
            options: TableOptions::default(),
            path: PathBuf::from("fonts/Test-Regular.ttf"),
        }
    }

    /// Use a format 3 `post` table, so every glyph is named `gidN`.
    pub(crate) fn unnamed_glyph(mut self) -> Self {
        self.options.glyph_names = false;
        self
    }

    /// Add a GDEF table classing `acutecomb` as a mark.
    pub(crate) fn with_marks(mut self) -> Self {
        self.options.gdef = true;
        self
    }

    /// Add a `wght` axis with Bold (700) and Light (300) instances.
    pub(crate) fn variable(mut self) -> Self {
        self.options.fvar = true;
        self
    }

    /// Make `C` a COLRv0 glyph: `A` in red under `B` in the foreground colour.
    pub(crate) fn color(mut self) -> Self {
        self.options.colr = true;
        self
    }

    pub(crate) fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub(crate) fn bytes(&self) -> Vec<u8> {
        font_bytes(&self.options)
    }

    pub(crate) fn build(&self) -> Font {
        Font::from_bytes(self.path.clone(), self.bytes()).unwrap()
    }

    /// Write the font into `dir` and return its path.
    pub(crate) fn write_to(&self, dir: &Path) -> PathBuf {
        let file_name = self.path.file_name().unwrap();
        let path = dir.join(file_name);
        std::fs::write(&path, self.bytes()).unwrap();
        path
    }
}

/// The default test font.
pub(crate) fn test_font() -> Font {
    TestFontBuilder::new().build()
}

/// A temporary directory removed when dropped.
#[derive(Debug)]
pub(crate) struct ScratchDir(PathBuf);

impl Deref for ScratchDir {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ScratchDir {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// A fresh scratch directory under the system temp dir.
pub(crate) fn scratch_dir(label: &str) -> ScratchDir {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "alif_tools_{label}_{}_{n}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    ScratchDir(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_parsable_font() {
        let bytes = TestFontBuilder::new().bytes();
        let face = rustybuzz::Face::from_slice(&bytes, 0).unwrap();
        assert_eq!(face.number_of_glyphs(), 7);
        assert_eq!(face.units_per_em(), 1000);
    }

    #[test]
    fn test_standard_glyph_names_resolve() {
        let bytes = TestFontBuilder::new().bytes();
        let face = rustybuzz::Face::from_slice(&bytes, 0).unwrap();
        let names = [
            (0, ".notdef"),
            (1, "space"),
            (2, "A"),
            (4, "W"),
            (5, "acutecomb"),
            (6, "C"),
        ];
        for (gid, name) in names {
            let id = rustybuzz::ttf_parser::GlyphId(gid);
            assert_eq!(face.glyph_name(id), Some(name));
            assert_eq!(face.glyph_index_by_name(name), Some(id));
        }
    }

    #[test]
    fn test_optional_tables_parse() {
        let bytes = TestFontBuilder::new().with_marks().variable().color().bytes();
        let face = rustybuzz::Face::from_slice(&bytes, 0).unwrap();
        assert!(face.tables().gdef.is_some());
        assert!(face.tables().fvar.is_some());
        assert!(face.tables().colr.is_some());
    }

    #[test]
    fn test_builder_writes_file() {
        let dir = scratch_dir("builder");
        let path = TestFontBuilder::new().path("Other.ttf").write_to(&dir);
        assert!(path.ends_with("Other.ttf"));
        assert!(Font::load(&path).is_ok());
    }

    #[test]
    fn test_scratch_dir_is_removed_on_drop() {
        let dir = scratch_dir("drop");
        let path = dir.to_path_buf();
        std::fs::write(dir.join("file.txt"), "x").unwrap();
        assert!(path.is_dir());
        drop(dir);
        assert!(!path.exists());
    }
}
