//! Byte-level builders for the test font tables.
//!
//! Only std is used here so the integration tests can include this file
//! directly.
//!
//! | gid | name      | char   | advance | outline                        |
//! |-----|-----------|--------|---------|--------------------------------|
//! | 0   | .notdef   |        | 500     | box 0,0 - 500,700              |
//! | 1   | space     | ` `    | 250     | empty                          |
//! | 2   | A         | `A`    | 600     | box 50,0 - 550,700             |
//! | 3   | B         | `B`    | 500     | triangle 50,0 450,0 250,600    |
//! | 4   | W         | `W`    | 400     | box 0,0 - 900,300 (overhangs)  |
//! | 5   | acutecomb | U+0301 | 0       | box 200,750 - 400,900 (mark)   |
//! | 6   | C         | `C`    | 600     | box 50,0 - 550,700             |

#![allow(dead_code)]

/// Optional tables on top of the always present TrueType set.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableOptions {
    /// `post` format 2 with names, else format 3.
    pub(crate) glyph_names: bool,
    /// GDEF glyph classes with `acutecomb` as a mark.
    pub(crate) gdef: bool,
    /// A `wght` axis with Bold and Light named instances.
    pub(crate) fvar: bool,
    /// COLRv0 and CPAL making `C` a two layer colour glyph.
    pub(crate) colr: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            glyph_names: true,
            gdef: false,
            fvar: false,
            colr: false,
        }
    }
}

struct TestGlyph {
    name: &'static str,
    codepoint: Option<u16>,
    advance: u16,
    mark: bool,
    contours: Vec<Vec<(i16, i16)>>,
}

fn rect(x0: i16, y0: i16, x1: i16, y1: i16) -> Vec<(i16, i16)> {
    vec![(x0, y0), (x0, y1), (x1, y1), (x1, y0)]
}

fn glyph(
    name: &'static str,
    codepoint: Option<u16>,
    advance: u16,
    contours: Vec<Vec<(i16, i16)>>,
) -> TestGlyph {
    TestGlyph {
        name,
        codepoint,
        advance,
        mark: false,
        contours,
    }
}

fn glyphs() -> Vec<TestGlyph> {
    vec![
        glyph(".notdef", None, 500, vec![rect(0, 0, 500, 700)]),
        glyph("space", Some(0x20), 250, Vec::new()),
        glyph("A", Some(0x41), 600, vec![rect(50, 0, 550, 700)]),
        glyph("B", Some(0x42), 500, vec![vec![(50, 0), (250, 600), (450, 0)]]),
        glyph("W", Some(0x57), 400, vec![rect(0, 0, 900, 300)]),
        TestGlyph {
            mark: true,
            ..glyph("acutecomb", Some(0x0301), 0, vec![rect(200, 750, 400, 900)])
        },
        glyph("C", Some(0x43), 600, vec![rect(50, 0, 550, 700)]),
    ]
}

/// Assemble a complete font file.
pub(crate) fn font_bytes(options: &TableOptions) -> Vec<u8> {
    let glyphs = glyphs();
    let (glyf, loca, bbox) = build_glyf(&glyphs);
    let mut tables: Vec<(&[u8; 4], Vec<u8>)> = vec![
        (b"cmap", build_cmap(&glyphs)),
        (b"glyf", glyf),
        (b"head", build_head(bbox)),
        (b"hhea", build_hhea(&glyphs)),
        (b"hmtx", build_hmtx(&glyphs)),
        (b"loca", loca),
        (b"maxp", build_maxp(&glyphs)),
        (b"post", build_post(&glyphs, options.glyph_names)),
    ];
    if options.gdef {
        tables.push((b"GDEF", build_gdef(&glyphs)));
    }
    if options.fvar {
        tables.push((b"fvar", build_fvar()));
    }
    if options.colr {
        tables.push((b"COLR", build_colr(&glyphs)));
        tables.push((b"CPAL", build_cpal()));
    }
    assemble(tables)
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn num_glyphs(glyphs: &[TestGlyph]) -> u16 {
    u16::try_from(glyphs.len()).unwrap()
}

fn build_glyf(glyphs: &[TestGlyph]) -> (Vec<u8>, Vec<u8>, [i16; 4]) {
    let mut glyf = Vec::new();
    let mut loca = Vec::new();
    let mut font_bbox = [i16::MAX, i16::MAX, i16::MIN, i16::MIN];

    for glyph in glyphs {
        push_u16(&mut loca, u16::try_from(glyf.len() / 2).unwrap());
        if glyph.contours.is_empty() {
            continue;
        }

        let points: Vec<(i16, i16)> = glyph.contours.iter().flatten().copied().collect();
        let x_min = points.iter().map(|p| p.0).min().unwrap();
        let y_min = points.iter().map(|p| p.1).min().unwrap();
        let x_max = points.iter().map(|p| p.0).max().unwrap();
        let y_max = points.iter().map(|p| p.1).max().unwrap();
        font_bbox = [
            font_bbox[0].min(x_min),
            font_bbox[1].min(y_min),
            font_bbox[2].max(x_max),
            font_bbox[3].max(y_max),
        ];

        push_i16(&mut glyf, i16::try_from(glyph.contours.len()).unwrap());
        for value in [x_min, y_min, x_max, y_max] {
            push_i16(&mut glyf, value);
        }
        let mut end = 0usize;
        for contour in &glyph.contours {
            end += contour.len();
            push_u16(&mut glyf, u16::try_from(end - 1).unwrap());
        }
        push_u16(&mut glyf, 0); // instructions
        glyf.extend(std::iter::repeat(0x01u8).take(points.len())); // on-curve, long deltas
        let (mut last_x, mut last_y) = (0i16, 0i16);
        for &(x, _) in &points {
            push_i16(&mut glyf, x - last_x);
            last_x = x;
        }
        for &(_, y) in &points {
            push_i16(&mut glyf, y - last_y);
            last_y = y;
        }
        if glyf.len() % 2 == 1 {
            glyf.push(0);
        }
    }
    push_u16(&mut loca, u16::try_from(glyf.len() / 2).unwrap());
    (glyf, loca, font_bbox)
}

fn build_head(bbox: [i16; 4]) -> Vec<u8> {
    let mut head = Vec::new();
    push_u32(&mut head, 0x0001_0000); // version
    push_u32(&mut head, 0x0001_0000); // fontRevision
    push_u32(&mut head, 0); // checksumAdjustment
    push_u32(&mut head, 0x5F0F_3CF5); // magic
    push_u16(&mut head, 0x000B); // flags
    push_u16(&mut head, 1000); // unitsPerEm
    head.extend_from_slice(&[0; 16]); // created, modified
    for value in bbox {
        push_i16(&mut head, value);
    }
    push_u16(&mut head, 0); // macStyle
    push_u16(&mut head, 8); // lowestRecPPEM
    push_i16(&mut head, 2); // fontDirectionHint
    push_i16(&mut head, 0); // indexToLocFormat: short
    push_i16(&mut head, 0); // glyphDataFormat
    head
}

fn build_hhea(glyphs: &[TestGlyph]) -> Vec<u8> {
    let mut hhea = Vec::new();
    push_u32(&mut hhea, 0x0001_0000);
    push_i16(&mut hhea, 800); // ascender
    push_i16(&mut hhea, -200); // descender
    push_i16(&mut hhea, 0); // lineGap
    push_u16(&mut hhea, glyphs.iter().map(|g| g.advance).max().unwrap());
    push_i16(&mut hhea, 0); // minLeftSideBearing
    push_i16(&mut hhea, 0); // minRightSideBearing
    push_i16(&mut hhea, 900); // xMaxExtent
    push_i16(&mut hhea, 1); // caretSlopeRise
    push_i16(&mut hhea, 0); // caretSlopeRun
    push_i16(&mut hhea, 0); // caretOffset
    hhea.extend_from_slice(&[0; 8]); // reserved
    push_i16(&mut hhea, 0); // metricDataFormat
    push_u16(&mut hhea, num_glyphs(glyphs));
    hhea
}

fn build_hmtx(glyphs: &[TestGlyph]) -> Vec<u8> {
    let mut hmtx = Vec::new();
    for glyph in glyphs {
        push_u16(&mut hmtx, glyph.advance);
        let lsb = glyph.contours.iter().flatten().map(|p| p.0).min().unwrap_or(0);
        push_i16(&mut hmtx, lsb);
    }
    hmtx
}

fn build_maxp(glyphs: &[TestGlyph]) -> Vec<u8> {
    let mut maxp = Vec::new();
    push_u32(&mut maxp, 0x0000_5000);
    push_u16(&mut maxp, num_glyphs(glyphs));
    maxp
}

fn build_cmap(glyphs: &[TestGlyph]) -> Vec<u8> {
    let mut mapping: Vec<(u16, u16)> = glyphs
        .iter()
        .enumerate()
        .filter_map(|(gid, g)| g.codepoint.map(|c| (c, u16::try_from(gid).unwrap())))
        .collect();
    mapping.sort_unstable();

    let seg_count = u16::try_from(mapping.len() + 1).unwrap();
    let mut entry_selector = 0u16;
    while (1u16 << (entry_selector + 1)) <= seg_count {
        entry_selector += 1;
    }
    let search_range = 2 * (1u16 << entry_selector);

    let mut subtable = Vec::new();
    push_u16(&mut subtable, 4); // format
    push_u16(&mut subtable, 16 + 8 * seg_count); // length
    push_u16(&mut subtable, 0); // language
    push_u16(&mut subtable, seg_count * 2);
    push_u16(&mut subtable, search_range);
    push_u16(&mut subtable, entry_selector);
    push_u16(&mut subtable, seg_count * 2 - search_range);
    for &(c, _) in &mapping {
        push_u16(&mut subtable, c);
    }
    push_u16(&mut subtable, 0xFFFF);
    push_u16(&mut subtable, 0); // reservedPad
    for &(c, _) in &mapping {
        push_u16(&mut subtable, c);
    }
    push_u16(&mut subtable, 0xFFFF);
    for &(c, gid) in &mapping {
        push_u16(&mut subtable, gid.wrapping_sub(c));
    }
    push_u16(&mut subtable, 1);
    for _ in 0..seg_count {
        push_u16(&mut subtable, 0); // idRangeOffset
    }

    let mut cmap = Vec::new();
    push_u16(&mut cmap, 0); // version
    push_u16(&mut cmap, 1); // numTables
    push_u16(&mut cmap, 3); // platform: Windows
    push_u16(&mut cmap, 1); // encoding: Unicode BMP
    push_u32(&mut cmap, 12);
    cmap.extend(subtable);
    cmap
}

/// Index of `name` among the 258 standard Macintosh glyph names, for the
/// names the fixture uses.
fn standard_name_index(name: &str) -> Option<u16> {
    match name.as_bytes() {
        b".notdef" => Some(0),
        b"space" => Some(3),
        &[c] if c.is_ascii_uppercase() => Some(36 + u16::from(c - b'A')),
        _ => None,
    }
}

fn build_post(glyphs: &[TestGlyph], names: bool) -> Vec<u8> {
    let mut post = Vec::new();
    push_u32(&mut post, if names { 0x0002_0000 } else { 0x0003_0000 });
    push_u32(&mut post, 0); // italicAngle
    push_i16(&mut post, -100); // underlinePosition
    push_i16(&mut post, 50); // underlineThickness
    post.extend_from_slice(&[0; 20]); // isFixedPitch, memory usage
    if !names {
        return post;
    }

    push_u16(&mut post, num_glyphs(glyphs));
    let mut custom = Vec::new();
    for glyph in glyphs {
        if let Some(index) = standard_name_index(glyph.name) {
            push_u16(&mut post, index);
        } else {
            push_u16(&mut post, 258 + u16::try_from(custom.len()).unwrap());
            custom.push(glyph.name);
        }
    }
    for name in custom {
        post.push(u8::try_from(name.len()).unwrap());
        post.extend_from_slice(name.as_bytes());
    }
    post
}

fn build_gdef(glyphs: &[TestGlyph]) -> Vec<u8> {
    let mut gdef = Vec::new();
    push_u16(&mut gdef, 1); // majorVersion
    push_u16(&mut gdef, 0); // minorVersion
    push_u16(&mut gdef, 12); // glyphClassDefOffset
    push_u16(&mut gdef, 0); // attachListOffset
    push_u16(&mut gdef, 0); // ligCaretListOffset
    push_u16(&mut gdef, 0); // markAttachClassDefOffset
    push_u16(&mut gdef, 1); // classFormat
    push_u16(&mut gdef, 0); // startGlyphID
    push_u16(&mut gdef, num_glyphs(glyphs));
    for glyph in glyphs {
        push_u16(&mut gdef, if glyph.mark { 3 } else { 1 });
    }
    gdef
}

fn push_fixed(out: &mut Vec<u8>, value: u16) {
    push_u32(out, u32::from(value) << 16);
}

/// One `wght` axis (100..900, default 400) and two named instances, Bold
/// then Light.
fn build_fvar() -> Vec<u8> {
    let mut fvar = Vec::new();
    push_u16(&mut fvar, 1); // majorVersion
    push_u16(&mut fvar, 0); // minorVersion
    push_u16(&mut fvar, 16); // axesArrayOffset
    push_u16(&mut fvar, 2); // reserved
    push_u16(&mut fvar, 1); // axisCount
    push_u16(&mut fvar, 20); // axisSize
    push_u16(&mut fvar, 2); // instanceCount
    push_u16(&mut fvar, 8); // instanceSize
    fvar.extend_from_slice(b"wght");
    for value in [100, 400, 900] {
        push_fixed(&mut fvar, value);
    }
    push_u16(&mut fvar, 0); // flags
    push_u16(&mut fvar, 256); // axisNameID
    for (name_id, weight) in [(257, 700), (258, 300)] {
        push_u16(&mut fvar, name_id);
        push_u16(&mut fvar, 0); // flags
        push_fixed(&mut fvar, weight);
    }
    fvar
}

/// `C` drawn as `A` in palette colour 0 under `B` in the foreground colour.
fn build_colr(glyphs: &[TestGlyph]) -> Vec<u8> {
    let gid = |name: &str| {
        let index = glyphs.iter().position(|g| g.name == name).unwrap();
        u16::try_from(index).unwrap()
    };
    let mut colr = Vec::new();
    push_u16(&mut colr, 0); // version
    push_u16(&mut colr, 1); // numBaseGlyphRecords
    push_u32(&mut colr, 14); // baseGlyphRecordsOffset
    push_u32(&mut colr, 20); // layerRecordsOffset
    push_u16(&mut colr, 2); // numLayerRecords
    push_u16(&mut colr, gid("C"));
    push_u16(&mut colr, 0); // firstLayerIndex
    push_u16(&mut colr, 2); // numLayers
    push_u16(&mut colr, gid("A"));
    push_u16(&mut colr, 0);
    push_u16(&mut colr, gid("B"));
    push_u16(&mut colr, 0xFFFF);
    colr
}

/// One palette with a single opaque red entry.
fn build_cpal() -> Vec<u8> {
    let mut cpal = Vec::new();
    push_u16(&mut cpal, 0); // version
    push_u16(&mut cpal, 1); // numPaletteEntries
    push_u16(&mut cpal, 1); // numPalettes
    push_u16(&mut cpal, 1); // numColorRecords
    push_u32(&mut cpal, 14); // colorRecordsArrayOffset
    push_u16(&mut cpal, 0); // colorRecordIndices[0]
    cpal.extend_from_slice(&[0x00, 0x00, 0xFF, 0xFF]); // BGRA
    cpal
}

fn assemble(mut tables: Vec<(&[u8; 4], Vec<u8>)>) -> Vec<u8> {
    tables.sort_by_key(|(tag, _)| **tag);
    let num_tables = u16::try_from(tables.len()).unwrap();
    let mut entry_selector = 0u16;
    while (1u16 << (entry_selector + 1)) <= num_tables {
        entry_selector += 1;
    }
    let search_range = 16 * (1u16 << entry_selector);

    let mut out = Vec::new();
    push_u32(&mut out, 0x0001_0000);
    push_u16(&mut out, num_tables);
    push_u16(&mut out, search_range);
    push_u16(&mut out, entry_selector);
    push_u16(&mut out, num_tables * 16 - search_range);

    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        out.extend_from_slice(*tag);
        push_u32(&mut out, 0); // checksum
        push_u32(&mut out, u32::try_from(offset).unwrap());
        push_u32(&mut out, u32::try_from(data.len()).unwrap());
        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }
    out.extend(body);
    out
}
