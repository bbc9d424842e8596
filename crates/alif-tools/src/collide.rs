//! Glyph collision detection on shaped runs.
//!
//! Outlines are flattened into polygons placed at their pen positions. Pairs
//! of glyphs are filtered by [`CollisionSettings`] and then tested for
//! overlapping outlines.

use std::fmt::Write as _;

use rustybuzz::ttf_parser::OutlineBuilder;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;
use crate::font::Font;
use crate::shaping::{GlyphRun, Variations};
use crate::svg::glyph_path;

/// Line segments used for each curve when flattening outlines.
const CURVE_STEPS: u16 = 8;

/// Which glyph pairs are checked for collisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionSettings {
    /// Base glyphs of different clusters.
    pub bases: bool,
    /// Marks, against marks and against bases.
    pub marks: bool,
    /// Glyphs of clusters that are not next to each other.
    pub faraway: bool,
    /// Glyphs of neighbouring clusters.
    pub adjacent_clusters: bool,
    /// Consecutive bases, which usually join in cursive scripts.
    pub cursive: bool,
    /// Minimum bounding box overlap, as a percentage of the smaller box.
    pub area: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            bases: true,
            marks: true,
            faraway: true,
            adjacent_clusters: true,
            cursive: false,
            area: 0.0,
        }
    }
}

/// A point in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

/// An axis-aligned box in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left.
    pub x_min: f32,
    /// Bottom.
    pub y_min: f32,
    /// Right.
    pub x_max: f32,
    /// Top.
    pub y_max: f32,
}

impl Rect {
    fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut rect = Rect {
            x_min: first.x,
            y_min: first.y,
            x_max: first.x,
            y_max: first.y,
        };
        for p in points {
            rect.x_min = rect.x_min.min(p.x);
            rect.y_min = rect.y_min.min(p.y);
            rect.x_max = rect.x_max.max(p.x);
            rect.y_max = rect.y_max.max(p.y);
        }
        Some(rect)
    }

    /// Area of the box.
    #[must_use]
    pub fn area(&self) -> f32 {
        (self.x_max - self.x_min) * (self.y_max - self.y_min)
    }

    /// The overlap of two boxes, `None` unless their interiors intersect.
    #[must_use]
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let rect = Rect {
            x_min: self.x_min.max(other.x_min),
            y_min: self.y_min.max(other.y_min),
            x_max: self.x_max.min(other.x_max),
            y_max: self.y_max.min(other.y_max),
        };
        (rect.x_min < rect.x_max && rect.y_min < rect.y_max).then_some(rect)
    }
}

/// Flattens outlines into closed polygons, offset by a pen position.
struct Flattener {
    dx: f32,
    dy: f32,
    contours: Vec<Vec<Point>>,
    current: Vec<Point>,
    last: Point,
}

impl Flattener {
    fn new(dx: f32, dy: f32) -> Self {
        Self {
            dx,
            dy,
            contours: Vec::new(),
            current: Vec::new(),
            last: Point { x: 0.0, y: 0.0 },
        }
    }

    fn push(&mut self, x: f32, y: f32) {
        self.last = Point { x, y };
        self.current.push(Point {
            x: x + self.dx,
            y: y + self.dy,
        });
    }

    fn end_contour(&mut self) {
        if self.current.len() > 1 {
            self.contours.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }

    fn finish(mut self) -> Vec<Vec<Point>> {
        self.end_contour();
        self.contours
    }
}

impl OutlineBuilder for Flattener {
    fn move_to(&mut self, x: f32, y: f32) {
        self.end_contour();
        self.push(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p0 = self.last;
        for step in 1..=CURVE_STEPS {
            let t = f32::from(step) / f32::from(CURVE_STEPS);
            let u = 1.0 - t;
            self.push(
                u * u * p0.x + 2.0 * u * t * x1 + t * t * x,
                u * u * p0.y + 2.0 * u * t * y1 + t * t * y,
            );
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let p0 = self.last;
        for step in 1..=CURVE_STEPS {
            let t = f32::from(step) / f32::from(CURVE_STEPS);
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            self.push(
                a * p0.x + b * x1 + c * x2 + d * x,
                a * p0.y + b * y1 + c * y2 + d * y,
            );
        }
    }

    fn close(&mut self) {
        self.end_contour();
    }
}

/// A glyph of a run placed at its pen position.
#[derive(Debug, Clone)]
pub struct PositionedGlyph {
    /// Position in the run.
    pub index: usize,
    /// Glyph name.
    pub name: String,
    /// Cluster of the glyph.
    pub cluster: u32,
    /// Whether GDEF classifies the glyph as a mark.
    pub is_mark: bool,
    /// Pen position including offsets.
    pub origin: Point,
    /// Flattened outline in absolute coordinates.
    pub contours: Vec<Vec<Point>>,
    /// Bounds of the outline, `None` for empty glyphs.
    pub bounds: Option<Rect>,
    /// SVG path data relative to `origin`.
    pub path: String,
}

/// Place every glyph of `run` and flatten its outline.
///
/// # Errors
///
/// Returns an error if the font cannot be parsed at the given location.
#[allow(clippy::cast_precision_loss)]
pub fn positioned_glyphs(
    font: &Font,
    run: &GlyphRun,
    variations: Option<&Variations>,
) -> Result<Vec<PositionedGlyph>> {
    let face = font.face_with_variations(variations)?;
    let mut glyphs = Vec::with_capacity(run.len());
    let (mut x_cursor, mut y_cursor) = (0, 0);
    for (index, glyph) in run.glyphs.iter().enumerate() {
        let origin = Point {
            x: (x_cursor + glyph.x_offset) as f32,
            y: (y_cursor + glyph.y_offset) as f32,
        };
        let mut flattener = Flattener::new(origin.x, origin.y);
        face.outline(glyph.glyph_id, &mut flattener);
        let contours = flattener.finish();
        let bounds = Rect::from_points(contours.iter().flatten());

        glyphs.push(PositionedGlyph {
            index,
            name: glyph.name.clone(),
            cluster: glyph.cluster,
            is_mark: face.is_mark(glyph.glyph_id),
            origin,
            contours,
            bounds,
            path: glyph_path(&face, glyph.glyph_id),
        });

        x_cursor += glyph.x_advance;
        y_cursor += glyph.y_advance;
    }
    Ok(glyphs)
}

/// Two glyphs whose outlines overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    /// Name of the first glyph in run order.
    pub glyph1: String,
    /// Name of the second glyph in run order.
    pub glyph2: String,
    /// Run index of the first glyph.
    pub index1: usize,
    /// Run index of the second glyph.
    pub index2: usize,
    /// Overlap of the two bounding boxes.
    pub overlap: Rect,
}

impl Collision {
    /// `glyph1/glyph2`, the form used by `allowedcollisions`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.glyph1, self.glyph2)
    }
}

fn orientation(a: Point, b: Point, c: Point) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segments_cross(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

fn edges(contour: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    contour
        .iter()
        .zip(contour.iter().cycle().skip(1))
        .map(|(a, b)| (*a, *b))
}

/// Even-odd containment over all contours.
fn contains(contours: &[Vec<Point>], point: Point) -> bool {
    let mut inside = false;
    for contour in contours {
        for (a, b) in edges(contour) {
            if (a.y > point.y) != (b.y > point.y) {
                let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if point.x < x {
                    inside = !inside;
                }
            }
        }
    }
    inside
}

fn outlines_overlap(first: &PositionedGlyph, second: &PositionedGlyph) -> bool {
    for c1 in &first.contours {
        for (p1, p2) in edges(c1) {
            for c2 in &second.contours {
                if edges(c2).any(|(q1, q2)| segments_cross(p1, p2, q1, q2)) {
                    return true;
                }
            }
        }
    }
    boundary_points(first).any(|p| contains(&second.contours, p))
        || boundary_points(second).any(|p| contains(&first.contours, p))
}

/// Vertices and edge midpoints of a glyph. Midpoints catch overlaps between
/// shapes that only share boundary vertices, such as boxes on one baseline.
fn boundary_points(glyph: &PositionedGlyph) -> impl Iterator<Item = Point> + '_ {
    glyph.contours.iter().flat_map(|contour| {
        edges(contour).flat_map(|(a, b)| {
            [
                a,
                Point {
                    x: (a.x + b.x) / 2.0,
                    y: (a.y + b.y) / 2.0,
                },
            ]
        })
    })
}

/// Collision finder configured by [`CollisionSettings`].
#[derive(Debug, Clone, Default)]
pub struct Collidoscope {
    settings: CollisionSettings,
}

impl Collidoscope {
    /// Create a finder with the given settings.
    #[must_use]
    pub fn new(settings: CollisionSettings) -> Self {
        Self { settings }
    }

    /// The settings in use.
    #[must_use]
    pub fn settings(&self) -> &CollisionSettings {
        &self.settings
    }

    fn should_check(&self, first: &PositionedGlyph, second: &PositionedGlyph, ranks: &[u32]) -> bool {
        let s = &self.settings;
        if first.cluster == second.cluster {
            return s.marks && first.is_mark && second.is_mark;
        }

        let rank = |cluster: u32| ranks.partition_point(|&c| c < cluster);
        let distance = rank(first.cluster).abs_diff(rank(second.cluster));
        let cluster_rule = if distance == 1 {
            s.adjacent_clusters
        } else {
            s.faraway
        };
        if !cluster_rule {
            return false;
        }

        match (first.is_mark, second.is_mark) {
            (false, false) if second.index == first.index + 1 => s.cursive,
            (false, false) => s.bases,
            _ => s.marks,
        }
    }

    /// Every colliding pair of `glyphs`, in run order.
    #[must_use]
    pub fn find_collisions(&self, glyphs: &[PositionedGlyph]) -> Vec<Collision> {
        let mut ranks: Vec<u32> = glyphs.iter().map(|g| g.cluster).collect();
        ranks.sort_unstable();
        ranks.dedup();

        let mut collisions = Vec::new();
        for (i, first) in glyphs.iter().enumerate() {
            let Some(first_bounds) = first.bounds else {
                continue;
            };
            for second in &glyphs[i + 1..] {
                let Some(second_bounds) = second.bounds else {
                    continue;
                };
                if !self.should_check(first, second, &ranks) {
                    continue;
                }
                let Some(overlap) = first_bounds.intersection(&second_bounds) else {
                    continue;
                };
                if self.settings.area > 0.0 {
                    let smaller = first_bounds.area().min(second_bounds.area());
                    if smaller <= 0.0 || overlap.area() / smaller * 100.0 < self.settings.area {
                        continue;
                    }
                }
                if outlines_overlap(first, second) {
                    trace!(first = %first.name, second = %second.name, "Collision");
                    collisions.push(Collision {
                        glyph1: first.name.clone(),
                        glyph2: second.name.clone(),
                        index1: first.index,
                        index2: second.index,
                        overlap,
                    });
                }
            }
        }
        collisions
    }
}

/// Draw the run with colliding glyphs highlighted and overlaps marked, as a
/// single-line SVG document.
#[must_use]
pub fn draw_overlaps(glyphs: &[PositionedGlyph], collisions: &[Collision]) -> String {
    let colliding = |index: usize| {
        collisions
            .iter()
            .any(|c| c.index1 == index || c.index2 == index)
    };

    let bounds = glyphs
        .iter()
        .filter_map(|g| g.bounds)
        .reduce(|a, b| Rect {
            x_min: a.x_min.min(b.x_min),
            y_min: a.y_min.min(b.y_min),
            x_max: a.x_max.max(b.x_max),
            y_max: a.y_max.max(b.y_max),
        })
        .unwrap_or(Rect {
            x_min: 0.0,
            y_min: 0.0,
            x_max: 0.0,
            y_max: 0.0,
        });

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{} {} {} {}\" \
         transform=\"matrix(1 0 0 -1 0 0)\">",
        bounds.x_min,
        bounds.y_min,
        bounds.x_max - bounds.x_min,
        bounds.y_max - bounds.y_min
    );
    for glyph in glyphs.iter().filter(|g| !g.path.is_empty()) {
        let fill = if colliding(glyph.index) {
            "rgb(0,0,0)"
        } else {
            "rgb(170,170,170)"
        };
        let _ = write!(
            svg,
            "<path transform=\"translate({},{})\" d=\"{}\" fill=\"{fill}\"/>",
            glyph.origin.x, glyph.origin.y, glyph.path
        );
    }
    for collision in collisions {
        let o = collision.overlap;
        let _ = write!(
            svg,
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"rgb(255,0,0,50%)\"/>",
            o.x_min,
            o.y_min,
            o.x_max - o.x_min,
            o.y_max - o.y_min
        );
    }
    svg.push_str("</svg>");
    svg
}
