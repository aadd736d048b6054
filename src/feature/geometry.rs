//! Geometry Model
//!
//! The six coordinate-bearing GeoJSON geometry types, plus the numeric
//! helpers the canonical serializer depends on: deterministic coordinate
//! rounding, extents for surrogate sort keys, and the fixed circle-to-polygon
//! approximation used when a drawn circle has to become GeoJSON.

use serde::{Deserialize, Serialize};

/// Canonical coordinate precision in decimal degrees.
///
/// 1e-7 degrees is sub-centimeter at the equator; plenty for drawings, and
/// small enough that re-exports never drift.
pub const COORD_DECIMALS: u32 = 7;

/// Number of sides used to approximate a circle as a polygon.
pub const CIRCLE_SIDES: usize = 64;

/// A single coordinate: `[x, y]` or `[x, y, z]`.
///
/// Kept as a `Vec` so an optional third ordinate survives round-trips
/// verbatim.
pub type Position = Vec<f64>;

/// GeoJSON geometry.
///
/// Serializes to the standard `{"type": ..., "coordinates": ...}` shape.
/// `GeometryCollection` is deliberately unsupported; parsing one is a
/// `Parse` error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// The GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Bounding extent as `[min_x, min_y, max_x, max_y]`, or `None` for a
    /// geometry with no positions.
    pub fn extent(&self) -> Option<[f64; 4]> {
        let mut extent: Option<[f64; 4]> = None;
        self.for_each_position(&mut |position| {
            let (x, y) = match (position.first(), position.get(1)) {
                (Some(&x), Some(&y)) => (x, y),
                _ => return,
            };
            extent = Some(match extent {
                None => [x, y, x, y],
                Some([min_x, min_y, max_x, max_y]) => {
                    [min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y)]
                }
            });
        });
        extent
    }

    /// A copy with every coordinate rounded to [`COORD_DECIMALS`] digits,
    /// half away from zero.
    pub fn rounded(&self) -> Geometry {
        let mut out = self.clone();
        out.for_each_position_mut(&mut |position| {
            for value in position.iter_mut() {
                *value = round_coord(*value);
            }
        });
        out
    }

    /// Shift every position by `(dx, dy)`. A third ordinate is untouched.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.for_each_position_mut(&mut |position| {
            if let Some(x) = position.first_mut() {
                *x += dx;
            }
            if let Some(y) = position.get_mut(1) {
                *y += dy;
            }
        });
    }

    fn for_each_position(&self, f: &mut impl FnMut(&Position)) {
        match self {
            Geometry::Point(p) => f(p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().for_each(f),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().for_each(f)
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().for_each(f),
        }
    }

    fn for_each_position_mut(&mut self, f: &mut impl FnMut(&mut Position)) {
        match self {
            Geometry::Point(p) => f(p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter_mut().for_each(f),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter_mut().flatten().for_each(f)
            }
            Geometry::MultiPolygon(polys) => {
                polys.iter_mut().flatten().flatten().for_each(f)
            }
        }
    }
}

/// Round one coordinate to [`COORD_DECIMALS`] digits, half away from zero.
///
/// Non-finite values pass through untouched; the serializer never produces
/// them and imported JSON cannot contain them.
pub fn round_coord(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(COORD_DECIMALS as i32);
    let rounded = (value * factor).round() / factor;
    // Fold negative zero, or "-0.0" and "0.0" would serialize differently.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Approximate a circle as a closed polygon ring with `sides` vertices.
///
/// The ring starts at angle 0 (due east of the center) and walks
/// counter-clockwise, closing on the first vertex, so the same circle always
/// yields the same ring.
pub fn circle_to_polygon(center: [f64; 2], radius: f64, sides: usize) -> Geometry {
    let sides = sides.max(3);
    let mut ring = Vec::with_capacity(sides + 1);
    for i in 0..sides {
        let angle = (i as f64 / sides as f64) * std::f64::consts::TAU;
        ring.push(vec![
            center[0] + angle.cos() * radius,
            center[1] + angle.sin() * radius,
        ]);
    }
    let first = ring[0].clone();
    ring.push(first);
    Geometry::Polygon(vec![ring])
}
