//! Pure geometry on logical map coordinates.
//!
//! Nothing here holds state. Aggregates (extent, centroid) count every
//! coordinate they are given, zero included; emptiness is decided by length,
//! never by the value of a coordinate.

use serde::{Deserialize, Serialize};

/// Minimum number of vertices for a polygon to be closed and committed.
pub const MIN_CLOSED_VERTICES: usize = 3;

/// Tolerance below which a segment is treated as a single point.
const DEGENERATE_SEGMENT_SQ: f64 = 1e-12;

/// A point in logical (untransformed) map space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

/// Minimum and maximum of a flat run of scalar coordinates.
///
/// Empty input yields `(+inf, -inf)`: "no extent". Check with
/// [`extent_is_defined`] before using the pair as a range.
pub fn bounding_extent<I>(values: I) -> (f64, f64)
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            (min.min(v), max.max(v))
        })
}

/// Whether an extent returned by [`bounding_extent`] describes a real range.
pub fn extent_is_defined(extent: (f64, f64)) -> bool {
    extent.0 <= extent.1
}

/// Arithmetic mean of the x and y coordinates, `None` for an empty slice.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }

    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));

    #[allow(clippy::cast_precision_loss)]
    let count = points.len() as f64;
    Some(Point::new(sum_x / count, sum_y / count))
}

/// True iff there are enough vertices to close the contour.
///
/// Only the vertex count is checked. Coincident endpoints and
/// self-intersecting contours are accepted.
pub fn is_closable(points: &[Point]) -> bool {
    points.len() >= MIN_CLOSED_VERTICES
}

/// Axis-aligned bounds of a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Grow the box by `margin` on every side.
    pub fn inflate(&self, margin: f64) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }
}

/// Bounding box of `points`, `None` when there are no points.
pub fn bounding_box(points: &[Point]) -> Option<BoundingBox> {
    let (min_x, max_x) = bounding_extent(points.iter().map(|p| p.x));
    let (min_y, max_y) = bounding_extent(points.iter().map(|p| p.y));

    if !extent_is_defined((min_x, max_x)) || !extent_is_defined((min_y, max_y)) {
        return None;
    }

    Some(BoundingBox {
        min: Point::new(min_x, min_y),
        max: Point::new(max_x, max_y),
    })
}

/// Shoelace area; positive for counter-clockwise winding in a y-up frame.
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < MIN_CLOSED_VERTICES {
        return 0.0;
    }

    let twice_area: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice_area / 2.0
}

/// Unsigned enclosed area.
pub fn area(points: &[Point]) -> f64 {
    signed_area(points).abs()
}

/// Even-odd containment test against the closed contour of `points`.
pub fn point_in_polygon(point: Point, points: &[Point]) -> bool {
    if points.len() < MIN_CLOSED_VERTICES {
        return false;
    }

    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (pi, pj) = (points[i], points[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Distance from a point to the segment `a`–`b`.
pub fn point_to_segment_distance(point: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq < DEGENERATE_SEGMENT_SQ {
        return point.distance(a);
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    point.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Distance from a point to the nearest edge of the closed contour.
pub fn distance_to_contour(point: Point, points: &[Point]) -> Option<f64> {
    match points {
        [] => None,
        [only] => Some(point.distance(*only)),
        _ => points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| point_to_segment_distance(point, *a, *b))
            .reduce(f64::min),
    }
}
