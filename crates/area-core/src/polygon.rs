//! Polygon area model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{self, BoundingBox, Point};

/// Stable polygon identity.
///
/// Local ids come from the owning store's counter and are never reused.
/// A successful save swaps the local id for the backend-assigned one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PolygonId {
    Local(u64),
    Saved(String),
}

impl PolygonId {
    pub fn is_saved(&self) -> bool {
        matches!(self, PolygonId::Saved(_))
    }
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolygonId::Local(id) => write!(f, "local-{id}"),
            PolygonId::Saved(id) => f.write_str(id),
        }
    }
}

/// Descriptive data attached to an area.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaMetadata {
    /// Display name.
    pub name: Option<String>,
    /// Linked company/cluster reference.
    pub entity_id: Option<String>,
    /// RGBA colour hint.
    pub color: Option<[u8; 4]>,
}

/// An ordered contour; point order defines the drawn outline and winding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub id: PolygonId,
    pub points: Vec<Point>,
    #[serde(default)]
    pub metadata: AreaMetadata,
}

impl Polygon {
    pub fn new(id: PolygonId, points: Vec<Point>, metadata: AreaMetadata) -> Self {
        Self {
            id,
            points,
            metadata,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closable(&self) -> bool {
        geometry::is_closable(&self.points)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        geometry::bounding_box(&self.points)
    }

    /// Whether `point` falls on the polygon's body: inside the contour, or
    /// within `edge_tolerance` of one of its edges.
    pub fn hit_test(&self, point: Point, edge_tolerance: f64) -> bool {
        let Some(bounds) = self.bounding_box() else {
            return false;
        };
        if !bounds.inflate(edge_tolerance).contains(point) {
            return false;
        }
        geometry::point_in_polygon(point, &self.points)
            || geometry::distance_to_contour(point, &self.points)
                .is_some_and(|d| d <= edge_tolerance)
    }

    /// Index of the vertex nearest to `point` within `radius`.
    pub fn vertex_at(&self, point: Point, radius: f64) -> Option<usize> {
        self.points
            .iter()
            .enumerate()
            .map(|(idx, v)| (idx, v.distance(point)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(idx, _)| idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::new(
            PolygonId::Local(1),
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
            AreaMetadata::default(),
        )
    }

    #[test]
    fn test_hit_test_body_and_edges() {
        let poly = square();
        assert!(poly.hit_test(Point::new(5.0, 5.0), 0.0));
        assert!(!poly.hit_test(Point::new(11.0, 5.0), 0.5));
        assert!(poly.hit_test(Point::new(10.4, 5.0), 0.5));
        assert!(!poly.hit_test(Point::new(50.0, 50.0), 0.5));
    }

    #[test]
    fn test_vertex_at_picks_nearest_within_radius() {
        let mut poly = square();
        poly.points.push(Point::new(10.5, 10.0));

        assert_eq!(poly.vertex_at(Point::new(10.4, 10.1), 1.0), Some(4));
        assert_eq!(poly.vertex_at(Point::new(0.2, 0.1), 1.0), Some(0));
        assert_eq!(poly.vertex_at(Point::new(5.0, 5.0), 1.0), None);
    }

    #[test]
    fn test_id_serialization() {
        let local = serde_json::to_string(&PolygonId::Local(7)).unwrap();
        assert_eq!(local, r#"{"kind":"local","value":7}"#);

        let saved: PolygonId =
            serde_json::from_str(r#"{"kind":"saved","value":"area-42"}"#).unwrap();
        assert_eq!(saved, PolygonId::Saved("area-42".to_string()));
        assert!(saved.is_saved());
        assert_eq!(saved.to_string(), "area-42");
    }
}
