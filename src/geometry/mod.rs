// src/geometry/mod.rs
//! Entity geometry in a normalized lat/lng form

pub mod wkt;

use serde::{Deserialize, Serialize};

/// A geographic position. WKT input is `lng lat`; this is stored the other
/// way round, matching how map layers address positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Closed ring of positions; the first ring of a polygon is its outline,
/// any further rings are holes.
pub type Ring = Vec<LatLng>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(LatLng),
    MultiPoint(Vec<LatLng>),
    LineString(Vec<LatLng>),
    MultiLineString(Vec<Vec<LatLng>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Every position in the geometry, in input order
    pub fn positions(&self) -> Vec<LatLng> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::MultiPoint(points) | Geometry::LineString(points) => points.clone(),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().copied().collect()
            }
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().flatten().flatten().copied().collect()
            }
        }
    }

    /// Bounding box as `(south_west, north_east)`, `None` for an empty geometry.
    pub fn bounds(&self) -> Option<(LatLng, LatLng)> {
        let positions = self.positions();
        let first = positions.first()?;
        let mut sw = *first;
        let mut ne = *first;
        for p in &positions[1..] {
            sw.lat = sw.lat.min(p.lat);
            sw.lng = sw.lng.min(p.lng);
            ne.lat = ne.lat.max(p.lat);
            ne.lng = ne.lng.max(p.lng);
        }
        Some((sw, ne))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let polygon = Geometry::Polygon(vec![vec![
            LatLng::new(1.0, 2.0),
            LatLng::new(3.0, -1.0),
            LatLng::new(-2.0, 4.0),
            LatLng::new(1.0, 2.0),
        ]]);
        let (sw, ne) = polygon.bounds().unwrap();
        assert_eq!(sw, LatLng::new(-2.0, -1.0));
        assert_eq!(ne, LatLng::new(3.0, 4.0));

        assert!(Geometry::MultiPoint(vec![]).bounds().is_none());
    }

    #[test]
    fn test_serialize_tagged() {
        let point = Geometry::Point(LatLng::new(54.98, 82.89));
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"]["lat"], 54.98);
    }
}
