//! Typed geometry decoded from the loosely shaped `coordinates` array.

use crate::descriptor::{Geometry, GeometryKind};
use crate::LOG_TARGET;
use serde_json::Value;
use std::fmt::Write as _;

/// `[x, y]`
pub type Position = [f64; 2];
/// A closed ring of positions
pub type Ring = Vec<Position>;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Position),
    MultiPoint(Vec<Position>),
    /// Exterior ring first, then interior rings
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Shape {
    /// Decodes the geometry's coordinates according to its type. Unsupported
    /// types and malformed coordinates yield `None`.
    pub fn from_geometry(geometry: &Geometry) -> Option<Self> {
        let coords = &geometry.coordinates;
        let shape = match geometry.kind {
            GeometryKind::Point => position(coords).map(Shape::Point),
            GeometryKind::MultiPoint => list(coords, position).map(Shape::MultiPoint),
            GeometryKind::Polygon => list(coords, ring).map(Shape::Polygon),
            GeometryKind::MultiPolygon => {
                list(coords, |polygon| list(polygon, ring)).map(Shape::MultiPolygon)
            }
            GeometryKind::Unsupported => None,
        };
        if shape.is_none() {
            tracing::warn!(
                target: LOG_TARGET,
                kind = ?geometry.kind,
                "geometry dropped from filter"
            );
        }
        shape
    }

    /// Well-known-text rendering, as used by CQL.
    pub fn to_wkt(&self) -> String {
        let mut wkt = String::new();
        match self {
            Shape::Point(p) => {
                let _ = write!(wkt, "POINT({})", join_position(p, " "));
            }
            Shape::MultiPoint(points) => {
                let body: Vec<_> = points.iter().map(|p| join_position(p, " ")).collect();
                let _ = write!(wkt, "MULTIPOINT({})", body.join(", "));
            }
            Shape::Polygon(rings) => {
                let _ = write!(wkt, "POLYGON({})", wkt_rings(rings));
            }
            Shape::MultiPolygon(polygons) => {
                let body: Vec<_> = polygons
                    .iter()
                    .map(|rings| format!("({})", wkt_rings(rings)))
                    .collect();
                let _ = write!(wkt, "MULTIPOLYGON({})", body.join(", "));
            }
        }
        wkt
    }
}

fn wkt_rings(rings: &[Ring]) -> String {
    rings
        .iter()
        .map(|ring| format!("({})", join_ring(ring, " ", ", ")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats one ordinate the way JSON numbers print: `10`, not `10.0`.
pub fn ordinate(value: f64) -> String {
    value.to_string()
}

pub fn join_position(position: &Position, separator: &str) -> String {
    format!("{}{}{}", ordinate(position[0]), separator, ordinate(position[1]))
}

/// Joins a ring: `inner` between x and y, `outer` between positions.
pub fn join_ring(ring: &[Position], inner: &str, outer: &str) -> String {
    ring.iter()
        .map(|p| join_position(p, inner))
        .collect::<Vec<_>>()
        .join(outer)
}

fn position(value: &Value) -> Option<Position> {
    match value.as_array()?.as_slice() {
        [x, y, ..] => Some([x.as_f64()?, y.as_f64()?]),
        _ => None,
    }
}

/// A closed linear ring needs at least four positions.
fn ring(value: &Value) -> Option<Ring> {
    list(value, position).filter(|ring| ring.len() >= 4)
}

/// A non-empty list whose items all decode.
fn list<T>(value: &Value, item: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    items.iter().map(item).collect()
}
