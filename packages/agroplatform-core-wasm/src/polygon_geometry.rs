use geo::{Area, Centroid, ChamberlainDuquetteArea};
use geo_types::{Coord, LineString, Polygon};
use serde::Serialize;

use crate::error::GeometryError;
use crate::models::{ParcelGeometryResult, Vertex};

// Square meters per hectare
const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;
// Decimal places kept on the submitted area
const AREA_DECIMALS: i32 = 4;
// Vertices needed before a ring encloses an area
pub const MIN_POLYGON_VERTICES: usize = 3;

// GeoJSON Polygon as stored by the backend
#[derive(Serialize)]
struct PolygonGeoJson<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    coordinates: Vec<Vec<[f64; 2]>>,
}

/// Map a tapped vertex to a GeoJSON position.
///
/// Vertices are stored as (latitude, longitude) but every GeoJSON position is
/// (longitude, latitude). This is the only place the axis order flips.
pub fn to_lon_lat(vertex: &Vertex) -> [f64; 2] {
    [vertex.longitude, vertex.latitude]
}

/// Close the ring by repeating the first position at the end.
/// The input sequence is left untouched; the live vertex list stays open.
pub fn closed_ring(vertices: &[Vertex]) -> Vec<[f64; 2]> {
    let mut ring: Vec<[f64; 2]> = vertices.iter().map(to_lon_lat).collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

fn ring_polygon(vertices: &[Vertex]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = closed_ring(vertices)
        .into_iter()
        .map(|[x, y]| Coord { x, y })
        .collect();
    Polygon::new(LineString::new(coords), vec![])
}

/// Area enclosed by the vertices in hectares; 0 when fewer than 3 vertices.
///
/// Uses the spherical Chamberlain-Duquette area on the WGS84 equatorial
/// radius, so the magnitude does not depend on winding direction.
pub fn area_hectares(vertices: &[Vertex]) -> f64 {
    if vertices.len() < MIN_POLYGON_VERTICES {
        return 0.0;
    }
    ring_polygon(vertices).chamberlain_duquette_unsigned_area() / SQUARE_METERS_PER_HECTARE
}

// Center of mass of the enclosed polygon, returned in vertex axis order
pub fn center_of_mass(vertices: &[Vertex]) -> Result<Vertex, GeometryError> {
    if vertices.len() < MIN_POLYGON_VERTICES {
        return Err(GeometryError::TooFewVertices(vertices.len()));
    }
    let polygon = ring_polygon(vertices);
    if polygon.unsigned_area() == 0.0 {
        return Ok(vertex_mean(vertices));
    }
    let center = polygon.centroid().ok_or(GeometryError::NoCentroid)?;
    Ok(Vertex::new(center.y(), center.x()))
}

// Collinear or repeated taps enclose nothing; use the plain vertex average
fn vertex_mean(vertices: &[Vertex]) -> Vertex {
    let n = vertices.len() as f64;
    let (lat, lon) = vertices
        .iter()
        .fold((0.0, 0.0), |(lat, lon), v| (lat + v.latitude, lon + v.longitude));
    Vertex::new(lat / n, lon / n)
}

fn round_area(area: f64) -> f64 {
    let factor = 10f64.powi(AREA_DECIMALS);
    (area * factor).round() / factor
}

/// Turn a finished drawing into the geometry handed to the attribute form.
///
/// `area` is the live area already derived by the capture controller.
pub fn finalize(vertices: &[Vertex], area: f64) -> Result<ParcelGeometryResult, GeometryError> {
    if vertices.len() < MIN_POLYGON_VERTICES {
        return Err(GeometryError::TooFewVertices(vertices.len()));
    }

    let geojson = PolygonGeoJson {
        kind: "Polygon",
        coordinates: vec![closed_ring(vertices)],
    };
    let geometry =
        serde_json::to_string(&geojson).map_err(|e| GeometryError::Serialize(e.to_string()))?;

    let center = center_of_mass(vertices)?;
    let location = format!("{},{}", center.latitude, center.longitude);

    log::debug!(
        "Finalized parcel polygon with {} vertices, {:.4} ha at {}",
        vertices.len(),
        area,
        location
    );

    Ok(ParcelGeometryResult {
        geometry,
        area: round_area(area),
        location,
    })
}
