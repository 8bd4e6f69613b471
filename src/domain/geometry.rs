//! Geometry exchange format and the few measurements the network model needs.
//!
//! Assets keep their geometry as `geo` types. `GeoJson` is the wire shape used by
//! the source dataset and by map clients.

use std::f64::consts::FRAC_PI_4;

use geo::{Coord, EuclideanLength, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fraction of the measured length added to a primary line for cable slack.
pub const LINE_SLACK_RATIO: f64 = 0.10;

/// Fixed length recorded for every line bushing, in meters.
pub const LINE_BUSHING_LENGTH_M: f64 = 1.5;

/// WGS84 semi-major axis used by the web mercator projection (EPSG:3857).
const EARTH_RADIUS_M: f64 = 6_378_137.0;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("expected {expected} geometry, got {actual}")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("line string needs at least two coordinates, got {0}")]
    TooFewCoordinates(usize),
    #[error("polygon exterior ring needs at least three coordinates")]
    DegenerateRing,
    #[error("coordinate ({0}, {1}) is not finite")]
    NonFinite(f64, f64),
}

/// GeoJSON geometry object (`{"type": "Point", "coordinates": [x, y]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeoJson {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl GeoJson {
    pub fn kind(&self) -> &'static str {
        match self {
            GeoJson::Point(_) => "Point",
            GeoJson::LineString(_) => "LineString",
            GeoJson::Polygon(_) => "Polygon",
        }
    }

    pub fn to_point(&self) -> Result<Point<f64>, GeometryError> {
        match self {
            GeoJson::Point(xy) => Ok(Point::from(coord(*xy)?)),
            other => Err(GeometryError::WrongType {
                expected: "Point",
                actual: other.kind(),
            }),
        }
    }

    pub fn to_line_string(&self) -> Result<LineString<f64>, GeometryError> {
        match self {
            GeoJson::LineString(coords) => {
                if coords.len() < 2 {
                    return Err(GeometryError::TooFewCoordinates(coords.len()));
                }
                ring(coords)
            }
            other => Err(GeometryError::WrongType {
                expected: "LineString",
                actual: other.kind(),
            }),
        }
    }

    pub fn to_polygon(&self) -> Result<Polygon<f64>, GeometryError> {
        match self {
            GeoJson::Polygon(rings) => {
                let (exterior, interiors) = rings.split_first().ok_or(GeometryError::DegenerateRing)?;
                if exterior.len() < 3 {
                    return Err(GeometryError::DegenerateRing);
                }
                let interiors = interiors
                    .iter()
                    .map(|r| ring(r))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Polygon::new(ring(exterior)?, interiors))
            }
            other => Err(GeometryError::WrongType {
                expected: "Polygon",
                actual: other.kind(),
            }),
        }
    }
}

fn coord([x, y]: [f64; 2]) -> Result<Coord<f64>, GeometryError> {
    if x.is_finite() && y.is_finite() {
        Ok(Coord { x, y })
    } else {
        Err(GeometryError::NonFinite(x, y))
    }
}

fn ring(coords: &[[f64; 2]]) -> Result<LineString<f64>, GeometryError> {
    coords
        .iter()
        .map(|xy| coord(*xy))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn xy(c: &Coord<f64>) -> [f64; 2] {
    [c.x, c.y]
}

impl From<&Point<f64>> for GeoJson {
    fn from(p: &Point<f64>) -> Self {
        GeoJson::Point([p.x(), p.y()])
    }
}

impl From<&LineString<f64>> for GeoJson {
    fn from(line: &LineString<f64>) -> Self {
        GeoJson::LineString(line.coords().map(xy).collect())
    }
}

impl From<&Polygon<f64>> for GeoJson {
    fn from(poly: &Polygon<f64>) -> Self {
        let rings = std::iter::once(poly.exterior())
            .chain(poly.interiors())
            .map(|r| r.coords().map(xy).collect())
            .collect();
        GeoJson::Polygon(rings)
    }
}

pub fn start_point(line: &LineString<f64>) -> Option<Point<f64>> {
    line.0.first().copied().map(Point::from)
}

pub fn end_point(line: &LineString<f64>) -> Option<Point<f64>> {
    line.0.last().copied().map(Point::from)
}

/// How line lengths are measured before slack is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthMetric {
    /// Euclidean length in the coordinate units of the dataset.
    #[default]
    Planar,
    /// Lon/lat degrees projected to web mercator meters first.
    WebMercator,
}

impl LengthMetric {
    pub fn measure(&self, line: &LineString<f64>) -> f64 {
        match self {
            LengthMetric::Planar => line.euclidean_length(),
            LengthMetric::WebMercator => line
                .coords()
                .map(|c| to_web_mercator(*c))
                .collect::<LineString<f64>>()
                .euclidean_length(),
        }
    }

    /// Measured length plus cable slack.
    pub fn line_length(&self, line: &LineString<f64>) -> f64 {
        with_slack(self.measure(line))
    }
}

pub fn with_slack(measured: f64) -> f64 {
    measured + measured * LINE_SLACK_RATIO
}

fn to_web_mercator(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: EARTH_RADIUS_M * c.x.to_radians(),
        y: EARTH_RADIUS_M * (FRAC_PI_4 + c.y.to_radians() / 2.0).tan().ln(),
    }
}
