//! Fixed-point coordinates with exact equality.
//!
//! Boundary matching compares coordinates for equality, so floating point
//! input is quantized to integer units of 1e-7 degrees on ingestion. Two rings
//! supplied independently match exactly when they agree to seven decimals,
//! which is the precision the OSM API stores and the writer emits.

use geo::Coord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fixed-point units per degree.
pub const COORD_SCALE: f64 = 1e7;

/// A quantized (longitude, latitude) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in 1e-7 degrees
    pub lon: i64,
    /// Latitude in 1e-7 degrees
    pub lat: i64,
}

impl Coordinate {
    /// Quantize a coordinate given in degrees
    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        Self {
            lon: (lon * COORD_SCALE).round() as i64,
            lat: (lat * COORD_SCALE).round() as i64,
        }
    }

    pub fn lon_degrees(&self) -> f64 {
        self.lon as f64 / COORD_SCALE
    }

    pub fn lat_degrees(&self) -> f64 {
        self.lat as f64 / COORD_SCALE
    }
}

impl From<Coord<f64>> for Coordinate {
    fn from(c: Coord<f64>) -> Self {
        Coordinate::from_degrees(c.x, c.y)
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Coord {
            x: c.lon_degrees(),
            y: c.lat_degrees(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.7}, {:.7})", self.lon_degrees(), self.lat_degrees())
    }
}

/// Build a line from (lon, lat) pairs in degrees
pub fn line_from_degrees(points: &[(f64, f64)]) -> Vec<Coordinate> {
    points
        .iter()
        .map(|&(lon, lat)| Coordinate::from_degrees(lon, lat))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_round_trip() {
        let c = Coordinate::from_degrees(10.7522454, 59.9138688);
        assert_eq!(c.lon, 107_522_454);
        assert_eq!(c.lat, 599_138_688);
        assert!((c.lon_degrees() - 10.7522454).abs() < 1e-9);
    }

    #[test]
    fn test_equality_after_float_noise() {
        // 0.1 + 0.2 is not 0.3 in binary floating point
        let a = Coordinate::from_degrees(0.1 + 0.2, 60.0);
        let b = Coordinate::from_degrees(0.3, 60.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_coordinates() {
        let c = Coordinate::from_degrees(-8.0000001, -0.5);
        assert_eq!(c.lon, -80_000_001);
        assert_eq!(c.lat, -5_000_000);
    }
}
