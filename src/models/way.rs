//! Way records held by the topology store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::area::AreaId;
use super::coordinate::Coordinate;

/// Stable handle of a way inside the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WayId(pub usize);

impl fmt::Display for WayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned bounding box in fixed-point units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bbox {
    pub min_lon: i64,
    pub min_lat: i64,
    pub max_lon: i64,
    pub max_lat: i64,
}

impl Bbox {
    /// Bounding box of a non-empty line
    pub fn of_line(line: &[Coordinate]) -> Option<Self> {
        let first = line.first()?;
        let mut bbox = Bbox {
            min_lon: first.lon,
            min_lat: first.lat,
            max_lon: first.lon,
            max_lat: first.lat,
        };
        for c in &line[1..] {
            bbox.min_lon = bbox.min_lon.min(c.lon);
            bbox.min_lat = bbox.min_lat.min(c.lat);
            bbox.max_lon = bbox.max_lon.max(c.lon);
            bbox.max_lat = bbox.max_lat.max(c.lat);
        }
        Some(bbox)
    }

    /// Inclusive overlap test, boxes touching at an edge overlap
    pub fn intersects(&self, other: &Bbox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    pub fn min_corner(&self) -> [i64; 2] {
        [self.min_lon, self.min_lat]
    }

    pub fn max_corner(&self) -> [i64; 2] {
        [self.max_lon, self.max_lat]
    }
}

/// A boundary segment that may be shared by several areas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Way {
    /// Ordered coordinates, at least two
    pub line: Vec<Coordinate>,
    pub bbox: Bbox,
    /// Areas referencing this way, filled in by the merger
    pub parents: BTreeSet<AreaId>,
    /// Excluded from splitting, matching and merging
    pub nomerge: bool,
    /// Tombstone left behind after a merge
    pub delete: bool,
    /// Already carries a boundary tag in the output
    pub tagged: bool,
}

impl Way {
    pub fn new(line: Vec<Coordinate>) -> Self {
        debug_assert!(line.len() >= 2, "way needs at least two points");
        let bbox = Bbox::of_line(&line).unwrap_or(Bbox {
            min_lon: 0,
            min_lat: 0,
            max_lon: 0,
            max_lat: 0,
        });
        Self {
            line,
            bbox,
            parents: BTreeSet::new(),
            nomerge: false,
            delete: false,
            tagged: false,
        }
    }

    pub fn first(&self) -> Coordinate {
        self.line[0]
    }

    pub fn last(&self) -> Coordinate {
        self.line[self.line.len() - 1]
    }

    pub fn is_closed(&self) -> bool {
        self.line.len() > 2 && self.first() == self.last()
    }

    /// Live ways take part in matching, merging and output
    pub fn is_live(&self) -> bool {
        !self.delete
    }

    /// Replace the geometry and refresh the derived bounding box
    pub fn set_line(&mut self, line: Vec<Coordinate>) {
        debug_assert!(line.len() >= 2, "way needs at least two points");
        if let Some(bbox) = Bbox::of_line(&line) {
            self.bbox = bbox;
        }
        self.line = line;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coordinate::line_from_degrees;

    #[test]
    fn test_bbox_of_line() {
        let way = Way::new(line_from_degrees(&[(1.0, 2.0), (-1.0, 5.0), (3.0, 0.0)]));
        assert_eq!(way.bbox.min_lon, -10_000_000);
        assert_eq!(way.bbox.max_lon, 30_000_000);
        assert_eq!(way.bbox.min_lat, 0);
        assert_eq!(way.bbox.max_lat, 50_000_000);
    }

    #[test]
    fn test_touching_boxes_intersect() {
        let a = Bbox::of_line(&line_from_degrees(&[(0.0, 0.0), (1.0, 1.0)])).unwrap();
        let b = Bbox::of_line(&line_from_degrees(&[(1.0, 0.0), (2.0, 1.0)])).unwrap();
        let c = Bbox::of_line(&line_from_degrees(&[(1.5, 0.0), (2.0, 1.0)])).unwrap();
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_closed() {
        let ring = Way::new(line_from_degrees(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]));
        let open = Way::new(line_from_degrees(&[(0.0, 0.0), (1.0, 0.0)]));
        assert!(ring.is_closed());
        assert!(!open.is_closed());
    }
}
