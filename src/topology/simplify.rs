//! Ramer-Douglas-Peucker simplification of finished ways.
//!
//! Distances use a flat-earth approximation: longitude is scaled by the cosine
//! of latitude and planar distances are converted to meters with the mean
//! Earth radius. Good enough for the short spans between two vertices of a
//! boundary. Way endpoints are never moved, so shared junctions survive.

use tracing::info;

use super::Topology;
use crate::models::Coordinate;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Result of simplifying all ways
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyStats {
    pub ways_simplified: usize,
    pub points_removed: usize,
}

/// Distance in meters from `p` to the segment `a`-`b`.
///
/// Positions are taken relative to `a` in radians, with longitude scaled by
/// the cosine of the chord's mean latitude. A zero-length segment measures the
/// distance to `a`.
fn segment_distance(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    let mean_lat = ((a.lat_degrees() + b.lat_degrees()) / 2.0).to_radians();
    let scale = mean_lat.cos();
    let local = |c: &Coordinate| {
        (
            (c.lon_degrees() - a.lon_degrees()).to_radians() * scale,
            (c.lat_degrees() - a.lat_degrees()).to_radians(),
        )
    };

    let (dx, dy) = local(b);
    let (px, py) = local(p);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        ((px * dx + py * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    ((px - t * dx).powi(2) + (py - t * dy).powi(2)).sqrt() * EARTH_RADIUS_M
}

/// Simplify a line, dropping vertices closer than `epsilon` meters to the
/// chord they are collapsed onto.
///
/// Works on an explicit stack, so long ways cannot overflow the call stack.
pub fn simplify(line: &[Coordinate], epsilon: f64) -> Vec<Coordinate> {
    if line.len() < 3 {
        return line.to_vec();
    }

    let mut kept = vec![false; line.len()];
    kept[0] = true;
    kept[line.len() - 1] = true;

    let mut stack = vec![(0, line.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_dist = -1.0;
        let mut max_idx = start;
        for i in (start + 1)..end {
            let d = segment_distance(&line[i], &line[start], &line[end]);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }

        if max_dist >= epsilon {
            kept[max_idx] = true;
            stack.push((max_idx, end));
            stack.push((start, max_idx));
        }
    }

    line.iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(c, _)| *c)
        .collect()
}

impl Topology {
    /// Simplify every live way in place.
    ///
    /// Ways of three points or fewer are left alone. A result that would
    /// leave a closed way with fewer than four points, or an open way with
    /// fewer than three, is discarded and the original geometry kept.
    pub fn simplify_ways(&mut self, epsilon: f64) -> SimplifyStats {
        info!("Simplifying ways with epsilon {} m...", epsilon);

        let mut stats = SimplifyStats::default();
        let ids: Vec<_> = self.live_ways().map(|(id, _)| id).collect();

        for id in ids {
            let way = &self.ways[id.0];
            if way.line.len() <= 3 {
                continue;
            }
            let reduced = simplify(&way.line, epsilon);
            let min_points = if way.is_closed() { 4 } else { 3 };
            if reduced.len() < min_points || reduced.len() == way.line.len() {
                continue;
            }
            stats.ways_simplified += 1;
            stats.points_removed += way.line.len() - reduced.len();
            self.replace_line(id, reduced);
        }

        info!(
            "Simplified {} ways, removed {} points",
            stats.ways_simplified, stats.points_removed
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coordinate::line_from_degrees;
    use crate::models::Way;

    /// Distance from a coordinate to a polyline
    fn distance_to_line(c: &Coordinate, line: &[Coordinate]) -> f64 {
        line.windows(2)
            .map(|w| segment_distance(c, &w[0], &w[1]))
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_small_deviation_collapses() {
        let line = line_from_degrees(&[(0.0, 0.0), (0.5, 0.0001), (1.0, 0.0)]);
        assert_eq!(simplify(&line, 50.0), line_from_degrees(&[(0.0, 0.0), (1.0, 0.0)]));
    }

    #[test]
    fn test_large_deviation_kept() {
        // 0.001 degrees of latitude is about 111 m
        let line = line_from_degrees(&[(0.0, 0.0), (0.5, 0.001), (1.0, 0.0)]);
        assert_eq!(simplify(&line, 50.0), line);
    }

    #[test]
    fn test_longitude_scaled_by_latitude() {
        // At 60 degrees north a degree of longitude is half as long
        let line = line_from_degrees(&[(10.0, 60.0), (10.0002, 60.0005), (10.0, 60.001)]);
        let deviation = segment_distance(&line[1], &line[0], &line[2]);
        assert!((deviation - 11.12).abs() < 0.1, "deviation was {}", deviation);
    }

    #[test]
    fn test_zero_length_chord() {
        // Closed ring: every point measured against the single endpoint
        let ring = line_from_degrees(&[(0.0, 0.0), (0.001, 0.0), (0.001, 0.001), (0.0, 0.001), (0.0, 0.0)]);
        let reduced = simplify(&ring, 1.0);
        assert_eq!(reduced, ring);
    }

    #[test]
    fn test_within_epsilon_bound() {
        let line = line_from_degrees(&[
            (10.0, 60.0),
            (10.0001, 60.00002),
            (10.0002, 60.0),
            (10.0003, 60.00004),
            (10.0004, 60.0001),
            (10.0005, 60.00003),
            (10.0006, 60.0),
            (10.0007, 60.0005),
        ]);
        let epsilon = 5.0;
        let reduced = simplify(&line, epsilon);
        assert!(reduced.len() < line.len());
        assert_eq!(reduced.first(), line.first());
        assert_eq!(reduced.last(), line.last());
        for c in &line {
            assert!(distance_to_line(c, &reduced) < epsilon);
        }
    }

    #[test]
    fn test_zigzag_kept() {
        let points: Vec<(f64, f64)> = (0..2_000)
            .map(|i| (i as f64 * 1e-5, if i % 2 == 0 { 0.0 } else { 0.01 }))
            .collect();
        let line = line_from_degrees(&points);
        assert_eq!(simplify(&line, 1.0).len(), line.len());
    }

    #[test]
    fn test_ways_keep_minimum_size() {
        let mut topology = Topology::new();
        // Thin sliver ring that RDP would collapse to three points
        let sliver = line_from_degrees(&[
            (0.0, 0.0),
            (0.001, 0.0),
            (0.002, 0.0),
            (0.001, 0.000001),
            (0.0, 0.0),
        ]);
        let open = line_from_degrees(&[(0.0, 1.0), (0.001, 1.0), (0.002, 1.0), (0.003, 1.0)]);
        let tent = line_from_degrees(&[
            (0.0, 2.0),
            (0.001, 2.005),
            (0.002, 2.01),
            (0.003, 2.005),
            (0.004, 2.0),
        ]);
        let short = line_from_degrees(&[(0.0, 3.0), (0.001, 3.0000001), (0.002, 3.0)]);
        let ids: Vec<_> = [&sliver, &open, &tent, &short]
            .iter()
            .map(|l| topology.push_way(Way::new((*l).clone())))
            .collect();

        let stats = topology.simplify_ways(10.0);

        assert_eq!(topology.way(ids[0]).line, sliver);
        assert_eq!(topology.way(ids[1]).line, open);
        assert_eq!(
            topology.way(ids[2]).line,
            line_from_degrees(&[(0.0, 2.0), (0.002, 2.01), (0.004, 2.0)])
        );
        assert_eq!(topology.way(ids[3]).line, short);
        assert_eq!(stats, SimplifyStats { ways_simplified: 1, points_removed: 2 });
    }
}
