//! Splits incoming rings into ways shared with earlier rings.
//!
//! A ring is compared against every way it touches. Wherever the two
//! boundaries part company the coordinate becomes a junction; both the ways and
//! the ring are cut at the junctions, and ring segments that retrace an
//! existing way fragment reuse it instead of creating a duplicate.

use hashbrown::{HashMap, HashSet};
use tracing::debug;

use super::Topology;
use crate::models::{AreaId, Bbox, Coordinate, Member, Role, Way, WayId};

type Edge = (Coordinate, Coordinate);

fn edge(a: Coordinate, b: Coordinate) -> Edge {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn is_closed(line: &[Coordinate]) -> bool {
    line.len() > 2 && line[0] == line[line.len() - 1]
}

/// Coordinate and edge sets of a boundary, used for all matching decisions
struct Shape {
    coords: HashSet<Coordinate>,
    edges: HashSet<Edge>,
    neighbours: HashMap<Coordinate, Vec<Coordinate>>,
}

impl Shape {
    fn of(line: &[Coordinate]) -> Self {
        let mut coords = HashSet::with_capacity(line.len());
        let mut edges = HashSet::with_capacity(line.len());
        let mut neighbours: HashMap<Coordinate, Vec<Coordinate>> = HashMap::new();

        coords.extend(line.iter().copied());
        for w in line.windows(2) {
            if w[0] == w[1] {
                continue;
            }
            edges.insert(edge(w[0], w[1]));
            neighbours.entry(w[0]).or_default().push(w[1]);
            neighbours.entry(w[1]).or_default().push(w[0]);
        }

        Self {
            coords,
            edges,
            neighbours,
        }
    }

    fn contains(&self, c: &Coordinate) -> bool {
        self.coords.contains(c)
    }

    /// Same coordinates joined by the same edges, direction ignored
    fn same_boundary(&self, other: &Shape) -> bool {
        self.coords == other.coords && self.edges == other.edges
    }

    /// Shared coordinates where one boundary has an edge the other lacks
    fn divergence_points(&self, other: &Shape) -> Vec<Coordinate> {
        let diverges = |from: &Shape, to: &Shape, c: &Coordinate| {
            from.neighbours
                .get(c)
                .map(|ns| ns.iter().any(|n| !to.edges.contains(&edge(*c, *n))))
                .unwrap_or(false)
        };

        self.coords
            .iter()
            .filter(|c| other.contains(c))
            .filter(|c| diverges(self, other, c) || diverges(other, self, c))
            .copied()
            .collect()
    }
}

/// Coordinates visited more than once by a ring, ignoring the closing point
fn repeated_coordinates(ring: &[Coordinate]) -> Vec<Coordinate> {
    let body = if is_closed(ring) {
        &ring[..ring.len() - 1]
    } else {
        ring
    };
    let mut seen = HashSet::with_capacity(body.len());
    body.iter().filter(|c| !seen.insert(**c)).copied().collect()
}

/// Restart a closed line at its first interior junction.
///
/// Returns `None` when no vertex other than the start is a junction.
fn rotate_to_junction(line: &[Coordinate], junctions: &HashSet<Coordinate>) -> Option<Vec<Coordinate>> {
    debug_assert!(is_closed(line));
    let body = &line[..line.len() - 1];
    let k = (1..body.len()).find(|&i| junctions.contains(&body[i]))?;

    let mut rotated = Vec::with_capacity(line.len());
    rotated.extend_from_slice(&body[k..]);
    rotated.extend_from_slice(&body[..k]);
    rotated.push(body[k]);
    Some(rotated)
}

/// Cut a line at every interior vertex that is a junction
fn split_line(line: &[Coordinate], junctions: &HashSet<Coordinate>) -> Vec<Vec<Coordinate>> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for i in 1..line.len().saturating_sub(1) {
        if junctions.contains(&line[i]) {
            pieces.push(line[start..=i].to_vec());
            start = i;
        }
    }
    pieces.push(line[start..].to_vec());
    pieces
}

impl Topology {
    /// Register one ring of an area, sharing boundaries with existing ways.
    ///
    /// The ring needs at least three distinct points; callers filter
    /// degenerate rings beforehand.
    pub fn decompose(&mut self, area: AreaId, ring: &[Coordinate], role: Role) {
        debug_assert!(ring.len() >= 2, "ring needs at least two points");
        if ring.len() < 2 {
            return;
        }

        if self.areas[area.0].nomerge {
            let mut way = Way::new(ring.to_vec());
            way.nomerge = true;
            let id = self.push_way(way);
            self.add_member(area, Member::new(id, role));
            debug!("No-merge ring of {} registered verbatim as {}", self.areas[area.0].reference, id);
            return;
        }

        let ring_shape = Shape::of(ring);
        let near = self.near_ways(ring, &ring_shape);

        // Exact reuse of a way already covering the whole ring
        if is_closed(ring) {
            for &id in &near {
                let way = &self.ways[id.0];
                if way.is_closed() && Shape::of(&way.line).same_boundary(&ring_shape) {
                    self.add_member(area, Member::new(id, role));
                    debug!("Ring reuses existing way {}", id);
                    return;
                }
            }
        }

        let mut junctions: HashSet<Coordinate> = repeated_coordinates(ring).into_iter().collect();
        for &id in &near {
            let way = &self.ways[id.0];
            let way_shape = Shape::of(&way.line);
            junctions.extend(ring_shape.divergence_points(&way_shape));
            for end in [way.first(), way.last()] {
                if ring_shape.contains(&end) {
                    junctions.insert(end);
                }
            }
        }

        // A closed ring starts at a junction so its wrap-around run stays whole;
        // otherwise its own ends are forced junctions
        let rotated = if is_closed(ring) && !junctions.contains(&ring[0]) {
            rotate_to_junction(ring, &junctions)
        } else {
            None
        };
        let ring_line = match rotated {
            Some(line) => line,
            None => {
                junctions.insert(ring[0]);
                junctions.insert(ring[ring.len() - 1]);
                ring.to_vec()
            }
        };

        let mut candidates: Vec<(WayId, Shape)> = Vec::new();
        for &id in &near {
            for fragment in self.split_way(id, &junctions) {
                let line = &self.ways[fragment.0].line;
                if line.iter().all(|c| ring_shape.contains(c)) {
                    candidates.push((fragment, Shape::of(line)));
                }
            }
        }

        let mut reused = 0;
        let mut created = 0;
        for segment in split_line(&ring_line, &junctions) {
            if segment.len() == 2 && segment[0] == segment[1] {
                continue;
            }
            let segment_shape = Shape::of(&segment);
            let found = candidates
                .iter()
                .position(|(_, shape)| shape.same_boundary(&segment_shape));
            let id = match found {
                Some(pos) => {
                    reused += 1;
                    candidates.remove(pos).0
                }
                None => {
                    created += 1;
                    self.push_way(Way::new(segment))
                }
            };
            self.add_member(area, Member::new(id, role));
        }

        debug!(
            "{} ring of {}: {} near ways, {} junctions, {} segments reused, {} created",
            role,
            self.areas[area.0].reference,
            near.len(),
            junctions.len(),
            reused,
            created
        );
    }

    /// Live, matchable ways sharing at least one coordinate with the ring
    fn near_ways(&self, ring: &[Coordinate], ring_shape: &Shape) -> Vec<WayId> {
        let Some(bbox) = Bbox::of_line(ring) else {
            return Vec::new();
        };
        self.spatial
            .intersecting(&bbox)
            .into_iter()
            .filter(|id| {
                let way = &self.ways[id.0];
                way.is_live() && !way.nomerge && way.line.iter().any(|c| ring_shape.contains(c))
            })
            .collect()
    }

    /// Split a way at the junctions it passes through.
    ///
    /// The first fragment keeps the handle, the others are appended. Members
    /// referring to the way are replaced by all fragments in way order.
    fn split_way(&mut self, id: WayId, junctions: &HashSet<Coordinate>) -> Vec<WayId> {
        let line = &self.ways[id.0].line;
        let rotated = if is_closed(line) && !junctions.contains(&line[0]) {
            rotate_to_junction(line, junctions)
        } else {
            None
        };
        let line = rotated.as_deref().unwrap_or(line);

        let mut pieces = split_line(line, junctions).into_iter();
        let Some(first) = pieces.next() else {
            return vec![id];
        };
        let rest: Vec<Vec<Coordinate>> = pieces.collect();
        if rest.is_empty() {
            if rotated.is_some() {
                self.replace_line(id, first);
            }
            return vec![id];
        }

        self.replace_line(id, first);
        let mut fragments = vec![id];
        for piece in rest {
            fragments.push(self.push_way(Way::new(piece)));
        }
        self.splice_members(id, &fragments);
        debug!("Split way {} into {} fragments", id, fragments.len());
        fragments
    }
}
