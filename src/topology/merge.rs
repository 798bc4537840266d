//! Merges chains of ways that decomposition left split for no reason.
//!
//! Two ways meeting end to end are joined when nothing else ends at the shared
//! coordinate and both belong to exactly the same areas in the same roles.

use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use super::Topology;
use crate::models::{AreaId, Coordinate, Role, WayId};

/// Result of a merge pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Ways absorbed into a neighbour
    pub merged: usize,
    /// Live ways left afterwards
    pub remaining: usize,
}

type Memberships = Vec<BTreeSet<(AreaId, Role)>>;

impl Topology {
    /// Join non-branching chains of ways with identical ownership.
    ///
    /// One pass is enough: a coordinate passed over keeps its incident ways
    /// and their owners for the rest of the pass.
    pub fn merge(&mut self) -> MergeStats {
        info!("Merging ways with shared ownership...");

        self.refresh_parents();
        let memberships = self.memberships();
        let endpoints = self.endpoint_index();

        // Tombstoned handles forward to the way that absorbed them
        let mut forward: Vec<usize> = (0..self.ways.len()).collect();
        let mut merged = 0;

        for (coord, incident) in &endpoints {
            if incident.len() != 2 {
                continue;
            }
            let a = resolve(&mut forward, incident[0].0);
            let b = resolve(&mut forward, incident[1].0);
            if a == b {
                continue;
            }
            if memberships[a] != memberships[b] || self.ways[a].parents != self.ways[b].parents {
                continue;
            }
            let (survivor, absorbed) = (a.min(b), a.max(b));
            if self.join(WayId(survivor), WayId(absorbed), *coord) {
                forward[absorbed] = survivor;
                merged += 1;
            }
        }

        let dropped = self.remove_dead_members();
        let stats = MergeStats {
            merged,
            remaining: self.live_way_count(),
        };
        info!(
            "Merged {} ways ({} members dropped), {} ways remain",
            stats.merged, dropped, stats.remaining
        );
        stats
    }

    /// Coordinates where a further merge would still be possible.
    ///
    /// Empty after [`Topology::merge`].
    pub fn pending_merges(&mut self) -> Vec<Coordinate> {
        self.refresh_parents();
        let memberships = self.memberships();
        self.endpoint_index()
            .into_iter()
            .filter(|(_, incident)| {
                incident.len() == 2
                    && incident[0] != incident[1]
                    && memberships[incident[0].0] == memberships[incident[1].0]
                    && self.ways[incident[0].0].parents == self.ways[incident[1].0].parents
            })
            .map(|(coord, _)| coord)
            .collect()
    }

    /// (area, role) pairs referencing each way
    fn memberships(&self) -> Memberships {
        let mut memberships = vec![BTreeSet::new(); self.ways.len()];
        for (i, area) in self.areas.iter().enumerate() {
            for member in &area.members {
                memberships[member.way.0].insert((AreaId(i), member.role));
            }
        }
        memberships
    }

    /// Both endpoints of every live, matchable way; closed ways appear twice
    /// under their single endpoint
    fn endpoint_index(&self) -> BTreeMap<Coordinate, Vec<WayId>> {
        let mut index: BTreeMap<Coordinate, Vec<WayId>> = BTreeMap::new();
        for (id, way) in self.live_ways() {
            if way.nomerge {
                continue;
            }
            index.entry(way.first()).or_default().push(id);
            index.entry(way.last()).or_default().push(id);
        }
        index
    }

    /// Concatenate `absorbed` onto `survivor` at `at`, tombstoning `absorbed`
    fn join(&mut self, survivor: WayId, absorbed: WayId, at: Coordinate) -> bool {
        let a = &self.ways[survivor.0].line;
        let b = &self.ways[absorbed.0].line;
        let a_ends = (a[0] == at, a[a.len() - 1] == at);
        let b_ends = (b[0] == at, b[b.len() - 1] == at);
        if !(a_ends.0 || a_ends.1) || !(b_ends.0 || b_ends.1) {
            return false;
        }

        // Keep the original direction of both ways where possible
        let (head, tail): (Vec<Coordinate>, Vec<Coordinate>) = if a_ends.1 {
            (a.clone(), b.clone())
        } else if b_ends.1 {
            (b.clone(), a.clone())
        } else {
            (a.iter().rev().copied().collect(), b.clone())
        };

        let mut line = head;
        if tail[0] == at {
            line.extend_from_slice(&tail[1..]);
        } else {
            line.extend(tail.iter().rev().skip(1));
        }

        self.tombstone(absorbed);
        self.replace_line(survivor, line);
        true
    }
}

fn resolve(forward: &mut [usize], mut id: usize) -> usize {
    let mut root = id;
    while forward[root] != root {
        root = forward[root];
    }
    while forward[id] != root {
        let next = forward[id];
        forward[id] = root;
        id = next;
    }
    root
}
