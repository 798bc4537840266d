//! Shared-boundary topology.
//!
//! `Topology` owns every way and area discovered so far. Rings are fed to
//! [`Topology::decompose`] one at a time; afterwards [`Topology::merge`] and
//! [`Topology::simplify_ways`] each run once over the finished store.

mod decompose;
mod index;
mod merge;
mod simplify;

pub use index::WaySpatialIndex;
pub use merge::MergeStats;
pub use simplify::{simplify, SimplifyStats, EARTH_RADIUS_M};

use hashbrown::HashMap;

use crate::models::{Area, AreaId, Coordinate, Member, Way, WayId};

/// Way store and area registry used by the whole conversion pass
#[derive(Default)]
pub struct Topology {
    ways: Vec<Way>,
    areas: Vec<Area>,
    area_index: HashMap<String, AreaId>,
    /// Bounding boxes of live, matchable ways
    spatial: WaySpatialIndex,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// All ways ever created, tombstones included
    pub fn ways(&self) -> &[Way] {
        &self.ways
    }

    pub fn way(&self, id: WayId) -> &Way {
        &self.ways[id.0]
    }

    pub fn way_mut(&mut self, id: WayId) -> &mut Way {
        &mut self.ways[id.0]
    }

    /// Ways that survived merging
    pub fn live_ways(&self) -> impl Iterator<Item = (WayId, &Way)> {
        self.ways
            .iter()
            .enumerate()
            .filter(|(_, w)| w.is_live())
            .map(|(i, w)| (WayId(i), w))
    }

    pub fn live_way_count(&self) -> usize {
        self.ways.iter().filter(|w| w.is_live()).count()
    }

    /// Areas in first-sighting order
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn area(&self, id: AreaId) -> &Area {
        &self.areas[id.0]
    }

    pub fn area_mut(&mut self, id: AreaId) -> &mut Area {
        &mut self.areas[id.0]
    }

    pub fn find_area(&self, reference: &str) -> Option<AreaId> {
        self.area_index.get(reference).copied()
    }

    /// Look up an area by reference, registering it on first sighting
    pub fn ensure_area(&mut self, reference: &str) -> AreaId {
        if let Some(id) = self.area_index.get(reference) {
            return *id;
        }
        let id = AreaId(self.areas.len());
        self.areas.push(Area::new(reference));
        self.area_index.insert(reference.to_string(), id);
        id
    }

    pub fn add_member(&mut self, area: AreaId, member: Member) {
        self.areas[area.0].members.push(member);
    }

    /// Append a way; matchable ways are also indexed for near-way lookups
    pub(crate) fn push_way(&mut self, way: Way) -> WayId {
        let id = WayId(self.ways.len());
        if !way.nomerge {
            self.spatial.insert(id, &way.bbox);
        }
        self.ways.push(way);
        id
    }

    /// Rewrite a way's geometry, keeping the spatial index in step
    pub(crate) fn replace_line(&mut self, id: WayId, line: Vec<Coordinate>) {
        let way = &mut self.ways[id.0];
        let indexed = !way.nomerge && way.is_live();
        if indexed {
            self.spatial.remove(id, &way.bbox);
        }
        way.set_line(line);
        if indexed {
            self.spatial.insert(id, &way.bbox);
        }
    }

    pub(crate) fn tombstone(&mut self, id: WayId) {
        let way = &mut self.ways[id.0];
        if way.delete {
            return;
        }
        if !way.nomerge {
            self.spatial.remove(id, &way.bbox);
        }
        way.delete = true;
    }

    /// Replace every member pointing at `old` with the fragments, in order,
    /// leaving the rest of each member list untouched
    pub(crate) fn splice_members(&mut self, old: WayId, fragments: &[WayId]) {
        for area in &mut self.areas {
            if !area.members.iter().any(|m| m.way == old) {
                continue;
            }
            let mut members = Vec::with_capacity(area.members.len() + fragments.len());
            for member in &area.members {
                if member.way == old {
                    members.extend(fragments.iter().map(|&w| Member::new(w, member.role)));
                } else {
                    members.push(*member);
                }
            }
            area.members = members;
        }
    }

    /// Recompute every way's owning areas from the member lists
    pub fn refresh_parents(&mut self) {
        for way in &mut self.ways {
            way.parents.clear();
        }
        for (i, area) in self.areas.iter().enumerate() {
            for member in &area.members {
                self.ways[member.way.0].parents.insert(AreaId(i));
            }
        }
    }

    /// Drop members whose way has been tombstoned
    pub(crate) fn remove_dead_members(&mut self) -> usize {
        let ways = &self.ways;
        let mut removed = 0;
        for area in &mut self.areas {
            let before = area.members.len();
            area.members.retain(|m| ways[m.way.0].is_live());
            removed += before - area.members.len();
        }
        removed
    }
}
