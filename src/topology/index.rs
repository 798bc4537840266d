//! Spatial index for fast near-way lookups.

use rstar::{RTree, RTreeObject, AABB};

use crate::models::{Bbox, WayId};

/// Wrapper for R-tree indexing of way bounding boxes
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedWay {
    pub id: WayId,
    envelope: AABB<[i64; 2]>,
}

impl RTreeObject for IndexedWay {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedWay {
    pub fn new(id: WayId, bbox: &Bbox) -> Self {
        Self {
            id,
            envelope: AABB::from_corners(bbox.min_corner(), bbox.max_corner()),
        }
    }
}

/// R-tree over the bounding boxes of matchable ways.
///
/// Entries are keyed by (handle, box), so a way must be removed with the box it
/// was inserted with before its geometry changes.
#[derive(Default)]
pub struct WaySpatialIndex {
    tree: RTree<IndexedWay>,
}

impl WaySpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn insert(&mut self, id: WayId, bbox: &Bbox) {
        self.tree.insert(IndexedWay::new(id, bbox));
    }

    pub fn remove(&mut self, id: WayId, bbox: &Bbox) -> bool {
        self.tree.remove(&IndexedWay::new(id, bbox)).is_some()
    }

    /// Handles of all ways whose box touches `bbox`, in handle order
    pub fn intersecting(&self, bbox: &Bbox) -> Vec<WayId> {
        let query = AABB::from_corners(bbox.min_corner(), bbox.max_corner());
        let mut ids: Vec<WayId> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .map(|iw| iw.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
