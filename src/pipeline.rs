//! Batch driver from polygon features to a finished topology.
//!
//! Features are added one at a time; each ring is cleaned up and handed to the
//! decomposer. [`Pipeline::finish`] then merges and simplifies once.

use geo::{LineString, Polygon};
use hashbrown::HashSet;
use tracing::{debug, info, warn};

use crate::models::{Coordinate, Role, Tags};
use crate::topology::{MergeStats, SimplifyStats, Topology};

/// A polygon feature ready for decomposition
#[derive(Debug, Clone)]
pub struct AreaFeature {
    /// External area identifier; features sharing it form one area
    pub reference: String,
    pub tags: Tags,
    pub polygons: Vec<Polygon<f64>>,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Share boundaries between areas; when off every ring is kept as its own way
    pub split: bool,
    /// RDP tolerance in meters, `None` disables simplification
    pub simplify_epsilon: Option<f64>,
    /// Area references excluded from boundary sharing
    pub blacklist: HashSet<String>,
    /// Stop registering new areas after this many
    pub max_areas: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            split: true,
            simplify_epsilon: None,
            blacklist: HashSet::new(),
            max_areas: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub features: usize,
    pub rings: usize,
    pub skipped_features: usize,
    pub skipped_rings: usize,
    pub merge: MergeStats,
    pub simplify: SimplifyStats,
}

pub struct Pipeline {
    topology: Topology,
    options: PipelineOptions,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            topology: Topology::new(),
            options,
            stats: PipelineStats::default(),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Decompose all rings of a feature. Returns false if it was skipped.
    pub fn add_feature(&mut self, feature: &AreaFeature) -> bool {
        let mut rings = Vec::new();
        for polygon in &feature.polygons {
            if is_circle_artifact(polygon.exterior()) {
                debug!("Skipping circle artifact in {}", feature.reference);
                self.stats.skipped_rings += 1 + polygon.interiors().len();
                continue;
            }

            let all = std::iter::once((polygon.exterior(), Role::Outer))
                .chain(polygon.interiors().iter().map(|r| (r, Role::Inner)));
            for (ring, role) in all {
                match prepare_ring(ring) {
                    Some(ring) => rings.push((ring, role)),
                    None => {
                        warn!("Skipping degenerate {} ring in {}", role, feature.reference);
                        self.stats.skipped_rings += 1;
                    }
                }
            }
        }

        if rings.is_empty() {
            self.stats.skipped_features += 1;
            return false;
        }

        let area = match self.topology.find_area(&feature.reference) {
            Some(id) => id,
            None => {
                if let Some(max) = self.options.max_areas {
                    if self.topology.areas().len() >= max {
                        self.stats.skipped_features += 1;
                        return false;
                    }
                }
                let id = self.topology.ensure_area(&feature.reference);
                let area = self.topology.area_mut(id);
                area.tags = feature.tags.clone();
                area.nomerge =
                    !self.options.split || self.options.blacklist.contains(&feature.reference);
                debug!("Area: {}", feature.reference);
                id
            }
        };

        for (ring, role) in rings {
            self.topology.decompose(area, &ring, role);
            self.stats.rings += 1;
        }
        self.stats.features += 1;
        true
    }

    /// Merge and simplify the finished store
    pub fn finish(mut self) -> (Topology, PipelineStats) {
        info!(
            "{} areas from {} features, {} rings, {} ways",
            self.topology.areas().len(),
            self.stats.features,
            self.stats.rings,
            self.topology.live_way_count()
        );

        self.stats.merge = self.topology.merge();
        if let Some(epsilon) = self.options.simplify_epsilon.filter(|e| *e > 0.0) {
            self.stats.simplify = self.topology.simplify_ways(epsilon);
        }
        (self.topology, self.stats)
    }
}

/// Quantize a ring and drop repeated consecutive points.
///
/// Returns `None` when fewer than three distinct points remain.
pub fn prepare_ring(ring: &LineString<f64>) -> Option<Vec<Coordinate>> {
    let mut line: Vec<Coordinate> = Vec::with_capacity(ring.0.len());
    for c in ring.coords() {
        let c = Coordinate::from(*c);
        if line.last() != Some(&c) {
            line.push(c);
        }
    }

    let distinct: HashSet<Coordinate> = line.iter().copied().collect();
    if distinct.len() < 3 {
        return None;
    }
    Some(line)
}

/// Naturbase marks some point objects with 40-gon circles of about 20 m
/// diameter. They carry no boundary worth sharing.
pub fn is_circle_artifact(ring: &LineString<f64>) -> bool {
    let coords = &ring.0;
    if coords.len() != 41 {
        return false;
    }
    let span = coords[10].y - coords[30].y;
    span > 0.000176 && span < 0.000180
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaId, Member};
    use crate::topology::tests::{area_edges, edges_of};
    use geo::Coord;

    fn polygon(exterior: &[(f64, f64)], interiors: &[&[(f64, f64)]]) -> Polygon<f64> {
        Polygon::new(
            LineString::from(exterior.to_vec()),
            interiors.iter().map(|r| LineString::from(r.to_vec())).collect(),
        )
    }

    fn feature(reference: &str, polygons: Vec<Polygon<f64>>) -> AreaFeature {
        AreaFeature {
            reference: reference.to_string(),
            tags: Tags::new(),
            polygons,
        }
    }

    /// A small grid of adjacent and nested areas
    fn sample_features() -> Vec<AreaFeature> {
        vec![
            feature(
                "A",
                vec![polygon(
                    &[(0.0, 0.0), (0.01, 0.0), (0.01, 0.01), (0.0, 0.01), (0.0, 0.0)],
                    &[&[(0.002, 0.002), (0.004, 0.002), (0.004, 0.004), (0.002, 0.004), (0.002, 0.002)]],
                )],
            ),
            feature(
                "B",
                vec![polygon(
                    &[(0.01, 0.0), (0.02, 0.0), (0.02, 0.01), (0.01, 0.01), (0.01, 0.005), (0.01, 0.0)],
                    &[],
                )],
            ),
            feature(
                "C",
                vec![polygon(
                    &[(0.0, 0.01), (0.005, 0.01), (0.01, 0.01), (0.02, 0.01), (0.02, 0.02), (0.0, 0.02), (0.0, 0.01)],
                    &[],
                )],
            ),
            // The hole of A filled by its own area
            feature(
                "D",
                vec![polygon(
                    &[(0.002, 0.002), (0.002, 0.004), (0.004, 0.004), (0.004, 0.002), (0.002, 0.002)],
                    &[],
                )],
            ),
        ]
    }

    fn expected_edges(feature: &AreaFeature) -> Vec<(Coordinate, Coordinate)> {
        let mut edges: Vec<_> = feature
            .polygons
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
            .flat_map(|r| edges_of(&prepare_ring(r).unwrap()))
            .collect();
        edges.sort();
        edges
    }

    fn run(features: &[AreaFeature], options: PipelineOptions) -> Topology {
        let mut pipeline = Pipeline::new(options);
        for f in features {
            pipeline.add_feature(f);
        }
        pipeline.finish().0
    }

    #[test]
    fn test_reconstruction_before_simplify() {
        let features = sample_features();
        let mut pipeline = Pipeline::new(PipelineOptions::default());
        for f in &features {
            assert!(pipeline.add_feature(f));
        }

        // After decomposition alone
        for f in &features {
            let id = pipeline.topology().find_area(&f.reference).unwrap();
            assert_eq!(area_edges(pipeline.topology(), id), expected_edges(f), "area {}", f.reference);
        }

        // And after merging
        let (topology, _) = pipeline.finish();
        for f in &features {
            let id = topology.find_area(&f.reference).unwrap();
            assert_eq!(area_edges(&topology, id), expected_edges(f), "area {}", f.reference);
        }
    }

    #[test]
    fn test_shared_boundaries_are_single_ways() {
        let topology = run(&sample_features(), PipelineOptions::default());

        // A's hole and D's outer ring are the same way
        let a = topology.find_area("A").unwrap();
        let d = topology.find_area("D").unwrap();
        let inner: Vec<_> = topology.area(a).members.iter().filter(|m| m.role == Role::Inner).collect();
        assert_eq!(inner.len(), 1);
        assert_eq!(topology.area(d).members, vec![Member::new(inner[0].way, Role::Outer)]);

        // No two live ways share an edge
        let mut edges: Vec<_> = topology.live_ways().flat_map(|(_, w)| edges_of(&w.line)).collect();
        let total = edges.len();
        edges.sort();
        edges.dedup();
        assert_eq!(edges.len(), total);
    }

    #[test]
    fn test_merge_is_maximal_after_pipeline() {
        let mut topology = run(&sample_features(), PipelineOptions::default());
        assert!(topology.pending_merges().is_empty());
    }

    #[test]
    fn test_deterministic() {
        let options = PipelineOptions {
            simplify_epsilon: Some(1.0),
            ..PipelineOptions::default()
        };
        let first = run(&sample_features(), options.clone());
        let second = run(&sample_features(), options);

        let lines = |t: &Topology| t.live_ways().map(|(id, w)| (id, w.line.clone())).collect::<Vec<_>>();
        let members = |t: &Topology| t.areas().iter().map(|a| a.members.clone()).collect::<Vec<_>>();
        assert_eq!(lines(&first), lines(&second));
        assert_eq!(members(&first), members(&second));
    }

    #[test]
    fn test_blacklisted_area_keeps_own_ways() {
        let mut options = PipelineOptions::default();
        options.blacklist.insert("B".to_string());
        let features = sample_features();
        let topology = run(&features, options);

        let b = topology.find_area("B").unwrap();
        assert_eq!(topology.area(b).members.len(), 1);
        let way = topology.way(topology.area(b).members[0].way);
        assert!(way.nomerge);
        assert_eq!(way.line, prepare_ring(features[1].polygons[0].exterior()).unwrap());
        for (i, area) in topology.areas().iter().enumerate() {
            if AreaId(i) != b {
                assert!(area.members.iter().all(|m| m.way != topology.area(b).members[0].way));
            }
        }
    }

    #[test]
    fn test_no_split_keeps_every_ring() {
        let options = PipelineOptions {
            split: false,
            ..PipelineOptions::default()
        };
        let topology = run(&sample_features(), options);
        assert_eq!(topology.live_way_count(), 5);
        assert!(topology.live_ways().all(|(_, w)| w.nomerge));
    }

    #[test]
    fn test_max_areas() {
        let options = PipelineOptions {
            max_areas: Some(2),
            ..PipelineOptions::default()
        };
        let mut pipeline = Pipeline::new(options);
        let results: Vec<bool> = sample_features().iter().map(|f| pipeline.add_feature(f)).collect();
        assert_eq!(results, vec![true, true, false, false]);
        assert_eq!(pipeline.topology().areas().len(), 2);
    }

    #[test]
    fn test_prepare_ring_dedups() {
        let ring = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        assert_eq!(prepare_ring(&ring).unwrap().len(), 4);

        let collapsed = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.00000001, 0.0), (0.0, 0.0)]);
        assert!(prepare_ring(&collapsed).is_none());
    }

    #[test]
    fn test_circle_artifact() {
        let radius = 0.000089;
        let circle: Vec<Coord<f64>> = (0..=40)
            .map(|i| {
                // Start at the east point so index 10 is north and 30 is south
                let angle = std::f64::consts::PI * 2.0 * (i as f64) / 40.0;
                Coord {
                    x: 10.0 + radius * 2.0 * angle.cos(),
                    y: 60.0 + radius * angle.sin(),
                }
            })
            .collect();
        assert!(is_circle_artifact(&LineString::new(circle.clone())));

        let mut square: Vec<Coord<f64>> = circle;
        square.truncate(40);
        assert!(!is_circle_artifact(&LineString::new(square)));
    }

    #[test]
    fn test_circle_feature_skipped() {
        let mut circle: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let angle = std::f64::consts::PI * 2.0 * (i as f64) / 40.0;
                (10.0 + 0.000178 * angle.cos(), 60.0 + 0.000089 * angle.sin())
            })
            .collect();
        circle.push(circle[0]);
        let mut pipeline = Pipeline::new(PipelineOptions::default());
        assert!(!pipeline.add_feature(&feature("X", vec![polygon(&circle, &[])])));
        assert_eq!(pipeline.topology().live_way_count(), 0);
    }
}
