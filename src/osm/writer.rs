//! OSM XML output of a finished topology.
//!
//! Everything gets negative ids so the file can be opened in JOSM as new data.
//! Output is planned first (nodes, ways, relations) and then written in the
//! usual OSM order.

use std::io::Write;

use hashbrown::HashMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use thiserror::Error;
use tracing::info;

use crate::models::{Coordinate, Tags, WayId};
use crate::topology::Topology;

/// First id handed out; later ids count down
pub const FIRST_ID: i64 = -1001;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub generator: String,
    /// Tag every way with its store handle as `WAY_REF`
    pub debug: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            generator: concat!("reserve2osm v", env!("CARGO_PKG_VERSION")).to_string(),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub nodes: usize,
    pub ways: usize,
    pub relations: usize,
}

struct WayRecord {
    id: i64,
    nodes: Vec<i64>,
    tags: Tags,
}

struct RelationRecord {
    id: i64,
    members: Vec<(i64, &'static str)>,
    tags: Tags,
}

#[derive(Default)]
struct Plan {
    debug: bool,
    next_id: i64,
    nodes: Vec<(i64, Coordinate)>,
    node_ids: HashMap<Coordinate, i64>,
    ways: Vec<WayRecord>,
    way_ids: HashMap<WayId, i64>,
    relations: Vec<RelationRecord>,
}

impl Plan {
    fn new(debug: bool) -> Self {
        Self {
            debug,
            next_id: FIRST_ID,
            ..Self::default()
        }
    }

    fn take_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id -= 1;
        id
    }

    fn node(&mut self, coord: Coordinate) -> i64 {
        if let Some(id) = self.node_ids.get(&coord) {
            return *id;
        }
        let id = self.take_id();
        self.node_ids.insert(coord, id);
        self.nodes.push((id, coord));
        id
    }

    /// Emit a way once; later calls return the id already given
    fn way(&mut self, topology: &mut Topology, way: WayId, mut tags: Tags) -> i64 {
        if let Some(id) = self.way_ids.get(&way) {
            return *id;
        }
        if self.debug {
            tags.insert("WAY_REF".to_string(), way.0.to_string());
        }
        let nodes = topology.way(way).line.iter().map(|c| self.node(*c)).collect();
        let id = self.take_id();
        topology.way_mut(way).tagged = true;
        self.way_ids.insert(way, id);
        self.ways.push(WayRecord { id, nodes, tags });
        id
    }
}

fn plan(topology: &mut Topology, debug: bool) -> Plan {
    let mut plan = Plan::new(debug);
    let mut relation_areas = Vec::new();

    // Single-way areas become tagged closed ways
    for index in 0..topology.areas().len() {
        let area = &topology.areas()[index];
        if area.members.is_empty() {
            continue;
        }
        let way = area.members[0].way;
        if !area.is_relation() && !topology.way(way).tagged && topology.way(way).is_live() {
            let tags = area.tags.clone();
            plan.way(topology, way, tags);
        } else {
            relation_areas.push(index);
        }
    }

    for index in relation_areas {
        let area = &topology.areas()[index];
        let mut tags = area.tags.clone();
        tags.insert("type".to_string(), "multipolygon".to_string());
        let members: Vec<_> = area
            .members
            .iter()
            .filter(|m| topology.way(m.way).is_live())
            .map(|m| (m.way, m.role.as_str()))
            .collect();

        let mut refs = Vec::with_capacity(members.len());
        for (way, role) in members {
            let mut way_tags = Tags::new();
            way_tags.insert("boundary".to_string(), "protected_area".to_string());
            refs.push((plan.way(topology, way, way_tags), role));
        }
        let id = plan.take_id();
        plan.relations.push(RelationRecord {
            id,
            members: refs,
            tags,
        });
    }

    plan
}

fn write_tags<W: Write>(writer: &mut Writer<W>, tags: &Tags) -> Result<(), WriteError> {
    for (k, v) in tags {
        writer.write_event(Event::Empty(
            BytesStart::new("tag").with_attributes([("k", k.as_str()), ("v", v.as_str())]),
        ))?;
    }
    Ok(())
}

/// Write the topology as an OSM XML document.
///
/// Ways that end up in the output are marked `tagged`.
pub fn write_osm<W: Write>(
    topology: &mut Topology,
    out: W,
    options: &WriterOptions,
) -> Result<WriteStats, WriteError> {
    let plan = plan(topology, options.debug);
    let mut writer = Writer::new_with_indent(out, b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("osm").with_attributes([
        ("version", "0.6"),
        ("generator", options.generator.as_str()),
        ("upload", "false"),
    ])))?;

    for (id, coord) in &plan.nodes {
        let id = id.to_string();
        let lat = format!("{:.7}", coord.lat_degrees());
        let lon = format!("{:.7}", coord.lon_degrees());
        writer.write_event(Event::Empty(BytesStart::new("node").with_attributes([
            ("id", id.as_str()),
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
        ])))?;
    }

    for way in &plan.ways {
        let id = way.id.to_string();
        writer.write_event(Event::Start(BytesStart::new("way").with_attributes([
            ("id", id.as_str()),
        ])))?;
        for node in &way.nodes {
            let node = node.to_string();
            writer.write_event(Event::Empty(
                BytesStart::new("nd").with_attributes([("ref", node.as_str())]),
            ))?;
        }
        write_tags(&mut writer, &way.tags)?;
        writer.write_event(Event::End(BytesEnd::new("way")))?;
    }

    for relation in &plan.relations {
        let id = relation.id.to_string();
        writer.write_event(Event::Start(BytesStart::new("relation").with_attributes([
            ("id", id.as_str()),
        ])))?;
        for (way, role) in &relation.members {
            let way = way.to_string();
            writer.write_event(Event::Empty(BytesStart::new("member").with_attributes([
                ("type", "way"),
                ("ref", way.as_str()),
                ("role", *role),
            ])))?;
        }
        write_tags(&mut writer, &relation.tags)?;
        writer.write_event(Event::End(BytesEnd::new("relation")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("osm")))?;
    writer.get_mut().write_all(b"\n")?;
    writer.get_mut().flush()?;

    let stats = WriteStats {
        nodes: plan.nodes.len(),
        ways: plan.ways.len(),
        relations: plan.relations.len(),
    };
    info!(
        "Wrote {} nodes, {} ways, {} relations",
        stats.nodes, stats.ways, stats.relations
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coordinate::line_from_degrees;
    use crate::models::Role;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn write(topology: &mut Topology) -> (String, WriteStats) {
        let mut out = Vec::new();
        let stats = write_osm(topology, &mut out, &WriterOptions::default()).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    /// Two squares sharing an edge
    fn neighbours() -> Topology {
        let mut topology = Topology::new();
        let a = topology.ensure_area("A");
        topology.area_mut(a).tags = tags(&[("name", "Øst & Vest"), ("boundary", "protected_area")]);
        topology.decompose(
            a,
            &line_from_degrees(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
            Role::Outer,
        );
        let b = topology.ensure_area("B");
        topology.area_mut(b).tags = tags(&[("name", "B")]);
        topology.decompose(
            b,
            &line_from_degrees(&[(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 0.0)]),
            Role::Outer,
        );
        topology.merge();
        topology
    }

    #[test]
    fn test_single_way_area() {
        let mut topology = Topology::new();
        let a = topology.ensure_area("A");
        topology.area_mut(a).tags = tags(&[("name", "A")]);
        topology.decompose(
            a,
            &line_from_degrees(&[(10.0, 60.0), (10.5, 60.0), (10.5, 60.5), (10.0, 60.0)]),
            Role::Outer,
        );

        let (xml, stats) = write(&mut topology);

        assert_eq!(stats, WriteStats { nodes: 3, ways: 1, relations: 0 });
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("upload=\"false\""));
        assert!(xml.contains("<node id=\"-1001\" lat=\"60.0000000\" lon=\"10.0000000\"/>"));
        assert!(!xml.contains("action="));
        assert!(!xml.contains("visible="));
        assert!(xml.contains("<way id=\"-1004\""));
        assert_eq!(xml.matches("<nd ref=\"-1001\"/>").count(), 2);
        assert!(xml.contains("<tag k=\"name\" v=\"A\"/>"));
        assert!(topology.ways()[0].tagged);
    }

    #[test]
    fn test_shared_edge_becomes_relations() {
        let mut topology = neighbours();
        let (xml, stats) = write(&mut topology);

        // Shared edge, A's outer part, B's outer part; nodes shared between them
        assert_eq!(stats, WriteStats { nodes: 6, ways: 3, relations: 2 });
        assert_eq!(xml.matches("<tag k=\"type\" v=\"multipolygon\"/>").count(), 2);
        assert_eq!(xml.matches("<tag k=\"boundary\" v=\"protected_area\"/>").count(), 4);
        assert_eq!(xml.matches("role=\"outer\"").count(), 4);
        assert!(xml.contains("v=\"Øst &amp; Vest\""));
        assert!(topology.live_ways().all(|(_, w)| w.tagged));
    }

    #[test]
    fn test_ids_unique_and_negative() {
        let mut topology = neighbours();
        let (xml, _) = write(&mut topology);

        let mut ids: Vec<i64> = xml
            .split(" id=\"")
            .skip(1)
            .filter_map(|s| s.split('"').next())
            .map(|s| s.parse().unwrap())
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert!(ids.iter().all(|id| *id <= FIRST_ID));
    }

    #[test]
    fn test_empty_area_skipped() {
        let mut topology = Topology::new();
        topology.ensure_area("A");
        let (xml, stats) = write(&mut topology);
        assert_eq!(stats, WriteStats::default());
        assert!(xml.trim_end().ends_with("</osm>"));
    }

    #[test]
    fn test_write_to_file() {
        let mut topology = neighbours();
        let file = tempfile::NamedTempFile::new().unwrap();
        let stats = write_osm(
            &mut topology,
            std::io::BufWriter::new(file.reopen().unwrap()),
            &WriterOptions {
                generator: "test".to_string(),
                debug: false,
            },
        )
        .unwrap();
        let xml = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(xml.matches("<way ").count(), stats.ways);
        assert!(xml.contains("generator=\"test\""));
    }

    #[test]
    fn test_debug_way_refs() {
        let mut topology = neighbours();
        let mut out = Vec::new();
        let options = WriterOptions {
            debug: true,
            ..WriterOptions::default()
        };
        let stats = write_osm(&mut topology, &mut out, &options).unwrap();
        let xml = String::from_utf8(out).unwrap();
        assert_eq!(xml.matches("<tag k=\"WAY_REF\"").count(), stats.ways);
        assert!(xml.contains("<tag k=\"WAY_REF\" v=\"0\"/>"));

        let (plain, _) = write(&mut neighbours());
        assert!(!plain.contains("WAY_REF"));
    }
}
