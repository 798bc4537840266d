//! reserve2osm - shared-boundary conversion of protected areas to OSM
//!
//! This library provides the topology engine (decompose, merge, simplify),
//! the Naturbase reader and the OSM writer used by the `convert` binary.

pub mod models;
pub mod naturbase;
pub mod osm;
pub mod pipeline;
pub mod topology;

pub use models::{Area, AreaId, Coordinate, Member, Role, Way, WayId};
pub use pipeline::{AreaFeature, Pipeline, PipelineOptions, PipelineStats};
pub use topology::Topology;
