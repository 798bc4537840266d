//! OSM output.

pub mod writer;

pub use writer::{write_osm, WriteError, WriteStats, WriterOptions};
