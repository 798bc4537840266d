//! Core data models for the boundary topology.

pub mod area;
pub mod coordinate;
pub mod way;

pub use area::{Area, AreaId, Member, Role, Tags};
pub use coordinate::Coordinate;
pub use way::{Bbox, Way, WayId};
