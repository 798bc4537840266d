//! Areas and their way members.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::way::WayId;

/// OSM tags, sorted by key for stable output
pub type Tags = BTreeMap<String, String>;

/// Handle of an area inside the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AreaId(pub usize);

/// How a way takes part in an area boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Outer,
    Inner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Outer => "outer",
            Role::Inner => "inner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub way: WayId,
    pub role: Role,
}

impl Member {
    pub fn new(way: WayId, role: Role) -> Self {
        Self { way, role }
    }
}

/// A protected area, kept as an ordered list of boundary members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    /// External identifier, e.g. the Naturbase `identifikasjon_lokalid`
    pub reference: String,
    pub tags: Tags,
    /// Blacklisted areas never share ways with anyone
    pub nomerge: bool,
    pub members: Vec<Member>,
}

impl Area {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            tags: Tags::new(),
            nomerge: false,
            members: Vec::new(),
        }
    }

    /// Areas with a single member may be written as a plain way
    pub fn is_relation(&self) -> bool {
        self.members.len() > 1
    }
}
