//! Naturbase protected area data.
//!
//! The Norwegian Environment Agency publishes protected and recreation areas
//! as GeoJSON. This module reads those features and maps their attributes to
//! OSM tags.

pub mod loader;
pub mod tags;

use geo::Polygon;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::pipeline::AreaFeature;

pub use loader::{load_features, parse_features, LoadError};
pub use tags::TagMapper;

/// Naturbase object types that are converted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// Naturvernområde
    Reserve,
    /// SikraFriluftslivsområde
    Recreation,
}

impl ObjectType {
    pub fn from_objtype(objtype: &str) -> Option<Self> {
        match objtype {
            "Naturvernområde" => Some(ObjectType::Reserve),
            "SikraFriluftslivsområde" => Some(ObjectType::Recreation),
            _ => None,
        }
    }
}

/// Feature attributes used for tagging. Values may arrive as strings,
/// numbers or null; empty strings read as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NaturbaseProperties {
    #[serde(deserialize_with = "lenient_string")]
    pub objtype: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub identifikasjon_lokalid: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub navn: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub offisieltnavn: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub verneform: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub verneplan: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub iucn: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub faktaark: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub verneforskrift: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub vernedato: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub forvaltningsmyndighet: Option<String>,
}

impl NaturbaseProperties {
    pub fn object_type(&self) -> Option<ObjectType> {
        self.objtype.as_deref().and_then(ObjectType::from_objtype)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => return Ok(None),
    };
    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

/// A converted Naturbase feature with its polygons in degrees
#[derive(Debug, Clone)]
pub struct NaturbaseFeature {
    pub properties: NaturbaseProperties,
    pub polygons: Vec<Polygon<f64>>,
}

impl NaturbaseFeature {
    /// Tagged area feature, or `None` without a reference or known type
    pub fn to_area_feature(&self, mapper: &TagMapper) -> Option<AreaFeature> {
        let reference = self.properties.identifikasjon_lokalid.clone()?;
        let tags = mapper.tags(&self.properties)?;
        Some(AreaFeature {
            reference,
            tags,
            polygons: self.polygons.clone(),
        })
    }
}
