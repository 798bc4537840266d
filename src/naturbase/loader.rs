//! GeoJSON FeatureCollection reader for Naturbase exports.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use geo::{Coord, LineString, Polygon};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::{NaturbaseFeature, NaturbaseProperties};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
}

type Position = Vec<f64>;
type Ring = Vec<Position>;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<NaturbaseProperties>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
    #[serde(other)]
    Other,
}

fn to_line_string(ring: &[Position]) -> Option<LineString<f64>> {
    ring.iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

fn to_polygon(rings: &[Ring]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    let exterior = to_line_string(exterior)?;
    let interiors = interiors
        .iter()
        .map(|r| to_line_string(r))
        .collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

/// Read features from a GeoJSON file
pub fn load_features<P: AsRef<Path>>(path: P) -> Result<Vec<NaturbaseFeature>, LoadError> {
    let path = path.as_ref();
    info!("Loading Naturbase features from {:?}", path);
    let file = File::open(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_features(BufReader::new(file))
}

/// Parse features, keeping polygons of reserves and recreation areas
pub fn parse_features<R: Read>(reader: R) -> Result<Vec<NaturbaseFeature>, LoadError> {
    let collection: FeatureCollection = serde_json::from_reader(reader)?;
    let total = collection.features.len();

    let mut features = Vec::new();
    let mut skipped_type = 0;
    let mut skipped_geometry = 0;

    for raw in collection.features {
        let properties = raw.properties.unwrap_or_default();
        if properties.object_type().is_none() {
            skipped_type += 1;
            continue;
        }
        let reference = properties
            .identifikasjon_lokalid
            .clone()
            .unwrap_or_else(|| "?".to_string());

        let polygons = match &raw.geometry {
            Some(RawGeometry::Polygon { coordinates }) => to_polygon(coordinates).into_iter().collect(),
            Some(RawGeometry::MultiPolygon { coordinates }) => {
                coordinates.iter().filter_map(|p| to_polygon(p)).collect()
            }
            Some(RawGeometry::Other) | None => Vec::new(),
        };
        if polygons.is_empty() {
            warn!("Skipping {}: no usable polygon geometry", reference);
            skipped_geometry += 1;
            continue;
        }

        features.push(NaturbaseFeature {
            properties,
            polygons,
        });
    }

    info!(
        "Loaded {} of {} features ({} other object types, {} without polygons)",
        features.len(),
        total,
        skipped_type,
        skipped_geometry
    );
    Ok(features)
}
