//! Granule JSON ingestion.
//!
//! Accepts either a bare array of granule records or a search response of the
//! form `{"feed": {"entry": [...]}}`.

use serde::Deserialize;
use tracing::debug;

use crate::footprint::{Footprint, FootprintId, Interpolation, Spatial};

#[derive(Debug)]
pub enum IngestError {
    Json(serde_json::Error),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Json(e) => write!(f, "invalid granule json: {e}"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(value: serde_json::Error) -> Self {
        IngestError::Json(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GranuleRecord {
    pub id: String,
    #[serde(default)]
    pub coordinate_system: Option<String>,
    #[serde(default)]
    pub points: Option<Vec<String>>,
    #[serde(default)]
    pub boxes: Option<Vec<String>>,
    #[serde(default)]
    pub lines: Option<Vec<String>>,
    #[serde(default)]
    pub polygons: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub orbit: Option<serde_json::Value>,
    #[serde(default)]
    pub time_start: Option<String>,
    #[serde(default)]
    pub time_end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<GranuleRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GranuleDocument {
    Feed { feed: Feed },
    List(Vec<GranuleRecord>),
}

impl From<GranuleRecord> for Footprint {
    /// Spatial precedence: polygons, then boxes, then lines, then points. A
    /// record with no spatial data becomes an empty point set.
    fn from(record: GranuleRecord) -> Self {
        let has_orbit = record.orbit.as_ref().is_some_and(|v| !v.is_null());
        let spatial = match (record.polygons, record.boxes, record.lines, record.points) {
            (Some(p), ..) if !p.is_empty() && has_orbit => Spatial::OrbitBackTrack(p),
            (Some(p), ..) if !p.is_empty() => Spatial::Polygons(p),
            (_, Some(b), ..) if !b.is_empty() => Spatial::Rectangles(b),
            (_, _, Some(l), _) if !l.is_empty() => Spatial::Lines(l),
            (_, _, _, Some(p)) => Spatial::Points(p),
            _ => Spatial::Points(Vec::new()),
        };

        let interpolation = match record.coordinate_system.as_deref() {
            Some(cs) if cs.eq_ignore_ascii_case("CARTESIAN") => Interpolation::Cartesian,
            _ => Interpolation::Geodetic,
        };

        Footprint {
            id: FootprintId(record.id),
            spatial,
            interpolation,
            time_start: record.time_start,
            time_end: record.time_end,
        }
    }
}

pub fn parse_granules(json: &str) -> Result<Vec<Footprint>, IngestError> {
    let doc: GranuleDocument = serde_json::from_str(json)?;
    let records = match doc {
        GranuleDocument::Feed { feed } => feed.entry,
        GranuleDocument::List(list) => list,
    };
    let footprints: Vec<Footprint> = records.into_iter().map(Footprint::from).collect();
    let without_spatial = footprints.iter().filter(|f| f.spatial.is_empty()).count();
    debug!(granules = footprints.len(), without_spatial, "parsed granules");
    Ok(footprints)
}
