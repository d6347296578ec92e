//! The `mcs-ephem-*` documents.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::query::{CENTER, HORIZONS_URL, OUT_UNITS, REF_PLANE, REF_SYSTEM, TIME_TYPE, VEC_TABLE};

pub const SCHEMA_SINGLE: &str = "mcs-ephem-v1";
pub const SCHEMA_MULTI: &str = "mcs-ephem-multi-v1";
pub const SCHEMA_MANIFEST: &str = "mcs-ephem-manifest-v1";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Source {
    pub name: String,
    pub service: String,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            name: "JPL Horizons".to_string(),
            service: HORIZONS_URL.to_string(),
        }
    }
}

/// Reference frame every feed is expressed in.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Frame {
    pub center: String,
    pub ref_system: String,
    pub ref_plane: String,
    pub out_units: String,
    pub time_type: String,
    pub vec_table: String,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            center: CENTER.to_string(),
            ref_system: REF_SYSTEM.to_string(),
            ref_plane: REF_PLANE.to_string(),
            out_units: OUT_UNITS.to_string(),
            time_type: TIME_TYPE.to_string(),
            vec_table: VEC_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ObjectRef {
    pub name: String,
    pub spkid: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WindowMeta {
    pub start: String,
    pub stop: String,
    pub step: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SingleMeta {
    pub object: ObjectRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowMeta>,
    pub generated_at: String,
    pub source: Source,
    pub frame: Frame,
    pub signature: Map<String, Value>,
}

/// One body's packed state vectors (`mcs-ephem-v1`).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SingleFeed {
    pub schema: &'static str,
    pub t_jd: Vec<f64>,
    pub pv: Vec<f64>,
    pub meta: SingleMeta,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedObject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spkid: Option<i64>,
    pub pv: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultiMeta {
    pub generated_at: String,
    pub source: Source,
    pub frame: Frame,
    pub signature: Map<String, Value>,
}

/// Several bodies on one shared time grid (`mcs-ephem-multi-v1`).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultiFeed {
    pub schema: &'static str,
    pub t_jd: Vec<f64>,
    /// Kept in insertion order so the Sun comes first
    #[serde(serialize_with = "ordered_map")]
    pub objects: Vec<(String, FeedObject)>,
    pub meta: MultiMeta,
}

fn ordered_map<S: Serializer>(
    entries: &[(String, FeedObject)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, object) in entries {
        map.serialize_entry(key, object)?;
    }
    map.end()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ManifestEntry {
    pub id: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Manifest {
    pub schema: &'static str,
    pub generated_at: String,
    pub source: Source,
    pub frame: Frame,
    pub datasets: Vec<ManifestEntry>,
}
