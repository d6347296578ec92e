//! Comets and meteorite landings for the stellar-objects dataset.

pub mod comets;
pub mod meteorites;
pub mod sbdb;

use std::path::Path;

use log::info;
use serde::Serialize;
use shared::time::now_iso_z;
use shared::{write_json_atomic, Fetch, FetchError, JsonStyle, OutputError};
use thiserror::Error;

pub use comets::{fetch_comets, Comet, CometMeta, CometOptions};
pub use meteorites::{fetch_meteorite_rows, normalize_meteorites, Meteorite};
pub use sbdb::{CometFilter, Discovery, SbdbClient, SBDB_LOOKUP_URL, SBDB_QUERY_URL};

pub const SCHEMA: &str = "mcs-education-stellar-objects-v1";

const NOTES: [&str; 4] = [
    "Comets are sourced from JPL SBDB Query API; discovery circumstances are optionally enriched for numbered comets via SBDB lookup API discovery=1.",
    "Meteorites are sourced from NASA Open Data Portal 'Meteorite Landings API' (Meteoritical Society compilation).",
    "Field availability varies by object; unnumbered comets may not have discovery circumstances in SBDB lookup.",
    "The 'orbitProducer' field is the orbit-solution producer (not necessarily the discoverer).",
];

#[derive(Error, Debug)]
pub enum SmallBodyError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unexpected response shape from {url}: {message}")]
    Shape { url: String, message: String },

    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type SmallBodyResult<T> = Result<T, SmallBodyError>;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CometSource {
    pub name: String,
    pub url: String,
    pub lookup_url: String,
    pub meta: CometMeta,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeteoriteSource {
    pub name: String,
    pub url_used: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Sources {
    pub comets: CometSource,
    pub meteorites: MeteoriteSource,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StellarObjectsMeta {
    pub generated_at: String,
    pub schema: String,
    pub notes: Vec<String>,
    pub sources: Sources,
}

/// The stellar-objects document.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StellarObjects {
    pub meta: StellarObjectsMeta,
    pub comets: Vec<Comet>,
    pub meteorites: Vec<Meteorite>,
}

/// Fetch comets then meteorites and assemble the document.
pub fn build_stellar_objects<F: Fetch>(
    sbdb: &SbdbClient<F>,
    open_data: &F,
    options: &CometOptions,
) -> SmallBodyResult<StellarObjects> {
    let generated_at = now_iso_z();

    info!("[1/2] Fetching comets from SBDB");
    let (comets, comet_meta) = fetch_comets(sbdb, options)?;

    info!("[2/2] Fetching meteorite landings");
    let fetched = fetch_meteorite_rows(open_data)?;
    let meteorites = normalize_meteorites(&fetched.rows);
    info!("      {} meteorites from {}", meteorites.len(), fetched.url_used);

    Ok(StellarObjects {
        meta: StellarObjectsMeta {
            generated_at,
            schema: SCHEMA.to_string(),
            notes: NOTES.iter().map(|n| n.to_string()).collect(),
            sources: Sources {
                comets: CometSource {
                    name: "NASA/JPL SBDB Query API".to_string(),
                    url: SBDB_QUERY_URL.to_string(),
                    lookup_url: SBDB_LOOKUP_URL.to_string(),
                    meta: comet_meta,
                },
                meteorites: MeteoriteSource {
                    name: "NASA Open Data Portal - Meteorite Landings API".to_string(),
                    url_used: fetched.url_used,
                    count: meteorites.len(),
                },
            },
        },
        comets,
        meteorites,
    })
}

/// [`build_stellar_objects`] and write the document compactly to `output`.
pub fn compile_stellar_objects<F: Fetch>(
    sbdb: &SbdbClient<F>,
    open_data: &F,
    options: &CometOptions,
    output: &Path,
) -> SmallBodyResult<StellarObjects> {
    let document = build_stellar_objects(sbdb, open_data, options)?;
    write_json_atomic(output, &document, JsonStyle::Compact)?;
    info!(
        "Wrote {} ({} comets, {} meteorites)",
        output.display(),
        document.comets.len(),
        document.meteorites.len()
    );
    Ok(document)
}
