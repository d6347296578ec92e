//! NASA Exoplanet Archive TAP queries.

use serde_json::Value;
use shared::{Fetch, FetchError, OutputError};
use thiserror::Error;

pub const TAP_SYNC_URL: &str = "https://exoplanetarchive.ipac.caltech.edu/TAP/sync";

/// Columns read from the planetary systems (`ps`) table.
pub const PS_COLUMNS: [&str; 26] = [
    "hostname",
    "sy_snum",
    "sy_pnum",
    "sy_dist",
    "ra",
    "dec",
    "cb_flag",
    "st_teff",
    "st_lum",
    "st_mass",
    "st_rad",
    "st_spectype",
    "pl_name",
    "pl_letter",
    "discoverymethod",
    "disc_year",
    "pul_flag",
    "ptv_flag",
    "etv_flag",
    "pl_orbper",
    "pl_orbsmax",
    "pl_rade",
    "pl_bmasse",
    "pl_dens",
    "pl_insol",
    "pl_eqt",
];

/// Columns read from the `stellarhosts` table. The `ps` table does not
/// reliably carry `gaia_dr3_id`, so Gaia ids come from here.
pub const STELLAR_HOST_COLUMNS: [&str; 14] = [
    "sy_name",
    "hostname",
    "sy_snum",
    "sy_pnum",
    "sy_dist",
    "ra",
    "dec",
    "gaia_dr3_id",
    "cb_flag",
    "st_teff",
    "st_lum",
    "st_mass",
    "st_rad",
    "st_spectype",
];

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unexpected response shape from {url}: {message}")]
    Shape { url: String, message: String },

    #[error("unexpected Gaia TAP response: {0}")]
    GaiaFormat(String),

    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Percent-encode an ADQL query for the `query=` parameter. Commas and the
/// operators stay readable and spaces become `+`.
pub fn encode_adql(query: &str) -> String {
    const KEEP: &[u8] = b"_.-~,=*()'<>!+\n\t";
    let mut out = String::with_capacity(query.len() * 2);
    for byte in query.bytes() {
        match byte {
            b' ' => out.push('+'),
            b if b.is_ascii_alphanumeric() || KEEP.contains(&b) => out.push(char::from(b)),
            b => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

pub fn adql_url(query: &str, maxrec: u32) -> String {
    format!(
        "{TAP_SYNC_URL}?query={}&format=json&maxrec={maxrec}",
        encode_adql(query)
    )
}

pub fn ps_query() -> String {
    format!(
        "select {} from ps where default_flag=1 order by hostname asc",
        PS_COLUMNS.join(",")
    )
}

pub fn stellarhosts_query() -> String {
    format!(
        "select {} from stellarhosts where 1=1 and sy_snum>=2 order by sy_name asc, hostname asc",
        STELLAR_HOST_COLUMNS.join(",")
    )
}

pub fn ps_url(maxrec: u32) -> String {
    adql_url(&ps_query(), maxrec)
}

pub fn stellarhosts_url(maxrec: u32) -> String {
    adql_url(&stellarhosts_query(), maxrec)
}

/// GET a TAP URL and return its rows; anything but an array of objects is an error.
pub fn fetch_rows<F: Fetch>(fetch: &F, url: &str) -> ArchiveResult<Vec<Value>> {
    let shape = |message: &str| ArchiveError::Shape {
        url: url.to_string(),
        message: message.to_string(),
    };

    match fetch.get_json(url, &[])? {
        Value::Array(rows) => {
            if rows.iter().all(Value::is_object) {
                Ok(rows)
            } else {
                Err(shape("array contains non-object rows"))
            }
        }
        _ => Err(shape("expected a JSON array of rows")),
    }
}
