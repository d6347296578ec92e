//! Meteorite landings from NASA Open Data.

use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use shared::numeric::{field_num, field_text, value_text};
use shared::{query, Fetch};

use crate::{SmallBodyError, SmallBodyResult};

pub const METEORITE_PRIMARY_URL: &str =
    "https://data.nasa.gov/docs/legacy/meteorite_landings/gh4g-9sfh.json";
pub const METEORITE_FALLBACK_URL: &str = "https://data.nasa.gov/resource/y77d-th95.json";

/// Socrata page size for the fallback endpoint.
pub const SOCRATA_PAGE_SIZE: usize = 50_000;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meteorite {
    pub id: String,
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fall: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reclat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reclong: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<Value>,
}

/// Rows as fetched, with the endpoint that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct MeteoriteRows {
    pub url_used: String,
    pub rows: Vec<Value>,
}

/// `(year, trimmed text)`: the year is the first four characters when they
/// form an integer in `1..=9998`.
pub fn parse_meteorite_year(value: &Value) -> (Option<i64>, Option<String>) {
    let Some(text) = value_text(value) else {
        return (None, None);
    };
    let year = text
        .chars()
        .take(4)
        .collect::<String>()
        .parse::<i64>()
        .ok()
        .filter(|y| (1..9999).contains(y));
    (year, Some(text))
}

/// Fetch every landing row, preferring the legacy JSON export and falling back
/// to paging the Socrata resource.
///
/// # Errors
///
/// Fails only when the fallback fails too.
pub fn fetch_meteorite_rows<F: Fetch>(fetch: &F) -> SmallBodyResult<MeteoriteRows> {
    match fetch.get_json(METEORITE_PRIMARY_URL, &[]) {
        Ok(Value::Array(rows)) => {
            return Ok(MeteoriteRows {
                url_used: METEORITE_PRIMARY_URL.to_string(),
                rows,
            })
        }
        Ok(_) => warn!("{METEORITE_PRIMARY_URL} did not return an array; using Socrata"),
        Err(e) => warn!("{METEORITE_PRIMARY_URL} failed: {e}; using Socrata"),
    }

    let mut rows = Vec::new();
    let mut offset = 0;
    loop {
        let params = query(&[
            ("$limit", SOCRATA_PAGE_SIZE.to_string()),
            ("$offset", offset.to_string()),
        ]);
        let page = match fetch.get_json(METEORITE_FALLBACK_URL, &params)? {
            Value::Array(page) if !page.is_empty() => page,
            Value::Array(_) => break,
            _ => {
                return Err(SmallBodyError::Shape {
                    url: METEORITE_FALLBACK_URL.to_string(),
                    message: "expected a JSON array".to_string(),
                })
            }
        };
        let len = page.len();
        rows.extend(page.into_iter().filter(Value::is_object));
        if len < SOCRATA_PAGE_SIZE {
            break;
        }
        offset += SOCRATA_PAGE_SIZE;
    }
    info!("Socrata returned {} meteorite rows", rows.len());

    Ok(MeteoriteRows {
        url_used: METEORITE_FALLBACK_URL.to_string(),
        rows,
    })
}

/// Meteorites from raw rows, sorted by lowercase name. Rows without a name are
/// dropped.
pub fn normalize_meteorites(rows: &[Value]) -> Vec<Meteorite> {
    let mut out: Vec<Meteorite> = rows
        .iter()
        .filter_map(|row| {
            let name = row.get("name").and_then(Value::as_str).map(str::trim)?;
            if name.is_empty() {
                return None;
            }
            let raw = |key: &str| row.get(key).filter(|v| !v.is_null()).cloned();
            let (year, year_raw) = parse_meteorite_year(row.get("year").unwrap_or(&Value::Null));

            Some(Meteorite {
                id: format!(
                    "meteorite:{}",
                    field_text(row, "id").unwrap_or_else(|| name.to_string())
                ),
                kind: "meteorite".to_string(),
                name: name.to_string(),
                name_type: raw("nametype"),
                class: raw("recclass"),
                mass_g: field_num(row, "mass"),
                fall: raw("fall"),
                year,
                year_raw,
                reclat: field_num(row, "reclat"),
                reclong: field_num(row, "reclong"),
                geo: raw("geolocation"),
            })
        })
        .collect();
    out.sort_by_cached_key(|m| m.name.to_lowercase());
    out
}
