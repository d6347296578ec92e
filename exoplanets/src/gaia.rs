//! Gaia DR3 astrometry lookups.
//!
//! Enrichment only: a chunk that fails is logged and skipped, and the catalog
//! is built from whatever resolved. The TAP service sometimes answers 200 with
//! an HTML maintenance page; such chunks are asked again before giving up.

use std::collections::HashMap;

use log::{info, warn};
use serde_json::Value;
use shared::numeric::to_num;
use shared::{query, Fetch, RetryPolicy};

use crate::archive::{ArchiveError, ArchiveResult};

pub const GAIA_TAP_SYNC_URL: &str = "https://gea.esac.esa.int/tap-server/tap/sync";

/// Source ids per ADQL `IN (...)` query.
pub const DEFAULT_CHUNK_SIZE: usize = 1200;

/// Position (degrees) and parallax (mas) of one Gaia source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Astrometry {
    pub ra: f64,
    pub dec: f64,
    pub parallax: Option<f64>,
}

pub type AstrometryMap = HashMap<String, Astrometry>;

/// Gaia DR3 `source_id` as a digit-only string.
pub fn normalize_gaia_id(value: &Value) -> Option<String> {
    let digits = match value {
        Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(u), _, _) => u.to_string(),
            (_, Some(i), _) => i.to_string(),
            (_, _, Some(f)) if f.is_finite() => format!("{}", f.trunc() as i64),
            _ => return None,
        },
        // "Gaia DR3 4472832130942575872": the id is the last digit run
        Value::String(s) => s
            .rsplit(|c: char| !c.is_ascii_digit())
            .find(|run| !run.is_empty())
            .unwrap_or_default()
            .to_string(),
        _ => return None,
    };
    (!digits.is_empty()).then_some(digits)
}

/// Parse a Gaia TAP CSV answer. Comment and blank lines are ignored; the
/// header must name `source_id`. Rows without RA or Dec are dropped.
pub fn parse_gaia_csv(text: &str) -> ArchiveResult<Vec<(String, Astrometry)>> {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .collect();
    match lines.first() {
        Some(header) if header.contains("source_id") => {}
        _ => return Err(ArchiveError::GaiaFormat("missing source_id header".to_string())),
    }

    let body = lines.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| ArchiveError::GaiaFormat(e.to_string()))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (Some(id_col), Some(ra_col), Some(dec_col)) =
        (column("source_id"), column("ra"), column("dec"))
    else {
        return Err(ArchiveError::GaiaFormat(format!("unexpected header {headers:?}")));
    };
    let plx_col = column("parallax");

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ArchiveError::GaiaFormat(e.to_string()))?;
        let cell = |i: usize| Value::String(record.get(i).unwrap_or("").to_string());

        let Some(id) = normalize_gaia_id(&cell(id_col)) else {
            continue;
        };
        let (Some(ra), Some(dec)) = (to_num(&cell(ra_col)), to_num(&cell(dec_col))) else {
            continue;
        };
        let parallax = plx_col.and_then(|i| to_num(&cell(i)));
        out.push((id, Astrometry { ra, dec, parallax }));
    }
    Ok(out)
}

pub fn gaia_query(ids: &[String]) -> String {
    format!(
        "SELECT source_id, ra, dec, parallax FROM gaiadr3.gaia_source WHERE source_id IN ({})",
        ids.join(",")
    )
}

/// One chunk: POST the ADQL query, re-asking while the body is not Gaia CSV.
///
/// Fetch errors are final here; the client's own policy already retried them.
fn fetch_chunk<F: Fetch>(
    fetch: &F,
    form: &[(String, String)],
    retry: &RetryPolicy,
) -> ArchiveResult<Vec<(String, Astrometry)>> {
    let attempts = retry.total_attempts();
    let mut n = 0;
    loop {
        let text = fetch.post_form(GAIA_TAP_SYNC_URL, form)?;
        match parse_gaia_csv(&text) {
            Ok(rows) => return Ok(rows),
            Err(e) if n + 1 >= attempts => return Err(e),
            Err(e) => {
                let delay = retry.delay(n);
                warn!(
                    "Gaia answer unreadable (attempt {}/{attempts}): {e}; retrying in {:.1}s",
                    n + 1,
                    delay.as_secs_f64()
                );
                std::thread::sleep(delay);
                n += 1;
            }
        }
    }
}

/// Astrometry for `ids`, queried in chunks of `chunk_size`.
pub fn fetch_astrometry<F: Fetch>(
    fetch: &F,
    ids: &[String],
    chunk_size: usize,
    retry: &RetryPolicy,
) -> AstrometryMap {
    let mut out = AstrometryMap::new();
    let ids: Vec<String> = ids.iter().filter(|id| !id.is_empty()).cloned().collect();
    let chunks: Vec<&[String]> = ids.chunks(chunk_size.max(1)).collect();

    for (n, part) in chunks.iter().enumerate() {
        let form = query(&[
            ("REQUEST", "doQuery".to_string()),
            ("LANG", "ADQL".to_string()),
            ("FORMAT", "csv".to_string()),
            ("QUERY", gaia_query(part)),
        ]);

        match fetch_chunk(fetch, &form, retry) {
            Ok(rows) => out.extend(rows),
            Err(e) => warn!(
                "Gaia chunk {}/{} ({} ids) skipped: {e}",
                n + 1,
                chunks.len(),
                part.len()
            ),
        }
    }

    info!("Gaia astrometry resolved for {}/{} sources", out.len(), ids.len());
    out
}
