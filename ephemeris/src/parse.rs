//! Horizons response interpretation.
//!
//! Horizons answers HTTP 200 for most parameter-level problems and reports
//! them in an `error` field instead. The ephemeris itself is CSV text between
//! `$$SOE` and `$$EOE` inside the `result` string.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use shared::http::excerpt;
use shared::FetchError;
use thiserror::Error;

/// Characters of the result kept when the SOE/EOE block is missing.
const SNIPPET_LEN: usize = 1200;

#[derive(Error, Debug)]
pub enum HorizonsError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The requested start precedes the body's ephemeris coverage.
    #[error("start time precedes ephemeris coverage (earliest usable {earliest}): {message}")]
    StartTooEarly {
        earliest: NaiveDateTime,
        message: String,
    },

    #[error("Horizons API error for COMMAND={command}: {message}")]
    Api { command: i64, message: String },

    #[error("Horizons response missing `result` field for COMMAND={command}")]
    MissingResult { command: i64 },

    #[error("Horizons response missing $$SOE/$$EOE block; first part of response:\n{snippet}")]
    MissingBlock { snippet: String },

    #[error("parsed ephemeris contains {0} samples, expected at least 2")]
    TooFewSamples(usize),

    #[error("unsupported step size {0:?}; expected <n> d, h or m")]
    InvalidStep(String),
}

pub type HorizonsResult<T> = Result<T, HorizonsError>;

/// Parsed vectors plus the `signature` Horizons attached to them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorTable {
    /// Julian days
    pub t_jd: Vec<f64>,
    /// `[x, y, z, vx, vy, vz]` per sample, AU and AU/day
    pub pv: Vec<f64>,
    pub signature: Map<String, Value>,
}

impl VectorTable {
    pub fn len(&self) -> usize {
        self.t_jd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t_jd.is_empty()
    }

    /// Append the samples of `next` that come after the last one held.
    pub fn extend_after(&mut self, next: VectorTable) {
        if self.signature.is_empty() {
            self.signature = next.signature;
        }
        let skip = match self.t_jd.last() {
            Some(&last) => next.t_jd.iter().take_while(|&&t| t <= last + 1e-10).count(),
            None => 0,
        };
        self.t_jd.extend_from_slice(&next.t_jd[skip..]);
        self.pv.extend_from_slice(&next.pv[skip * 6..]);
    }
}

static EARLIEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"prior to A\.D\. (\d{4})-([A-Z]{3})-(\d{2}) (\d{2}):(\d{2}):(\d{2})(?:\.\d+)? UT")
        .expect("coverage pattern is valid")
});

fn month_number(abbrev: &str) -> u32 {
    const MONTHS: [&str; 12] = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];
    MONTHS
        .iter()
        .position(|m| *m == abbrev)
        .map_or(1, |i| i as u32 + 1)
}

/// First usable instant named by a "prior to A.D. ..." coverage error:
/// the reported instant with its fraction dropped, plus one second.
pub fn parse_earliest(message: &str) -> Option<NaiveDateTime> {
    let caps = EARLIEST_RE.captures(message)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month_number(caps.get(2)?.as_str()), num(3)?)?;
    let instant = date.and_hms_opt(num(4)?, num(5)?, num(6)?)?;
    Some(instant + TimeDelta::seconds(1))
}

/// Text between `$$SOE` and `$$EOE`.
pub fn extract_block(result: &str) -> HorizonsResult<&str> {
    match (result.find("$$SOE"), result.find("$$EOE")) {
        (Some(i0), Some(i1)) if i1 > i0 => {
            Ok(result[i0 + 5..i1].trim_matches(&['\r', '\n', ' '][..]))
        }
        _ => Err(HorizonsError::MissingBlock {
            snippet: excerpt(&result.replace('\r', ""), SNIPPET_LEN),
        }),
    }
}

fn parse_row(line: &str) -> Option<(f64, [f64; 6])> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    let (jd, state) = match parts.len() {
        n if n >= 8 => (parts[0], &parts[2..8]),
        7 => (parts[0], &parts[1..7]),
        _ => return None,
    };

    let jd = jd.parse::<f64>().ok()?;
    let mut values = [0.0; 6];
    for (slot, text) in values.iter_mut().zip(state) {
        *slot = text.parse::<f64>().ok()?;
    }
    Some((jd, values))
}

/// Parse a `VEC_TABLE=2` CSV block into packed arrays.
///
/// Rows are `JD, CAL, X, Y, Z, VX, VY, VZ` or, without the calendar column,
/// `JD, X, Y, Z, VX, VY, VZ`. Lines that do not start with a digit, short
/// rows and rows with unparsable numbers are skipped.
pub fn parse_vectors(block: &str) -> HorizonsResult<VectorTable> {
    let mut table = VectorTable::default();
    for raw in block.lines() {
        let line = raw.trim();
        if !line.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        if let Some((jd, state)) = parse_row(line) {
            table.t_jd.push(jd);
            table.pv.extend_from_slice(&state);
        }
    }

    if table.len() < 2 {
        return Err(HorizonsError::TooFewSamples(table.len()));
    }
    Ok(table)
}

fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Turn a Horizons JSON response into a [`VectorTable`].
pub fn interpret_response(command: i64, response: &Value) -> HorizonsResult<VectorTable> {
    if let Some(message) = response.get("error").and_then(error_text) {
        return Err(match parse_earliest(&message) {
            Some(earliest) => HorizonsError::StartTooEarly { earliest, message },
            None => HorizonsError::Api { command, message },
        });
    }

    let result = response
        .get("result")
        .and_then(Value::as_str)
        .ok_or(HorizonsError::MissingResult { command })?;

    let mut table = parse_vectors(extract_block(result)?)?;
    if let Some(Value::Object(signature)) = response.get("signature") {
        table.signature = signature.clone();
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::time::parse_horizons_time;

    const BLOCK: &str = "\
2443392.038888889, A.D. 1977-Sep-05 12:56:00.0000,  9.8E-01, 1.9E-01, 8.2E-02, -3.8E-03, 1.5E-02, 6.6E-03,
2443393.038888889, A.D. 1977-Sep-06 12:56:00.0000,  9.7E-01, 2.0E-01, 8.9E-02, -4.1E-03, 1.5E-02, 6.6E-03,
";

    #[test]
    fn test_parse_vectors_with_calendar_column() {
        let table = parse_vectors(BLOCK).unwrap();
        assert_eq!(table.t_jd.len(), 2);
        assert_eq!(table.pv.len(), 12);
        assert_eq!(table.pv[0], 9.8e-1);
        assert_eq!(table.pv[11], 6.6e-3);
    }

    #[test]
    fn test_parse_vectors_without_calendar_column() {
        let block = "2451545.0, 1, 2, 3, 4, 5, 6\n2451546.0, 7, 8, 9, 10, 11, 12\n";
        let table = parse_vectors(block).unwrap();
        assert_eq!(table.t_jd, vec![2451545.0, 2451546.0]);
        assert_eq!(table.pv[6..], [7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_parse_vectors_skips_noise() {
        let block = format!(
            "JDTDB, Calendar, X\n\n2451545.0, 1, 2\n2451545.5, cal, x, 2, 3, 4, 5, 6\n{BLOCK}"
        );
        let table = parse_vectors(&block).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.pv.len(), 6 * table.len());
    }

    #[test]
    fn test_parse_vectors_needs_two_samples() {
        let one = BLOCK.lines().next().unwrap();
        assert!(matches!(
            parse_vectors(one),
            Err(HorizonsError::TooFewSamples(1))
        ));
    }

    #[test]
    fn test_parse_earliest_adds_one_second() {
        let msg = "Cannot output ephemeris prior to A.D. 1977-SEP-05 14:01:47.1823 UT";
        assert_eq!(
            parse_earliest(msg),
            parse_horizons_time("1977-09-05 14:01:48")
        );
        assert_eq!(
            parse_earliest("No ephemeris prior to A.D. 2018-AUG-12 08:15:00 UT"),
            parse_horizons_time("2018-08-12 08:15:01")
        );
        assert_eq!(parse_earliest("Unknown target"), None);
    }

    #[test]
    fn test_missing_block_snippet_is_truncated() {
        let long = "x".repeat(2000);
        match extract_block(&long) {
            Err(HorizonsError::MissingBlock { snippet }) => {
                assert_eq!(snippet.chars().count(), 1201);
                assert!(snippet.ends_with('…'));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(extract_block("$$EOE then $$SOE").is_err());
    }

    #[test]
    fn test_interpret_response_errors() {
        let api = interpret_response(-31, &json!({"error": "No such object"}));
        assert!(matches!(api, Err(HorizonsError::Api { command: -31, .. })));

        let early = interpret_response(
            -32,
            &json!({"error": "... prior to A.D. 1977-AUG-20 15:32:32.1830 UT"}),
        );
        assert!(matches!(early, Err(HorizonsError::StartTooEarly { .. })));

        let missing = interpret_response(10, &json!({"signature": {}}));
        assert!(matches!(missing, Err(HorizonsError::MissingResult { command: 10 })));
    }

    #[test]
    fn test_interpret_response_keeps_signature() {
        let response = json!({
            "signature": {"source": "NASA/JPL Horizons API", "version": "1.2"},
            "result": format!("header\n$$SOE\n{BLOCK}$$EOE\nfooter"),
        });
        let table = interpret_response(-31, &response).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.signature["version"], "1.2");

        let unsigned = json!({"signature": "nope", "result": format!("$$SOE\n{BLOCK}$$EOE")});
        assert!(interpret_response(-31, &unsigned).unwrap().signature.is_empty());
    }

    #[test]
    fn test_extend_after_drops_seam_duplicates() {
        let mut merged = VectorTable {
            t_jd: vec![1.0, 2.0],
            pv: vec![0.0; 12],
            signature: Map::new(),
        };
        let next = VectorTable {
            t_jd: vec![2.0, 3.0, 4.0],
            pv: (0..18).map(f64::from).collect(),
            signature: Map::new(),
        };
        merged.extend_after(next);
        assert_eq!(merged.t_jd, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(merged.pv.len(), 24);
        assert_eq!(merged.pv[12], 6.0);
    }
}
