//! CSV/TSV to JSON conversion.
//!
//! Some NASA endpoints answer with delimited text unless asked for JSON. The
//! converter turns such a file into an array of objects keyed by the header
//! row, keeping every value as a string.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::output::{write_json_atomic, JsonStyle, OutputError};

/// Bytes inspected when guessing the delimiter.
const SNIFF_LEN: usize = 8192;

#[derive(Error, Debug)]
pub enum TabularError {
    #[error("input is empty")]
    Empty,

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited text: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type TabularResult<T> = Result<T, TabularError>;

/// Tab when tabs appear and are at least as common as commas, else comma.
pub fn sniff_delimiter(sample: &str) -> u8 {
    let tabs = sample.matches('\t').count();
    let commas = sample.matches(',').count();
    if tabs > 0 && tabs >= commas {
        b'\t'
    } else {
        b','
    }
}

fn sample_of(text: &str) -> &str {
    let mut end = text.len().min(SNIFF_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Parse delimited text into header-keyed rows.
///
/// Short rows get `null` for their missing columns; surplus columns are dropped.
pub fn convert_delimited(text: &str) -> TabularResult<Vec<Map<String, Value>>> {
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err(TabularError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(sample_of(text)))
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = record
                    .get(i)
                    .map(|v| Value::String(v.to_string()))
                    .unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Convert the delimited file `input` into a compact JSON array at `output`.
///
/// Returns the number of rows written.
pub fn convert_file(input: &Path, output: &Path) -> TabularResult<usize> {
    let bytes = std::fs::read(input).map_err(|source| TabularError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let rows = convert_delimited(&text)?;
    write_json_atomic(output, &rows, JsonStyle::Compact)?;
    Ok(rows.len())
}
