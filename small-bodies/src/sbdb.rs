//! JPL Small-Body Database query and lookup APIs.

use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use shared::numeric::to_int;
use shared::{query, Fetch};

use crate::{SmallBodyError, SmallBodyResult};

pub const SBDB_QUERY_URL: &str = "https://ssd-api.jpl.nasa.gov/sbdb_query.api";
pub const SBDB_LOOKUP_URL: &str = "https://ssd-api.jpl.nasa.gov/sbdb.api";

/// Pause between single-object lookups.
pub const DEFAULT_LOOKUP_DELAY: Duration = Duration::from_millis(50);

/// Which comets a query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CometFilter {
    pub include_fragments: bool,
    pub numbered_only: bool,
}

impl CometFilter {
    fn params(&self) -> Vec<(&'static str, String)> {
        // sb-xfrag=1 excludes fragments
        let xfrag = if self.include_fragments { "0" } else { "1" };
        let mut params = vec![("sb-kind", "c".to_string()), ("sb-xfrag", xfrag.to_string())];
        if self.numbered_only {
            params.push(("sb-ns", "n".to_string()));
        }
        params
    }
}

/// One page of a field-list query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub fields: Vec<String>,
    pub data: Vec<Vec<Value>>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() || self.data.is_empty()
    }

    /// Rows keyed by field name; short rows are padded with null.
    pub fn rows(&self) -> Vec<Map<String, Value>> {
        self.data
            .iter()
            .map(|row| {
                self.fields
                    .iter()
                    .enumerate()
                    .map(|(i, field)| (field.clone(), row.get(i).cloned().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect()
    }

    fn from_response(response: &Value) -> Self {
        let (Some(fields), Some(data)) = (
            response.get("fields").and_then(Value::as_array),
            response.get("data").and_then(Value::as_array),
        ) else {
            return Self::default();
        };
        Self {
            fields: fields
                .iter()
                .map(|f| match f {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            data: data
                .iter()
                .filter_map(Value::as_array)
                .cloned()
                .collect(),
        }
    }
}

/// Discovery circumstances from an SBDB lookup.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Discovery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub who: Option<Value>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<Value>,
}

impl Discovery {
    fn from_response(discovery: &Map<String, Value>) -> Option<Self> {
        let keep = |key: &str| {
            discovery.get(key).filter(|v| !is_blank(v)).cloned()
        };
        let found = Self {
            date: keep("date"),
            location: keep("location"),
            site: keep("site"),
            who: keep("who"),
            reference: keep("ref"),
        };
        (found != Self::default()).then_some(found)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Client for the SBDB query and lookup endpoints.
#[derive(Debug, Clone)]
pub struct SbdbClient<F> {
    fetch: F,
    query_url: String,
    lookup_url: String,
    lookup_delay: Duration,
}

impl<F: Fetch> SbdbClient<F> {
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            query_url: SBDB_QUERY_URL.to_string(),
            lookup_url: SBDB_LOOKUP_URL.to_string(),
            lookup_delay: DEFAULT_LOOKUP_DELAY,
        }
    }

    pub fn with_lookup_delay(mut self, lookup_delay: Duration) -> Self {
        self.lookup_delay = lookup_delay;
        self
    }

    pub fn lookup_delay(&self) -> Duration {
        self.lookup_delay
    }

    /// Number of comets matching `filter`, as SBDB reports it. A missing
    /// `count` reads as zero.
    pub fn count(&self, filter: CometFilter) -> SmallBodyResult<i64> {
        let response = self.fetch.get_json(&self.query_url, &query(&filter.params()))?;
        if !response.is_object() {
            return Err(SmallBodyError::Shape {
                url: self.query_url.clone(),
                message: "count response is not an object".to_string(),
            });
        }
        Ok(response.get("count").and_then(to_int).unwrap_or(0))
    }

    /// `limit` rows of `fields` starting at row `from`, sorted by id.
    pub fn page(
        &self,
        filter: CometFilter,
        fields: &str,
        limit: usize,
        from: usize,
    ) -> SmallBodyResult<Page> {
        let mut params = vec![("fields", fields.to_string())];
        params.extend(filter.params());
        params.extend([
            ("limit", limit.to_string()),
            ("limit-from", from.to_string()),
            ("sort", "id".to_string()),
            ("full-prec", "0".to_string()),
        ]);
        debug!("SBDB page fields={fields} limit={limit} from={from}");
        let response = self.fetch.get_json(&self.query_url, &query(&params))?;
        Ok(Page::from_response(&response))
    }

    /// Discovery circumstances for designation `des`; `None` when SBDB has
    /// none or the lookup fails.
    pub fn discovery(&self, des: &str) -> Option<Discovery> {
        let params = query(&[("des", des), ("discovery", "1")]);
        match self.fetch.get_json(&self.lookup_url, &params) {
            Ok(response) => response
                .get("discovery")
                .and_then(Value::as_object)
                .and_then(Discovery::from_response),
            Err(e) => {
                warn!("SBDB discovery lookup for {des} failed: {e}");
                None
            }
        }
    }
}
