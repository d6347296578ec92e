//! Comets from the SBDB query API.

use std::collections::HashMap;
use std::thread;

use log::info;
use serde::Serialize;
use serde_json::{Map, Value};
use shared::numeric::{to_num, value_text};
use shared::Fetch;

use crate::sbdb::{CometFilter, Discovery, SbdbClient};
use crate::SmallBodyResult;

/// Fields requested for every comet.
pub const COMET_FIELDS: &str = "spkid,full_name,pdes,name,prefix,class,first_obs,last_obs,producer,diameter,extent,albedo,H,epoch_cal,e,a,q,i,om,w,tp_cal,per_y";

/// Fields requested while walking numbered comets for discovery lookups.
pub const NUMBERED_FIELDS: &str = "spkid,pdes,full_name";

/// SBDB refuses tiny pages gracefully but slowly; never go below this.
pub const MIN_PAGE_SIZE: usize = 100;

const DISCOVERY_NOTE: &str = "Discovery circumstances are only available via SBDB lookup for numbered comets (per SBDB API).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CometOptions {
    pub page_size: usize,
    pub enrich_discovery: bool,
    pub include_fragments: bool,
}

impl CometOptions {
    pub fn effective_page_size(&self) -> usize {
        self.page_size.max(MIN_PAGE_SIZE)
    }
}

impl Default for CometOptions {
    fn default() -> Self {
        Self {
            page_size: 5000,
            enrich_discovery: true,
            include_fragments: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrbitalElements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<f64>,
    #[serde(rename = "aAU", skip_serializing_if = "Option::is_none")]
    pub a_au: Option<f64>,
    #[serde(rename = "qAU", skip_serializing_if = "Option::is_none")]
    pub q_au: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub om_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_years: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comet {
    pub id: String,
    pub kind: String,
    pub spkid: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbit_class: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_obs: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_obs: Option<Value>,
    /// Producer of the orbit solution, not the discoverer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbit_producer: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diameter_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent_km: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub albedo: Option<f64>,
    #[serde(rename = "H", skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    pub elements: OrbitalElements,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery: Option<Discovery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_date: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovered_by: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_location: Option<Value>,
}

impl Comet {
    /// Build a comet from a query row; rows without `spkid` or `full_name`
    /// are rejected.
    pub fn from_row(row: &Map<String, Value>) -> Option<Self> {
        let spkid = row.get("spkid").and_then(value_text)?;
        let full_name = match row.get("full_name")? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let raw = |key: &str| row.get(key).filter(|v| !v.is_null()).cloned();
        let num = |key: &str| row.get(key).and_then(to_num);

        Some(Self {
            id: format!("sbdb:{spkid}"),
            kind: "comet".to_string(),
            spkid,
            full_name,
            pdes: raw("pdes"),
            name: raw("name"),
            prefix: raw("prefix"),
            orbit_class: raw("class"),
            first_obs: raw("first_obs"),
            last_obs: raw("last_obs"),
            orbit_producer: raw("producer"),
            diameter_km: num("diameter"),
            extent_km: raw("extent"),
            albedo: num("albedo"),
            h: num("H"),
            elements: OrbitalElements {
                epoch: raw("epoch_cal"),
                e: num("e"),
                a_au: num("a"),
                q_au: num("q"),
                i_deg: num("i"),
                om_deg: num("om"),
                w_deg: num("w"),
                tp: raw("tp_cal"),
                period_years: num("per_y"),
            },
            discovery: None,
            discovery_date: None,
            discovered_by: None,
            discovery_location: None,
        })
    }

    fn attach_discovery(&mut self, discovery: Discovery) {
        self.discovery_date = discovery.date.clone();
        self.discovered_by = discovery.who.clone();
        self.discovery_location = discovery.location.clone();
        self.discovery = Some(discovery);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiscoveryEnrichment {
    pub enabled: bool,
    pub attempted: usize,
    pub enriched: usize,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CometMeta {
    pub count: usize,
    pub sbdb_count_reported: i64,
    pub include_fragments: bool,
    pub discovery_enrichment: DiscoveryEnrichment,
}

/// Comets keyed by spkid; a later row for the same spkid replaces the
/// earlier one in place.
#[derive(Debug, Default)]
struct CometSet {
    comets: Vec<Comet>,
    index: HashMap<String, usize>,
}

impl CometSet {
    fn insert(&mut self, comet: Comet) {
        match self.index.get(&comet.spkid) {
            Some(&i) => self.comets[i] = comet,
            None => {
                self.index.insert(comet.spkid.clone(), self.comets.len());
                self.comets.push(comet);
            }
        }
    }

    fn get_mut(&mut self, spkid: &str) -> Option<&mut Comet> {
        let i = *self.index.get(spkid)?;
        self.comets.get_mut(i)
    }
}

/// Walk `filter`'s query pages, calling `visit` on each row, until a short
/// or empty page.
fn for_each_row<F: Fetch>(
    client: &SbdbClient<F>,
    filter: CometFilter,
    fields: &str,
    page_size: usize,
    mut visit: impl FnMut(&Map<String, Value>),
) -> SmallBodyResult<()> {
    let mut offset = 0;
    loop {
        let page = client.page(filter, fields, page_size, offset)?;
        if page.is_empty() {
            return Ok(());
        }
        for row in page.rows() {
            visit(&row);
        }
        offset += page.data.len();
        if page.data.len() < page_size {
            return Ok(());
        }
    }
}

/// Every comet, sorted by lowercase full name, plus run statistics.
///
/// # Errors
///
/// Fails when the count or a page query fails. Discovery lookups never fail
/// the run.
pub fn fetch_comets<F: Fetch>(
    client: &SbdbClient<F>,
    options: &CometOptions,
) -> SmallBodyResult<(Vec<Comet>, CometMeta)> {
    let page_size = options.effective_page_size();
    let filter = CometFilter {
        include_fragments: options.include_fragments,
        numbered_only: false,
    };

    let total = client.count(filter)?;
    info!("SBDB reports {total} comets");

    let mut set = CometSet::default();
    for_each_row(client, filter, COMET_FIELDS, page_size, |row| {
        if let Some(comet) = Comet::from_row(row) {
            set.insert(comet);
        }
    })?;
    info!("Fetched {} comets", set.comets.len());

    let mut attempted = 0;
    let mut enriched = 0;
    if options.enrich_discovery {
        let numbered = CometFilter {
            numbered_only: true,
            ..filter
        };
        let delay = client.lookup_delay();
        for_each_row(client, numbered, NUMBERED_FIELDS, page_size, |row| {
            let spkid = row.get("spkid").and_then(value_text);
            let pdes = row.get("pdes").and_then(value_text);
            let (Some(spkid), Some(pdes)) = (spkid, pdes) else {
                return;
            };
            attempted += 1;
            if let Some(discovery) = client.discovery(&pdes) {
                if let Some(comet) = set.get_mut(&spkid) {
                    comet.attach_discovery(discovery);
                    enriched += 1;
                }
            }
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        })?;
        info!("Discovery circumstances: {enriched}/{attempted} numbered comets enriched");
    }

    let mut comets = set.comets;
    comets.sort_by_cached_key(|c| c.full_name.to_lowercase());

    let meta = CometMeta {
        count: comets.len(),
        sbdb_count_reported: total,
        include_fragments: options.include_fragments,
        discovery_enrichment: DiscoveryEnrichment {
            enabled: options.enrich_discovery,
            attempted,
            enriched,
            note: DISCOVERY_NOTE.to_string(),
        },
    };
    Ok((comets, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_comet_from_row() {
        let comet = Comet::from_row(&row(json!({
            "spkid": " 1000036 ", "full_name": "  1P/Halley", "pdes": "1P",
            "name": "Halley", "prefix": "P", "class": "HTC", "producer": "Otto Matic",
            "diameter": "11", "albedo": null, "H": "", "e": "0.967", "a": "17.9",
            "epoch_cal": "1994-02-17", "tp_cal": null, "per_y": "75.3", "extent": "16x8x8"
        })))
        .unwrap();

        assert_eq!(comet.id, "sbdb:1000036");
        assert_eq!(comet.full_name, "  1P/Halley");
        assert_eq!(comet.diameter_km, Some(11.0));
        assert_eq!(comet.albedo, None);
        assert_eq!(comet.h, None);
        assert_eq!(comet.extent_km, Some(json!("16x8x8")));

        let value = serde_json::to_value(&comet).unwrap();
        assert_eq!(value["orbitClass"], "HTC");
        assert_eq!(value["orbitProducer"], "Otto Matic");
        assert_eq!(value["elements"], json!({"epoch": "1994-02-17", "e": 0.967, "aAU": 17.9, "periodYears": 75.3}));
        assert!(value.get("H").is_none());
        assert!(value.get("discovery").is_none());
    }

    #[test]
    fn test_rows_without_identity_are_rejected() {
        assert!(Comet::from_row(&row(json!({"spkid": "1", "full_name": ""}))).is_none());
        assert!(Comet::from_row(&row(json!({"spkid": "", "full_name": "X"}))).is_none());
        assert!(Comet::from_row(&row(json!({"full_name": "X"}))).is_none());
    }

    #[test]
    fn test_page_size_floor() {
        let options = CometOptions {
            page_size: 10,
            ..CometOptions::default()
        };
        assert_eq!(options.effective_page_size(), 100);
        assert_eq!(CometOptions::default().effective_page_size(), 5000);
    }

    #[test]
    fn test_duplicate_spkid_replaced_in_place() {
        let mut set = CometSet::default();
        for (spkid, name) in [("1", "A"), ("2", "B"), ("1", "C")] {
            set.insert(Comet::from_row(&row(json!({"spkid": spkid, "full_name": name}))).unwrap());
        }
        let names: Vec<&str> = set.comets.iter().map(|c| c.full_name.as_str()).collect();
        assert_eq!(names, vec!["C", "B"]);
    }
}
