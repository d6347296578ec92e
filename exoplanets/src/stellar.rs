//! Per-system star lists from the `stellarhosts` table.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use shared::numeric::{field_num, field_text};

use crate::gaia::normalize_gaia_id;

/// Stars of multi-star systems, keyed for ingestion.
#[derive(Debug, Clone, Default)]
pub struct StellarMaps {
    /// `sy_name` to deduplicated stellarhosts rows, first-seen order
    pub stars_by_system: HashMap<String, Vec<Value>>,
    /// `hostname` to `sy_name`
    pub host_to_system: HashMap<String, String>,
    /// Unique Gaia DR3 ids in first-seen order
    pub gaia_ids: Vec<String>,
}

/// How much physical data a row carries; the richer row wins a duplicate.
pub fn star_row_score(row: &Value) -> u32 {
    let present = |key: &str| field_num(row, key).is_some();
    let mut score = 0;
    if row.get("gaia_dr3_id").and_then(normalize_gaia_id).is_some() {
        score += 6;
    }
    if present("st_rad") {
        score += 4;
    }
    if present("st_teff") {
        score += 3;
    }
    if present("st_lum") {
        score += 2;
    }
    if present("st_mass") {
        score += 2;
    }
    if field_text(row, "st_spectype").is_some() {
        score += 1;
    }
    score
}

impl StellarMaps {
    /// Group rows by `sy_name`, deduplicating stars by Gaia id (or lowercase
    /// hostname when there is none) and keeping the highest-scoring row.
    pub fn build(rows: &[Value]) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut buckets: HashMap<String, Vec<(String, u32, Value)>> = HashMap::new();
        let mut host_to_system = HashMap::new();

        for row in rows.iter().filter(|r| r.is_object()) {
            let Some(system) = field_text(row, "sy_name") else {
                continue;
            };
            let host = field_text(row, "hostname");
            if let Some(host) = &host {
                host_to_system.insert(host.clone(), system.clone());
            }

            let key = row
                .get("gaia_dr3_id")
                .and_then(normalize_gaia_id)
                .or_else(|| host.as_ref().map(|h| h.to_lowercase()));
            let Some(key) = key else {
                continue;
            };

            let score = star_row_score(row);
            let bucket = buckets.entry(system.clone()).or_insert_with(|| {
                order.push(system.clone());
                Vec::new()
            });
            match bucket.iter_mut().find(|(k, _, _)| *k == key) {
                Some(entry) if score > entry.1 => {
                    entry.1 = score;
                    entry.2 = row.clone();
                }
                Some(_) => {}
                None => bucket.push((key, score, row.clone())),
            }
        }

        let mut gaia_ids = Vec::new();
        let mut seen = HashSet::new();
        let mut stars_by_system = HashMap::new();
        for system in order {
            let rows: Vec<Value> = buckets
                .remove(&system)
                .unwrap_or_default()
                .into_iter()
                .map(|(_, _, row)| row)
                .collect();
            for row in &rows {
                if let Some(id) = row.get("gaia_dr3_id").and_then(normalize_gaia_id) {
                    if seen.insert(id.clone()) {
                        gaia_ids.push(id);
                    }
                }
            }
            stars_by_system.insert(system, rows);
        }

        Self {
            stars_by_system,
            host_to_system,
            gaia_ids,
        }
    }

    /// System key a `ps` row belongs to.
    pub fn system_for<'a>(&'a self, host: &'a str) -> &'a str {
        self.host_to_system
            .get(host)
            .map_or(host, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_prefers_rich_rows() {
        assert_eq!(star_row_score(&json!({})), 0);
        assert_eq!(
            star_row_score(&json!({
                "gaia_dr3_id": "Gaia DR3 1", "st_rad": 1.0, "st_teff": 5000,
                "st_lum": 0.1, "st_mass": "1.0", "st_spectype": "G2 V"
            })),
            18
        );
        assert_eq!(star_row_score(&json!({"st_spectype": "  "})), 0);
    }

    #[test]
    fn test_build_dedupes_and_keeps_best_row() {
        let rows = vec![
            json!({"sy_name": "alf Cen", "hostname": "alf Cen A", "gaia_dr3_id": null}),
            json!({"sy_name": "alf Cen", "hostname": "ALF CEN A", "st_rad": 1.2, "st_teff": 5790}),
            json!({"sy_name": "alf Cen", "hostname": "alf Cen B", "gaia_dr3_id": "Gaia DR3 77", "st_rad": 0.86}),
            json!({"sy_name": "GJ 65", "hostname": "GJ 65 A", "gaia_dr3_id": "Gaia DR3 5"}),
            json!({"sy_name": "GJ 65", "hostname": "GJ 65 B", "gaia_dr3_id": "Gaia DR3 77"}),
            json!({"sy_name": "", "hostname": "orphan"}),
        ];
        let maps = StellarMaps::build(&rows);

        let alf = &maps.stars_by_system["alf Cen"];
        assert_eq!(alf.len(), 2);
        assert_eq!(alf[0]["hostname"], "ALF CEN A");
        assert_eq!(alf[1]["hostname"], "alf Cen B");

        assert_eq!(maps.gaia_ids, vec!["77", "5"]);
        assert_eq!(maps.system_for("GJ 65 B"), "GJ 65");
        assert_eq!(maps.system_for("unknown"), "unknown");
        assert!(!maps.host_to_system.contains_key("orphan"));
    }

    #[test]
    fn test_ties_keep_first_row() {
        let rows = vec![
            json!({"sy_name": "S", "hostname": "S A", "st_teff": 4000, "tag": 1}),
            json!({"sy_name": "S", "hostname": "s a", "st_teff": 4100, "tag": 2}),
        ];
        let maps = StellarMaps::build(&rows);
        assert_eq!(maps.stars_by_system["S"][0]["tag"], 1);
    }
}
