//! Exoplanet catalog documents and row ingestion.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;
use shared::numeric::{field_num, field_text, to_int};

use crate::gaia::{normalize_gaia_id, AstrometryMap};
use crate::names::{beautify_system_name, build_system_aliases, format_exoplanet_display_name};
use crate::physics::{estimate_radius_lum, lum_from_log10, projected_pos_au, TSUN_K};
use crate::stellar::StellarMaps;

pub const SOURCE_NAME: &str = "NASA Exoplanet Archive";

/// Fallback distance when neither the archive nor Gaia gives one, pc.
const DEFAULT_DISTANCE_PC: f64 = 10.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GaiaEnrichment {
    pub enabled: bool,
    pub unique_source_ids: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMeta {
    pub source: String,
    pub generated_at: String,
    pub ps_maxrec: u32,
    pub stellar_hosts_maxrec: u32,
    pub ps_url: String,
    pub stellar_hosts_url: String,
    pub dataset_version: String,
    pub gaia_enrichment: GaiaEnrichment,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Catalog {
    pub meta: CatalogMeta,
    pub systems: Vec<System>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CatalogFlags {
    pub cb: bool,
    pub pul: bool,
    pub ptv: bool,
    pub etv: bool,
    pub sy_snum: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DetectionFlags {
    pub cb: bool,
    pub pul: bool,
    pub ptv: bool,
    pub etv: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Star {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_k: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaia_dr3_id: Option<String>,
    #[serde(rename = "posAU", skip_serializing_if = "Option::is_none")]
    pub pos_au: Option<[f64; 3]>,
    #[serde(rename = "orbitAU", skip_serializing_if = "Option::is_none")]
    pub orbit_au: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    pub name: String,
    #[serde(rename = "aAU")]
    pub a_au: f64,
    pub period_days: f64,
    pub radius_earth: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass_earth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insol: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq_temp_k: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circumbinary: Option<bool>,
    pub detection_flags: DetectionFlags,
    pub spin_period_hours: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub category: String,
    pub name: String,
    pub primary_name: String,
    pub sy_name: String,
    pub raw_name: String,
    pub aliases: BTreeSet<String>,
    /// `true` or `null`, never `false`
    pub circumbinary: Option<bool>,
    pub catalog_flags: CatalogFlags,
    pub discovery_methods: Vec<String>,
    pub notes: String,
    #[serde(rename = "__source")]
    pub source: String,
    #[serde(rename = "__datasetVersion")]
    pub dataset_version: String,
    #[serde(rename = "__retrievedAt")]
    pub retrieved_at: String,
    pub stars: Vec<Star>,
    pub planets: Vec<Planet>,
}

/// Everything ingestion needs besides the rows themselves.
#[derive(Debug, Clone)]
pub struct IngestContext<'a> {
    pub stellar: &'a StellarMaps,
    pub gaia: &'a AstrometryMap,
    pub planet_cap: usize,
    pub source_label: &'a str,
    pub retrieved_at: &'a str,
}

fn flag(row: &Value, key: &str) -> bool {
    field_num(row, key) == Some(1.0)
}

fn log_lum(row: &Value) -> Option<f64> {
    lum_from_log10(field_num(row, "st_lum"))
}

fn category(row: &Value) -> &'static str {
    let spectral = field_text(row, "st_spectype")
        .unwrap_or_default()
        .to_uppercase();
    if flag(row, "pul_flag") || flag(row, "ptv_flag") || flag(row, "etv_flag") || spectral.contains("WD") {
        return "Miscellaneous";
    }
    match row.get("sy_snum").and_then(to_int) {
        Some(2) => "Binary stars",
        Some(n) if n >= 3 => "Multi stars",
        _ => "Single star",
    }
}

fn star_from_host_row(row: &Value, name: String) -> Star {
    let teff = field_num(row, "st_teff");
    let (radius, lum) = estimate_radius_lum(
        teff,
        field_num(row, "st_rad"),
        log_lum(row),
        field_num(row, "st_mass"),
    );
    Star {
        name,
        kind: "star".to_string(),
        mass: field_num(row, "st_mass"),
        radius,
        temp_k: teff,
        lum,
        gaia_dr3_id: row.get("gaia_dr3_id").and_then(normalize_gaia_id),
        pos_au: None,
        orbit_au: None,
    }
}

/// Stars of a multi-star system from its stellarhosts rows, planet host first.
fn stars_from_stellar_rows(
    host: &str,
    ps_row: &Value,
    rows: &[Value],
    gaia: &AstrometryMap,
) -> Vec<Star> {
    let hostname = |r: &Value| field_text(r, "hostname").unwrap_or_default();
    let mut sorted: Vec<&Value> = rows.iter().collect();
    sorted.sort_by_key(|r| {
        let name = hostname(*r);
        (name.to_lowercase() != host.to_lowercase(), name)
    });

    let Some(primary_row) = sorted.first() else {
        return Vec::new();
    };

    let primary_id = primary_row.get("gaia_dr3_id").and_then(normalize_gaia_id);
    let primary_ast = primary_id.as_ref().and_then(|id| gaia.get(id));

    let mut dist_pc = field_num(ps_row, "sy_dist").or_else(|| field_num(primary_row, "sy_dist"));
    if dist_pc.map_or(true, |d| d <= 0.0) {
        if let Some(plx) = primary_ast.and_then(|a| a.parallax).filter(|p| *p > 0.0) {
            dist_pc = Some(1000.0 / plx);
        }
    }
    let dist_pc = dist_pc
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(DEFAULT_DISTANCE_PC);

    sorted
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let name = match hostname(*row) {
                n if !n.is_empty() => n,
                _ if idx == 0 => host.to_string(),
                _ => format!("{host} companion {}", idx + 1),
            };
            let mut star = star_from_host_row(row, beautify_system_name(&name));

            let own = star.gaia_dr3_id.as_ref().and_then(|id| gaia.get(id));
            if let (Some(primary), Some(own)) = (primary_ast, own) {
                if idx == 0 {
                    star.pos_au = Some([0.0, 0.0, 0.0]);
                } else {
                    let pos =
                        projected_pos_au((primary.ra, primary.dec), (own.ra, own.dec), dist_pc);
                    star.orbit_au = Some(pos[0].hypot(pos[2]));
                    star.pos_au = Some(pos);
                }
            }
            star
        })
        .collect()
}

/// The lone star of a system the stellarhosts table does not list.
fn star_from_ps_row(host: &str, row: &Value) -> Star {
    let teff = field_num(row, "st_teff");
    let mass = field_num(row, "st_mass");
    let (radius, lum) = estimate_radius_lum(teff, field_num(row, "st_rad"), log_lum(row), mass);
    Star {
        name: beautify_system_name(host),
        kind: "star".to_string(),
        mass: Some(mass.unwrap_or(1.0)),
        radius: Some(radius.unwrap_or(1.0)),
        temp_k: Some(teff.unwrap_or(TSUN_K)),
        lum,
        gaia_dr3_id: None,
        pos_au: None,
        orbit_au: None,
    }
}

fn new_system(key: &str, host: &str, row: &Value, ctx: &IngestContext<'_>) -> System {
    let pretty = beautify_system_name(key);
    let stars = match ctx.stellar.stars_by_system.get(key) {
        Some(rows) if !rows.is_empty() => stars_from_stellar_rows(host, row, rows, ctx.gaia),
        _ => vec![star_from_ps_row(host, row)],
    };
    let sy_snum = row.get("sy_snum").and_then(to_int);
    let cb = flag(row, "cb_flag");

    System {
        category: category(row).to_string(),
        name: pretty.clone(),
        primary_name: pretty.clone(),
        sy_name: key.to_string(),
        raw_name: key.to_string(),
        aliases: build_system_aliases(key, &pretty),
        circumbinary: cb.then_some(true),
        catalog_flags: CatalogFlags {
            cb,
            pul: flag(row, "pul_flag"),
            ptv: flag(row, "ptv_flag"),
            etv: flag(row, "etv_flag"),
            sy_snum,
        },
        discovery_methods: Vec::new(),
        notes: format!(
            "Loaded from {SOURCE_NAME} ({}). Stars: {} (catalog); planets: truncated to first {} for performance.",
            ctx.source_label,
            sy_snum.map_or_else(|| stars.len().to_string(), |n| n.to_string()),
            ctx.planet_cap
        ),
        source: SOURCE_NAME.to_string(),
        dataset_version: ctx.source_label.to_string(),
        retrieved_at: ctx.retrieved_at.to_string(),
        stars,
        planets: Vec::new(),
    }
}

fn planet_from_row(host: &str, row: &Value, a_au: f64, period_days: f64) -> Planet {
    let flags = DetectionFlags {
        cb: flag(row, "cb_flag"),
        pul: flag(row, "pul_flag"),
        ptv: flag(row, "ptv_flag"),
        etv: flag(row, "etv_flag"),
    };
    Planet {
        name: format_exoplanet_display_name(
            host,
            row.get("pl_name").and_then(Value::as_str),
            row.get("pl_letter").and_then(Value::as_str),
        ),
        a_au,
        period_days,
        radius_earth: field_num(row, "pl_rade").unwrap_or(1.0),
        mass_earth: field_num(row, "pl_bmasse"),
        density: field_num(row, "pl_dens"),
        insol: field_num(row, "pl_insol"),
        eq_temp_k: field_num(row, "pl_eqt"),
        discovery_method: field_text(row, "discoverymethod"),
        discovery_year: field_num(row, "disc_year").map(|y| y as i64),
        circumbinary: flags.cb.then_some(true),
        detection_flags: flags,
        spin_period_hours: period_days * 24.0,
    }
}

/// Fold `ps` rows into systems, in first-seen order.
///
/// The first row of a system sets its category and stars. Every row may add
/// a planet (up to the cap, and only with both semi-major axis and period),
/// a discovery method, and detection flags.
pub fn ingest_rows(rows: &[Value], ctx: &IngestContext<'_>) -> Vec<System> {
    let mut systems: Vec<System> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows.iter().filter(|r| r.is_object()) {
        let Some(host) = field_text(row, "hostname").or_else(|| field_text(row, "pl_hostname"))
        else {
            continue;
        };
        let key = ctx.stellar.system_for(&host).to_string();

        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                systems.push(new_system(&key, &host, row, ctx));
                index.insert(key, systems.len() - 1);
                systems.len() - 1
            }
        };
        let system = &mut systems[slot];

        if system.planets.len() >= ctx.planet_cap {
            continue;
        }
        let (Some(a_au), Some(period)) = (field_num(row, "pl_orbsmax"), field_num(row, "pl_orbper"))
        else {
            continue;
        };

        let planet = planet_from_row(&host, row, a_au, period);
        let flags = &planet.detection_flags;
        if flags.cb {
            system.circumbinary = Some(true);
            system.catalog_flags.cb = true;
        }
        system.catalog_flags.pul |= flags.pul;
        system.catalog_flags.ptv |= flags.ptv;
        system.catalog_flags.etv |= flags.etv;

        if let Some(method) = &planet.discovery_method {
            if !system.discovery_methods.contains(method) {
                system.discovery_methods.push(method.clone());
            }
        }
        system.planets.push(planet);
    }

    systems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaia::Astrometry;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn ctx<'a>(stellar: &'a StellarMaps, gaia: &'a AstrometryMap, cap: usize) -> IngestContext<'a> {
        IngestContext {
            stellar,
            gaia,
            planet_cap: cap,
            source_label: "TAP/ps default_flag maxrec 10",
            retrieved_at: "2024-01-01T00:00:00.000000Z",
        }
    }

    fn planet_row(host: &str, letter: &str) -> Value {
        json!({
            "hostname": host, "pl_letter": letter, "sy_snum": 1,
            "pl_orbsmax": 0.05, "pl_orbper": 4.2, "discoverymethod": "Radial Velocity",
            "st_teff": 5800, "st_lum": 0.0, "st_mass": 1.1
        })
    }

    #[test]
    fn test_single_star_system_from_ps_row() {
        let stellar = StellarMaps::default();
        let gaia = AstrometryMap::new();
        let rows = vec![planet_row("51 Peg", "b")];
        let systems = ingest_rows(&rows, &ctx(&stellar, &gaia, 16));

        assert_eq!(systems.len(), 1);
        let sys = &systems[0];
        assert_eq!(sys.name, "51 Pegasi");
        assert_eq!(sys.raw_name, "51 Peg");
        assert_eq!(sys.category, "Single star");
        assert_eq!(sys.circumbinary, None);
        assert_eq!(sys.stars.len(), 1);
        assert_eq!(sys.stars[0].mass, Some(1.1));
        assert_relative_eq!(sys.stars[0].lum.unwrap(), 1.0);
        assert_eq!(sys.planets[0].name, "51 Pegasi b");
        assert_relative_eq!(sys.planets[0].spin_period_hours, 4.2 * 24.0);
        assert_eq!(sys.planets[0].radius_earth, 1.0);
    }

    #[test]
    fn test_planet_cap_and_orbit_requirements() {
        let stellar = StellarMaps::default();
        let gaia = AstrometryMap::new();
        let mut no_orbit = planet_row("K", "z");
        no_orbit["pl_orbsmax"] = Value::Null;
        let rows = vec![
            no_orbit,
            planet_row("K", "b"),
            planet_row("K", "c"),
            planet_row("K", "d"),
        ];
        let systems = ingest_rows(&rows, &ctx(&stellar, &gaia, 2));

        let names: Vec<&str> = systems[0].planets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["K b", "K c"]);
        assert_eq!(systems[0].discovery_methods, vec!["Radial Velocity"]);
    }

    #[test]
    fn test_flags_accumulate_and_category() {
        let stellar = StellarMaps::default();
        let gaia = AstrometryMap::new();
        let mut second = planet_row("PSR B1257+12", "c");
        second["cb_flag"] = json!(1);
        second["discoverymethod"] = json!("Pulsar Timing");
        let mut first = planet_row("PSR B1257+12", "b");
        first["pul_flag"] = json!("1");

        let systems = ingest_rows(&[first, second], &ctx(&stellar, &gaia, 16));
        let sys = &systems[0];
        assert_eq!(sys.category, "Miscellaneous");
        assert!(sys.catalog_flags.pul);
        assert!(sys.catalog_flags.cb);
        assert_eq!(sys.circumbinary, Some(true));
        assert_eq!(sys.planets[1].circumbinary, Some(true));
        assert_eq!(sys.planets[0].circumbinary, None);
        assert_eq!(sys.discovery_methods, vec!["Radial Velocity", "Pulsar Timing"]);

        let mut wd = planet_row("WD 1856+534", "b");
        wd["st_spectype"] = json!("wd");
        assert_eq!(category(&wd), "Miscellaneous");
        let mut triple = planet_row("T", "b");
        triple["sy_snum"] = json!(3);
        assert_eq!(category(&triple), "Multi stars");
    }

    #[test]
    fn test_binary_system_gets_projected_companion() {
        let sh_rows = vec![
            json!({"sy_name": "alf Cen", "hostname": "alf Cen B", "gaia_dr3_id": "Gaia DR3 2", "st_teff": 5260}),
            json!({"sy_name": "alf Cen", "hostname": "alf Cen A", "gaia_dr3_id": "Gaia DR3 1", "st_teff": 5790}),
        ];
        let stellar = StellarMaps::build(&sh_rows);
        let mut gaia = AstrometryMap::new();
        gaia.insert("1".to_string(), Astrometry { ra: 0.0, dec: 0.0, parallax: Some(1000.0) });
        gaia.insert(
            "2".to_string(),
            Astrometry { ra: 0.0, dec: 1.0 / 3600.0, parallax: Some(1000.0) },
        );

        let mut row = planet_row("alf Cen A", "b");
        row["sy_snum"] = json!(2);
        row["sy_dist"] = Value::Null;
        let systems = ingest_rows(&[row], &ctx(&stellar, &gaia, 16));
        let sys = &systems[0];

        assert_eq!(sys.raw_name, "alf Cen");
        assert_eq!(sys.category, "Binary stars");
        assert_eq!(sys.stars.len(), 2);
        assert_eq!(sys.stars[0].name, "alf Cen A");
        assert_eq!(sys.stars[0].pos_au, Some([0.0, 0.0, 0.0]));
        assert_eq!(sys.stars[0].orbit_au, None);
        // parallax 1000 mas puts the system at 1 pc, so 1 arcsec is 1 AU.
        let pos = sys.stars[1].pos_au.unwrap();
        assert_relative_eq!(pos[2], 1.0, epsilon = 1e-6);
        assert_relative_eq!(sys.stars[1].orbit_au.unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_system_serialization_shape() {
        let stellar = StellarMaps::default();
        let gaia = AstrometryMap::new();
        let systems = ingest_rows(&[planet_row("HD 1", "b")], &ctx(&stellar, &gaia, 16));
        let value = serde_json::to_value(&systems[0]).unwrap();

        assert!(value["circumbinary"].is_null());
        assert_eq!(value["catalogFlags"]["sy_snum"], 1);
        assert_eq!(value["__source"], "NASA Exoplanet Archive");
        assert_eq!(value["stars"][0]["type"], "star");
        assert!(value["stars"][0].get("posAU").is_none());
        assert_eq!(value["planets"][0]["aAU"], 0.05);
        assert!(value["planets"][0].get("massEarth").is_none());
        assert_eq!(value["planets"][0]["detectionFlags"]["cb"], false);
    }
}
