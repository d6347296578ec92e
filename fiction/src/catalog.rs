//! Fictional star-system catalog assembly.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use log::{info, warn};
use serde::Serialize;
use serde_json::{json, Map, Value};
use shared::time::now_iso_seconds;
use shared::{DatasetStore, Fetch, JsonStyle, OutputError};
use thiserror::Error;

use crate::markup::{
    canon_key, candidate_keys, extract_system_from_categories, extract_system_from_wikitext,
};
use crate::wiki::{sort_titles, WikiClient, WikiError};

pub const SINK_NAME: &str = "Unassigned system";

const SINK_NOTES: &str =
    "Catch-all for bodies whose star system could not be reliably derived from source pages.";

/// Category listing every star system on both wikis.
const SYSTEMS_CATEGORY: &str = "Star systems";
const SYSTEMS_CATEGORY_CAP: usize = 4000;

/// A committed Star Wars catalog this large is kept as the system baseline.
pub const BASELINE_MIN_SYSTEMS: usize = 500;

const BASELINE_NOTE: &str =
    " Baseline preserved from existing catalog; planets refreshed from Wookieepedia.";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Wiki(#[from] WikiError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Body {
    pub name: String,
}

/// One star system. Fields carried over from a baseline catalog that this
/// crate does not model are kept in `extra`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FictionSystem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub notes: String,
    /// Star objects as stored; baselines may carry more than `name` and `type`
    pub stars: Vec<Value>,
    pub planets: Vec<Body>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FictionSystem {
    /// A single-star system with a placeholder primary.
    pub fn new(name: &str, notes: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            category: Some("Single".to_string()),
            notes: notes.into(),
            stars: vec![primary_star(name)],
            planets: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Rebuild a system from a baseline catalog entry, with planets cleared
    /// and `notes_suffix` appended. Entries without a name are rejected.
    pub fn from_baseline(value: &Value, notes_suffix: &str) -> Option<Self> {
        let mut fields = value.as_object()?.clone();
        let name = fields
            .remove("name")
            .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
            .filter(|n| !n.is_empty())?;

        let category = match fields.remove("category") {
            Some(Value::String(c)) => Some(c),
            Some(Value::Null) | None => None,
            Some(other) => {
                fields.insert("category".to_string(), other);
                None
            }
        };
        let notes = fields
            .remove("notes")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let stars = match fields.remove("stars") {
            Some(Value::Array(stars)) if !stars.is_empty() => stars,
            _ => vec![primary_star(&name)],
        };
        fields.remove("planets");

        Some(Self {
            category,
            notes: notes + notes_suffix,
            stars,
            planets: Vec::new(),
            extra: fields,
            name,
        })
    }
}

fn primary_star(system: &str) -> Value {
    json!({"name": format!("{system} primary"), "type": "star"})
}

/// Systems by canonical name, with the sink always present.
#[derive(Debug, Clone)]
pub struct SystemIndex {
    systems: BTreeMap<String, FictionSystem>,
}

impl SystemIndex {
    pub fn new(systems: impl IntoIterator<Item = FictionSystem>) -> Self {
        let mut index = Self {
            systems: BTreeMap::new(),
        };
        for system in systems {
            index.insert(system);
        }
        let sink = FictionSystem::new(SINK_NAME, SINK_NOTES);
        index.insert(sink);
        index
    }

    /// Add or replace a system under its canonical name.
    pub fn insert(&mut self, system: FictionSystem) {
        self.systems.insert(canon_key(&system.name), system);
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Key of the system `raw` refers to, tolerating a missing or extra
    /// ` system` suffix.
    pub fn match_system(&self, raw: &str) -> Option<String> {
        candidate_keys(raw)
            .into_iter()
            .find(|key| self.systems.contains_key(key))
    }

    pub fn get(&self, key: &str) -> Option<&FictionSystem> {
        self.systems.get(key)
    }

    fn add_body(&mut self, key: &str, body: &str) {
        if let Some(system) = self.systems.get_mut(key) {
            system.planets.push(Body {
                name: body.to_string(),
            });
        }
    }

    fn add_to_sink(&mut self, body: &str) {
        let key = canon_key(SINK_NAME);
        if !self.systems.contains_key(&key) {
            self.insert(FictionSystem::new(SINK_NAME, SINK_NOTES));
        }
        self.add_body(&key, body);
    }

    /// Systems sorted case-insensitively by name.
    pub fn into_sorted(self) -> Vec<FictionSystem> {
        let mut systems: Vec<FictionSystem> = self.systems.into_values().collect();
        systems.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        systems
    }
}

/// How bodies were attached.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanetEnrichment {
    pub enabled: bool,
    pub body_pages: usize,
    pub wikitext_fetched: bool,
    pub category_hints_used: bool,
    pub attached: usize,
    pub unassigned: usize,
    pub created_systems_from_bodies: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FictionMeta {
    pub franchise: String,
    pub source: String,
    pub generated_at: String,
    pub planet_enrichment: PlanetEnrichment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub includes_moons: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FictionCatalog {
    pub meta: FictionMeta,
    pub systems: Vec<FictionSystem>,
}

/// Where a body's system comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachRules<'a> {
    /// Infobox parameters naming the system, in priority order
    pub params: &'a [&'a str],
    pub category_hints: bool,
    pub fetch_wikitext: bool,
    pub source_label: &'a str,
}

/// Attach every body to a system. Bodies whose system cannot be derived go to
/// the sink; a derived system missing from the index is created.
pub fn attach_bodies<F: Fetch>(
    client: &WikiClient<F>,
    bodies: &[String],
    index: &mut SystemIndex,
    rules: &AttachRules<'_>,
) -> CatalogResult<PlanetEnrichment> {
    let mut summary = PlanetEnrichment {
        enabled: true,
        body_pages: bodies.len(),
        wikitext_fetched: rules.fetch_wikitext,
        category_hints_used: rules.category_hints,
        ..PlanetEnrichment::default()
    };

    let categories = if rules.category_hints && !bodies.is_empty() {
        client.pages_categories(bodies)?
    } else {
        HashMap::new()
    };

    for batch in bodies.chunks(client.batch_size()) {
        let texts = if rules.fetch_wikitext {
            client.pages_wikitext(batch)?
        } else {
            HashMap::new()
        };

        for title in batch {
            let body = title.trim();
            let hinted = categories
                .get(title)
                .and_then(|cats| extract_system_from_categories(cats));
            let derived = hinted.or_else(|| {
                texts
                    .get(title)
                    .and_then(|text| extract_system_from_wikitext(text, rules.params))
            });

            let Some(system_name) = derived else {
                index.add_to_sink(body);
                summary.unassigned += 1;
                continue;
            };

            let key = match index.match_system(&system_name) {
                Some(key) => key,
                None => {
                    let name = system_name.trim();
                    index.insert(FictionSystem::new(
                        name,
                        format!(
                            "Created from body pages (derived system reference). Source: {}.",
                            rules.source_label
                        ),
                    ));
                    summary.created_systems_from_bodies += 1;
                    canon_key(name)
                }
            };
            index.add_body(&key, body);
            summary.attached += 1;
        }
    }

    info!(
        "Bodies: {} attached, {} unassigned, {} systems created",
        summary.attached, summary.unassigned, summary.created_systems_from_bodies
    );
    Ok(summary)
}

/// Wikis with a catalog preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Franchise {
    StarTrek,
    StarWars,
}

impl Franchise {
    pub const ALL: [Franchise; 2] = [Franchise::StarTrek, Franchise::StarWars];

    pub fn name(&self) -> &'static str {
        match self {
            Franchise::StarTrek => "Star Trek",
            Franchise::StarWars => "Star Wars",
        }
    }

    pub fn api_url(&self) -> &'static str {
        match self {
            Franchise::StarTrek => "https://memory-alpha.fandom.com/api.php",
            Franchise::StarWars => "https://starwars.fandom.com/api.php",
        }
    }

    pub fn source_label(&self) -> &'static str {
        match self {
            Franchise::StarTrek => "Memory Alpha (MediaWiki Action API)",
            Franchise::StarWars => "Wookieepedia (MediaWiki Action API)",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Franchise::StarTrek => "startrek_star_systems_catalog.json",
            Franchise::StarWars => "starwars_star_systems_catalog.json",
        }
    }

    /// Infobox parameters that name a body's system. Wookieepedia's
    /// `location` is often a region, so it is tried last.
    pub fn body_params(&self) -> &'static [&'static str] {
        match self {
            Franchise::StarTrek => &["system", "star system", "starsystem"],
            Franchise::StarWars => &["system", "star system", "starsystem", "location"],
        }
    }

    /// Wookieepedia files bodies under `Category:<X> system locations`.
    pub fn category_hints(&self) -> bool {
        matches!(self, Franchise::StarWars)
    }

    /// Whether a large committed catalog may seed the system list.
    pub fn keeps_baseline(&self) -> bool {
        matches!(self, Franchise::StarWars)
    }

    /// Whether moons are offered as bodies.
    pub fn has_moons(&self) -> bool {
        matches!(self, Franchise::StarWars)
    }
}

impl fmt::Display for Franchise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Franchise::StarTrek => write!(f, "star-trek"),
            Franchise::StarWars => write!(f, "star-wars"),
        }
    }
}

impl FromStr for Franchise {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "star-trek" | "startrek" => Ok(Franchise::StarTrek),
            "star-wars" | "starwars" => Ok(Franchise::StarWars),
            other => Err(format!("unknown franchise: {other}")),
        }
    }
}

/// Per-franchise knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FranchiseOptions {
    pub fetch_wikitext: bool,
    /// Star Wars only
    pub include_moons: bool,
    pub max_categories: usize,
    /// Zero keeps every body
    pub max_bodies: usize,
}

impl Default for FranchiseOptions {
    fn default() -> Self {
        Self {
            fetch_wikitext: true,
            include_moons: true,
            max_categories: 8000,
            max_bodies: 0,
        }
    }
}

/// The committed catalog's systems, when there are enough of them to keep.
fn load_baseline(store: &DatasetStore, franchise: Franchise) -> Option<Vec<FictionSystem>> {
    let document: Value = match store.load_json(franchise.file_name())? {
        Ok(document) => document,
        Err(e) => {
            warn!("ignoring existing {} catalog: {e}", franchise.name());
            return None;
        }
    };
    let systems = document.get("systems")?.as_array()?;
    if systems.len() < BASELINE_MIN_SYSTEMS {
        return None;
    }
    Some(
        systems
            .iter()
            .filter_map(|s| FictionSystem::from_baseline(s, BASELINE_NOTE))
            .collect(),
    )
}

fn systems_from_wiki<F: Fetch>(
    client: &WikiClient<F>,
    franchise: Franchise,
) -> CatalogResult<Vec<FictionSystem>> {
    let notes = format!(
        "Auto-generated from {} category listings.",
        franchise.source_label()
    );
    let titles = client.category_pages_recursive(SYSTEMS_CATEGORY, SYSTEMS_CATEGORY_CAP)?;
    Ok(titles
        .iter()
        .map(|title| FictionSystem::new(title.trim(), notes.clone()))
        .collect())
}

fn collect_bodies<F: Fetch>(
    client: &WikiClient<F>,
    franchise: Franchise,
    options: &FranchiseOptions,
) -> CatalogResult<Vec<String>> {
    let mut bodies = client.category_pages_recursive("Planets", options.max_categories)?;
    if franchise.has_moons() && options.include_moons {
        bodies.extend(client.category_pages_recursive("Moons", options.max_categories)?);
        sort_titles(&mut bodies);
        bodies.dedup();
    }
    if options.max_bodies > 0 {
        bodies.truncate(options.max_bodies);
    }
    Ok(bodies)
}

/// Build one franchise's catalog. `store` holds the committed catalogs; it is
/// only read here.
pub fn build_catalog<F: Fetch>(
    client: &WikiClient<F>,
    franchise: Franchise,
    options: &FranchiseOptions,
    store: &DatasetStore,
) -> CatalogResult<FictionCatalog> {
    let generated_at = now_iso_seconds();

    let baseline = if franchise.keeps_baseline() {
        load_baseline(store, franchise)
    } else {
        None
    };
    let (systems, source) = match baseline {
        Some(systems) => {
            info!("{}: keeping {} baseline systems", franchise.name(), systems.len());
            (systems, format!("{}{BASELINE_NOTE}", franchise.source_label()))
        }
        None => (
            systems_from_wiki(client, franchise)?,
            franchise.source_label().to_string(),
        ),
    };
    let mut index = SystemIndex::new(systems);

    let bodies = collect_bodies(client, franchise, options)?;
    info!("{}: {} systems, {} bodies", franchise.name(), index.len(), bodies.len());

    let rules = AttachRules {
        params: franchise.body_params(),
        category_hints: franchise.category_hints(),
        fetch_wikitext: options.fetch_wikitext,
        source_label: franchise.source_label(),
    };
    let planet_enrichment = attach_bodies(client, &bodies, &mut index, &rules)?;

    Ok(FictionCatalog {
        meta: FictionMeta {
            franchise: franchise.name().to_string(),
            source,
            generated_at,
            planet_enrichment,
            includes_moons: franchise.has_moons().then_some(options.include_moons),
        },
        systems: index.into_sorted(),
    })
}

/// Build a franchise's catalog and write it, pretty-printed, into `store`.
pub fn compile_franchise<F: Fetch>(
    client: &WikiClient<F>,
    franchise: Franchise,
    options: &FranchiseOptions,
    store: &DatasetStore,
) -> CatalogResult<PathBuf> {
    let catalog = build_catalog(client, franchise, options, store)?;
    let path = store.save_json(franchise.file_name(), &catalog, JsonStyle::Pretty)?;
    info!("Wrote {} ({} systems)", path.display(), catalog.systems.len());
    Ok(path)
}
