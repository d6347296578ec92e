use std::time::Duration;

use fiction::{build_catalog, compile_franchise, Franchise, FranchiseOptions, WikiClient, SINK_NAME};
use serde_json::{json, Value};
use shared::test_util::CannedFetch;
use shared::{DatasetStore, JsonStyle};

fn members(pages: &[&str]) -> Value {
    let listed: Vec<Value> = pages.iter().map(|t| json!({"title": t, "type": "page"})).collect();
    json!({"query": {"categorymembers": listed}})
}

fn wikitext(pages: &[(&str, &str)]) -> Value {
    let listed: Vec<Value> = pages
        .iter()
        .map(|(title, text)| json!({"title": title, "revisions": [{"slots": {"main": {"content": text}}}]}))
        .collect();
    json!({"query": {"pages": listed}})
}

fn client(fetch: &CannedFetch, franchise: Franchise) -> WikiClient<&CannedFetch> {
    WikiClient::new(fetch, franchise.api_url()).with_throttle(Duration::ZERO)
}

fn names(systems: &[fiction::FictionSystem]) -> Vec<&str> {
    systems.iter().map(|s| s.name.as_str()).collect()
}

#[test]
fn test_star_trek_catalog_from_wiki() {
    let dir = tempfile::tempdir().unwrap();
    let store = DatasetStore::new(dir.path());
    let fetch = CannedFetch::new()
        .get_json("api.php", &[("cmtitle", "Category:Star systems")], &members(&["Vulcan system", "Sol system"]))
        .get_json(
            "api.php",
            &[("cmtitle", "Category:Planets")],
            &members(&["Vulcan", "Earth", "Risa", "Rura Penthe"]),
        )
        .get_json(
            "api.php",
            &[("prop", "revisions")],
            &wikitext(&[
                ("Earth", "{{Planet\n| system = [[Sol system]]\n}}"),
                ("Risa", "| system = [[Risa system|Risa]] system"),
                ("Rura Penthe", "A penal colony."),
                ("Vulcan", "|starsystem=Vulcan system"),
            ]),
        );

    let path = compile_franchise(
        &client(&fetch, Franchise::StarTrek),
        Franchise::StarTrek,
        &FranchiseOptions::default(),
        &store,
    )
    .unwrap();
    assert_eq!(path, dir.path().join("startrek_star_systems_catalog.json"));

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("{\n  \"meta\": {"));
    let doc: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["meta"]["franchise"], "Star Trek");
    assert!(doc["meta"].get("includesMoons").is_none());
    assert_eq!(
        doc["meta"]["planetEnrichment"],
        json!({
            "enabled": true, "bodyPages": 4, "wikitextFetched": true, "categoryHintsUsed": false,
            "attached": 3, "unassigned": 1, "createdSystemsFromBodies": 1
        })
    );

    let systems: Vec<(&str, Vec<&str>)> = doc["systems"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            let planets: Vec<&str> = s["planets"].as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
            (s["name"].as_str().unwrap(), planets)
        })
        .collect();
    assert_eq!(
        systems,
        vec![
            ("Risa system", vec!["Risa"]),
            ("Sol system", vec!["Earth"]),
            (SINK_NAME, vec!["Rura Penthe"]),
            ("Vulcan system", vec!["Vulcan"]),
        ]
    );
    assert!(fetch.requests().iter().all(|r| r.param("prop") != Some("categories")));
}

#[test]
fn test_star_wars_keeps_large_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let store = DatasetStore::new(dir.path());
    let mut systems: Vec<Value> = (0..500)
        .map(|i| json!({"name": format!("System {i:03}"), "planets": [{"name": "stale"}]}))
        .collect();
    systems.push(json!({"name": "Hoth system", "region": "Outer Rim", "notes": "Ice.", "stars": [{"name": "Hoth", "type": "star", "class": "B"}]}));
    store
        .save_json(Franchise::StarWars.file_name(), &json!({"systems": systems}), JsonStyle::Pretty)
        .unwrap();

    let fetch = CannedFetch::new()
        .get_json("api.php", &[("cmtitle", "Category:Planets")], &members(&["Hoth"]))
        .get_json("api.php", &[("cmtitle", "Category:Moons")], &members(&["Endor", "Hoth"]))
        .get_json(
            "api.php",
            &[("prop", "categories")],
            &json!({"query": {"pages": [
                {"title": "Hoth", "categories": [{"title": "Category:Hoth system locations"}]},
                {"title": "Endor"}
            ]}}),
        )
        .get_json(
            "api.php",
            &[("prop", "revisions")],
            &wikitext(&[("Endor", "|location=[[Endor system]], [[Moddell sector]]"), ("Hoth", "")]),
        );

    let catalog = build_catalog(
        &client(&fetch, Franchise::StarWars),
        Franchise::StarWars,
        &FranchiseOptions::default(),
        &store,
    )
    .unwrap();

    assert!(catalog.meta.source.contains("Baseline preserved"));
    assert_eq!(catalog.meta.includes_moons, Some(true));
    assert_eq!(catalog.meta.planet_enrichment.body_pages, 2);
    assert_eq!(catalog.meta.planet_enrichment.created_systems_from_bodies, 1);
    assert_eq!(catalog.systems.len(), 503);
    assert!(fetch
        .requests()
        .iter()
        .all(|r| r.param("cmtitle") != Some("Category:Star systems")));

    let hoth = catalog.systems.iter().find(|s| s.name == "Hoth system").unwrap();
    assert_eq!(hoth.planets.len(), 1);
    assert_eq!(hoth.extra["region"], "Outer Rim");
    assert!(hoth.notes.starts_with("Ice. Baseline preserved"));
    assert_eq!(hoth.stars[0]["class"], "B");

    let endor = catalog.systems.iter().find(|s| s.name == "Endor system").unwrap();
    assert_eq!(endor.planets[0].name, "Endor");
    assert!(catalog.systems.iter().all(|s| s.planets.iter().all(|p| p.name != "stale")));
}

#[test]
fn test_category_hints_apply_without_wikitext() {
    let dir = tempfile::tempdir().unwrap();
    let store = DatasetStore::new(dir.path());
    store
        .save_json(
            Franchise::StarWars.file_name(),
            &json!({"systems": [{"name": "Tiny system"}]}),
            JsonStyle::Pretty,
        )
        .unwrap();

    let fetch = CannedFetch::new()
        .get_json("api.php", &[("cmtitle", "Category:Star systems")], &members(&["Hoth system"]))
        .get_json("api.php", &[("cmtitle", "Category:Planets")], &members(&["Yavin", "Hoth", "Bespin"]))
        .get_json(
            "api.php",
            &[("prop", "categories")],
            &json!({"query": {"pages": [
                {"title": "Hoth", "categories": [{"title": "Category:Hoth system locations"}]},
                {"title": "Bespin", "categories": [{"title": "Category:Gas giants"}]}
            ]}}),
        );
    let options = FranchiseOptions {
        fetch_wikitext: false,
        include_moons: false,
        max_bodies: 2,
        ..FranchiseOptions::default()
    };

    let catalog = build_catalog(&client(&fetch, Franchise::StarWars), Franchise::StarWars, &options, &store).unwrap();

    assert_eq!(names(&catalog.systems), vec!["Hoth system", SINK_NAME]);
    assert_eq!(catalog.systems[0].planets[0].name, "Hoth");
    assert_eq!(catalog.systems[1].planets[0].name, "Bespin");
    assert_eq!(catalog.meta.planet_enrichment.body_pages, 2);
    assert_eq!(catalog.meta.planet_enrichment.unassigned, 1);
    assert!(!catalog.meta.planet_enrichment.wikitext_fetched);
    assert_eq!(catalog.meta.includes_moons, Some(false));
    assert!(fetch.requests().iter().all(|r| r.param("prop") != Some("revisions")));
    assert!(fetch.requests().iter().all(|r| r.param("cmtitle") != Some("Category:Moons")));
}
