//! MediaWiki Action API client.
//!
//! Only the handful of `action=query` shapes the catalog builder needs:
//! category listings (with continuation), page wikitext and page categories.
//! Every request asks for `formatversion=2`, which returns `pages` as an array
//! and drops the legacy `*` content keys.

use std::collections::{HashMap, HashSet, VecDeque};
use std::thread;
use std::time::Duration;

use log::{debug, info};
use serde_json::Value;
use shared::{Fetch, FetchError};
use thiserror::Error;

/// Titles per `prop=` request; MediaWiki allows 50 for ordinary clients.
pub const DEFAULT_BATCH_SIZE: usize = 20;

pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(150);

const CATEGORY_PAGE_LIMIT: &str = "200";
const CATEGORIES_PER_PAGE: &str = "500";

#[derive(Error, Debug)]
pub enum WikiError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("MediaWiki API error from {url}: {message}")]
    Api { url: String, message: String },
}

pub type WikiResult<T> = Result<T, WikiError>;

/// One page of `list=categorymembers`, split by member type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMembers {
    /// Main-namespace page titles
    pub pages: Vec<String>,
    /// Subcategory names without the `Category:` prefix
    pub subcategories: Vec<String>,
}

fn strip_category_prefix(title: &str) -> &str {
    title.strip_prefix("Category:").unwrap_or(title)
}

/// `query.pages` of a formatversion=2 answer.
fn query_pages(payload: &Value) -> &[Value] {
    payload
        .pointer("/query/pages")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Client for one wiki's `api.php`.
#[derive(Debug, Clone)]
pub struct WikiClient<F> {
    fetch: F,
    /// Used for `prop=revisions` batches when set
    wikitext_fetch: Option<F>,
    api_url: String,
    batch_size: usize,
    throttle: Duration,
}

impl<F: Fetch> WikiClient<F> {
    pub fn new(fetch: F, api_url: impl Into<String>) -> Self {
        Self {
            fetch,
            wikitext_fetch: None,
            api_url: api_url.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            throttle: DEFAULT_THROTTLE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Send wikitext batches through `fetch`, e.g. a client with a longer timeout.
    pub fn with_wikitext_fetch(mut self, fetch: F) -> Self {
        self.wikitext_fetch = Some(fetch);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn pause(&self) {
        if !self.throttle.is_zero() {
            thread::sleep(self.throttle);
        }
    }

    fn query(&self, params: &[(&str, &str)]) -> WikiResult<Value> {
        self.query_with(&self.fetch, params)
    }

    fn query_with(&self, fetch: &F, params: &[(&str, &str)]) -> WikiResult<Value> {
        let mut full: Vec<(String, String)> = vec![("action".to_string(), "query".to_string())];
        full.extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        full.push(("format".to_string(), "json".to_string()));
        full.push(("formatversion".to_string(), "2".to_string()));

        let payload = fetch.get_json(&self.api_url, &full)?;
        if let Some(error) = payload.get("error") {
            return Err(WikiError::Api {
                url: self.api_url.clone(),
                message: error
                    .get("info")
                    .and_then(Value::as_str)
                    .map_or_else(|| error.to_string(), str::to_string),
            });
        }
        Ok(payload)
    }

    /// All direct members of `Category:<category>`, following continuation.
    pub fn category_members(&self, category: &str) -> WikiResult<CategoryMembers> {
        let title = format!("Category:{category}");
        let mut members = CategoryMembers::default();
        let mut cont: Option<String> = None;

        loop {
            let mut params = vec![
                ("list", "categorymembers"),
                ("cmtitle", title.as_str()),
                ("cmtype", "page|subcat"),
                ("cmnamespace", "0|14"),
                ("cmlimit", CATEGORY_PAGE_LIMIT),
            ];
            if let Some(token) = &cont {
                params.push(("cmcontinue", token.as_str()));
            }
            let payload = self.query(&params)?;

            let listed = payload
                .pointer("/query/categorymembers")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for member in listed {
                let Some(title) = member.get("title").and_then(Value::as_str) else {
                    continue;
                };
                match member.get("type").and_then(Value::as_str) {
                    Some("page") => members.pages.push(title.to_string()),
                    Some("subcat") => members
                        .subcategories
                        .push(strip_category_prefix(title).to_string()),
                    _ => {}
                }
            }

            cont = payload
                .pointer("/continue/cmcontinue")
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(str::to_string);
            if cont.is_none() {
                return Ok(members);
            }
            self.pause();
        }
    }

    /// Pages of `root` and of its subcategories, breadth-first, visiting at
    /// most `max_categories` categories. Titles come back sorted
    /// case-insensitively and deduplicated.
    pub fn category_pages_recursive(
        &self,
        root: &str,
        max_categories: usize,
    ) -> WikiResult<Vec<String>> {
        let mut seen_categories: HashSet<String> = HashSet::new();
        let mut pages: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([root.to_string()]);

        while let Some(category) = queue.pop_front() {
            if !seen_categories.insert(category.clone()) {
                continue;
            }
            debug!("walking Category:{category}");
            let members = self.category_members(&category)?;
            pages.extend(members.pages);
            for sub in members.subcategories {
                if !seen_categories.contains(&sub) && seen_categories.len() < max_categories {
                    queue.push_back(sub);
                }
            }
            if seen_categories.len() >= max_categories {
                break;
            }
        }

        info!(
            "Category:{root}: {} pages in {} categories",
            pages.len(),
            seen_categories.len()
        );
        let mut pages: Vec<String> = pages.into_iter().collect();
        sort_titles(&mut pages);
        Ok(pages)
    }

    /// Main-slot wikitext of each title; pages without a revision map to "".
    pub fn pages_wikitext(&self, titles: &[String]) -> WikiResult<HashMap<String, String>> {
        let fetch = self.wikitext_fetch.as_ref().unwrap_or(&self.fetch);
        let mut out = HashMap::new();
        for batch in titles.chunks(self.batch_size) {
            let joined = batch.join("|");
            let payload = self.query_with(
                fetch,
                &[
                    ("prop", "revisions"),
                    ("rvprop", "content"),
                    ("rvslots", "main"),
                    ("titles", joined.as_str()),
                ],
            )?;

            for page in query_pages(&payload) {
                let Some(title) = page.get("title").and_then(Value::as_str) else {
                    continue;
                };
                let content = page
                    .pointer("/revisions/0/slots/main/content")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                out.insert(title.to_string(), content.to_string());
            }
            self.pause();
        }
        Ok(out)
    }

    /// Category titles (with their `Category:` prefix) of each title.
    pub fn pages_categories(&self, titles: &[String]) -> WikiResult<HashMap<String, Vec<String>>> {
        let mut out = HashMap::new();
        for batch in titles.chunks(self.batch_size) {
            let joined = batch.join("|");
            let payload = self.query(&[
                ("prop", "categories"),
                ("cllimit", CATEGORIES_PER_PAGE),
                ("titles", joined.as_str()),
            ])?;

            for page in query_pages(&payload) {
                let Some(title) = page.get("title").and_then(Value::as_str) else {
                    continue;
                };
                let categories = page
                    .get("categories")
                    .and_then(Value::as_array)
                    .map(|cats| {
                        cats.iter()
                            .filter_map(|c| c.get("title").and_then(Value::as_str))
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                out.insert(title.to_string(), categories);
            }
            self.pause();
        }
        Ok(out)
    }
}

/// Sort titles case-insensitively; ties fall back to the exact text.
pub fn sort_titles(titles: &mut [String]) {
    titles.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::test_util::CannedFetch;

    const API: &str = "https://wiki.test/api.php";

    fn members(items: &[(&str, &str)], cont: Option<&str>) -> Value {
        let listed: Vec<Value> = items
            .iter()
            .map(|(title, kind)| json!({"title": title, "type": kind}))
            .collect();
        let mut payload = json!({"query": {"categorymembers": listed}});
        if let Some(token) = cont {
            payload["continue"] = json!({"cmcontinue": token, "continue": "-||"});
        }
        payload
    }

    fn client(fetch: &CannedFetch) -> WikiClient<&CannedFetch> {
        WikiClient::new(fetch, API).with_throttle(Duration::ZERO)
    }

    #[test]
    fn test_category_members_follows_continuation() {
        let fetch = CannedFetch::new()
            .get_json(
                "api.php",
                &[("cmtitle", "Category:Planets")],
                &members(&[("Vulcan", "page"), ("Category:Moons", "subcat")], Some("page|2")),
            )
            .get_json(
                "api.php",
                &[("cmtitle", "Category:Planets"), ("cmcontinue", "page|2")],
                &members(&[("Andoria", "page"), ("File:x.png", "file")], None),
            );

        let found = client(&fetch).category_members("Planets").unwrap();
        assert_eq!(found.pages, vec!["Vulcan", "Andoria"]);
        assert_eq!(found.subcategories, vec!["Moons"]);

        let first = &fetch.requests()[0];
        assert_eq!(first.param("cmtype"), Some("page|subcat"));
        assert_eq!(first.param("cmnamespace"), Some("0|14"));
        assert_eq!(first.param("formatversion"), Some("2"));
    }

    #[test]
    fn test_recursive_walk_visits_each_category_once() {
        let fetch = CannedFetch::new()
            .get_json(
                "api.php",
                &[("cmtitle", "Category:Root")],
                &members(&[("b page", "page"), ("Category:A", "subcat"), ("Category:B", "subcat")], None),
            )
            .get_json(
                "api.php",
                &[("cmtitle", "Category:A")],
                &members(&[("A page", "page"), ("Category:B", "subcat"), ("Category:Root", "subcat")], None),
            )
            .get_json(
                "api.php",
                &[("cmtitle", "Category:B")],
                &members(&[("A page", "page"), ("c page", "page")], None),
            );

        let pages = client(&fetch).category_pages_recursive("Root", 100).unwrap();
        assert_eq!(pages, vec!["A page", "b page", "c page"]);
        assert_eq!(fetch.count("api.php"), 3);
    }

    #[test]
    fn test_recursive_walk_respects_category_cap() {
        let fetch = CannedFetch::new()
            .get_json(
                "api.php",
                &[("cmtitle", "Category:Root")],
                &members(&[("root page", "page"), ("Category:A", "subcat"), ("Category:B", "subcat")], None),
            )
            .get_json(
                "api.php",
                &[("cmtitle", "Category:A")],
                &members(&[("a page", "page")], None),
            );

        let pages = client(&fetch).category_pages_recursive("Root", 2).unwrap();
        assert_eq!(pages, vec!["a page", "root page"]);
        assert_eq!(fetch.count("api.php"), 2);
    }

    #[test]
    fn test_pages_wikitext_batches() {
        let fetch = CannedFetch::new()
            .get_json(
                "api.php",
                &[("titles", "Hoth|Tatooine")],
                &json!({"query": {"pages": [
                    {"title": "Hoth", "revisions": [{"slots": {"main": {"content": "|system = [[Hoth system]]"}}}]},
                    {"title": "Tatooine", "missing": true}
                ]}}),
            )
            .get_json(
                "api.php",
                &[("titles", "Yavin 4")],
                &json!({"query": {"pages": [{"title": "Yavin 4", "revisions": []}]}}),
            );

        let titles: Vec<String> = ["Hoth", "Tatooine", "Yavin 4"].map(String::from).to_vec();
        let texts = client(&fetch).with_batch_size(2).pages_wikitext(&titles).unwrap();
        assert_eq!(texts["Hoth"], "|system = [[Hoth system]]");
        assert_eq!(texts["Tatooine"], "");
        assert_eq!(texts["Yavin 4"], "");
        assert_eq!(fetch.requests()[0].param("rvslots"), Some("main"));
    }

    #[test]
    fn test_wikitext_goes_through_dedicated_fetch() {
        let listing = CannedFetch::new().get_json(
            "api.php",
            &[("prop", "categories")],
            &json!({"query": {"pages": [{"title": "Hoth"}]}}),
        );
        let heavy = CannedFetch::new().get_json(
            "api.php",
            &[("prop", "revisions")],
            &json!({"query": {"pages": [
                {"title": "Hoth", "revisions": [{"slots": {"main": {"content": "ice"}}}]}
            ]}}),
        );
        let wiki = client(&listing).with_wikitext_fetch(&heavy);
        let titles = vec!["Hoth".to_string()];

        assert_eq!(wiki.pages_wikitext(&titles).unwrap()["Hoth"], "ice");
        assert!(wiki.pages_categories(&titles).unwrap()["Hoth"].is_empty());
        assert_eq!(heavy.requests().len(), 1);
        assert_eq!(listing.requests().len(), 1);
        assert_eq!(listing.requests()[0].param("prop"), Some("categories"));
    }

    #[test]
    fn test_pages_categories() {
        let fetch = CannedFetch::new().get_json(
            "api.php",
            &[("prop", "categories")],
            &json!({"query": {"pages": [
                {"title": "Hoth", "categories": [{"ns": 14, "title": "Category:Hoth system locations"}]},
                {"title": "Dagobah"}
            ]}}),
        );
        let titles = vec!["Hoth".to_string(), "Dagobah".to_string()];
        let cats = client(&fetch).pages_categories(&titles).unwrap();
        assert_eq!(cats["Hoth"], vec!["Category:Hoth system locations"]);
        assert!(cats["Dagobah"].is_empty());
        assert_eq!(fetch.requests()[0].param("cllimit"), Some("500"));
    }

    #[test]
    fn test_api_error_is_reported() {
        let fetch = CannedFetch::new().get_json(
            "api.php",
            &[],
            &json!({"error": {"code": "badvalue", "info": "Unrecognized value"}}),
        );
        let err = client(&fetch).category_members("X").unwrap_err();
        assert!(matches!(err, WikiError::Api { ref message, .. } if message == "Unrecognized value"));
    }

    #[test]
    fn test_sort_titles_case_insensitive() {
        let mut titles = vec!["beta".to_string(), "Alpha".to_string(), "alpha".to_string()];
        sort_titles(&mut titles);
        assert_eq!(titles, vec!["Alpha", "alpha", "beta"]);
    }
}
