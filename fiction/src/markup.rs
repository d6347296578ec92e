//! Wikitext cleanup and system-name extraction.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static WIKILINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("valid pattern"));
static TEMPLATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("valid pattern"));
static REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<ref[^>]*>.*?</ref>").expect("valid pattern"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid pattern"));
static SYSTEM_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([A-Za-z0-9][^,;()\n]*?\bsystem\b)").expect("valid pattern")
});
static TRAILING_SYSTEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+system$").expect("valid pattern"));
static SYSTEM_LOCATIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+system\s+locations$").expect("valid pattern"));

/// Phrases that name no particular system.
const GENERIC_SYSTEMS: [&str; 3] = ["system", "star system", "a star system"];

/// Plain text of a wikitext value: links become their label, templates, refs
/// and other tags are dropped.
pub fn strip_wiki_markup(value: &str) -> String {
    let text = WIKILINK.replace_all(value.trim(), |caps: &Captures| {
        let inner = &caps[1];
        match inner.split_once('|') {
            Some((_, label)) => label.trim().to_string(),
            None => inner.trim().to_string(),
        }
    });
    let text = TEMPLATE.replace_all(&text, "");
    let text = REF.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    text.trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Lookup key for a system name.
pub fn canon_key(name: &str) -> String {
    collapse_whitespace(&name.to_lowercase())
}

/// Candidate keys for `raw`, most literal first: the name itself, then with
/// ` system` added or removed.
pub fn candidate_keys(raw: &str) -> Vec<String> {
    let clean = collapse_whitespace(raw);
    if clean.is_empty() {
        return Vec::new();
    }
    let key = canon_key(&clean);
    let alternate = if key.ends_with(" system") {
        canon_key(&TRAILING_SYSTEM.replace(&clean, ""))
    } else {
        canon_key(&format!("{clean} system"))
    };
    vec![key, alternate]
}

/// First `<name> system` phrase in a wikitext value.
pub fn extract_system_from_value(value: &str) -> Option<String> {
    let text = strip_wiki_markup(value);
    let phrase = SYSTEM_PHRASE.captures(&text)?.get(1)?.as_str().trim().to_string();
    if GENERIC_SYSTEMS.contains(&phrase.to_lowercase().as_str()) {
        return None;
    }
    Some(phrase)
}

/// System named by the first matching infobox parameter, trying `params` in
/// order.
pub fn extract_system_from_wikitext(wikitext: &str, params: &[&str]) -> Option<String> {
    params.iter().find_map(|param| {
        let pattern = format!(r"(?i)^\|\s*{}\s*=\s*(.+)$", regex::escape(param));
        let line_re = Regex::new(&pattern).ok()?;
        wikitext.lines().find_map(|line| {
            let caps = line_re.captures(line)?;
            extract_system_from_value(caps[1].trim())
        })
    })
}

/// System from a `Category:<X> system locations` membership.
pub fn extract_system_from_categories(categories: &[String]) -> Option<String> {
    categories.iter().find_map(|title| {
        let name = title.strip_prefix("Category:").unwrap_or(title);
        let base = SYSTEM_LOCATIONS.captures(name)?.get(1)?.as_str().trim();
        (!base.is_empty()).then(|| format!("{base} system"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_wiki_markup() {
        assert_eq!(strip_wiki_markup("[[Hoth system|Hoth]]"), "Hoth");
        assert_eq!(strip_wiki_markup(" [[Vulcan system]] "), "Vulcan system");
        assert_eq!(
            strip_wiki_markup("[[Anoat system]]{{C|approximate}}<ref name=\"x\">Source</ref><br />"),
            "Anoat system"
        );
        assert_eq!(strip_wiki_markup("{{a|{{b}}}}"), "{{a|}}");
    }

    #[test]
    fn test_canon_key() {
        assert_eq!(canon_key("  Hoth   System "), "hoth system");
    }

    #[test]
    fn test_candidate_keys() {
        assert_eq!(candidate_keys("Hoth"), vec!["hoth", "hoth system"]);
        assert_eq!(candidate_keys("Hoth  System"), vec!["hoth system", "hoth"]);
        assert!(candidate_keys("  ").is_empty());
    }

    #[test]
    fn test_extract_system_from_value() {
        assert_eq!(
            extract_system_from_value("[[Vulcan system|Vulcan]] system, [[Alpha Quadrant]]"),
            Some("Vulcan system".to_string())
        );
        assert_eq!(
            extract_system_from_value("the [[Sol system]]"),
            Some("the Sol system".to_string())
        );
        assert_eq!(extract_system_from_value("star system"), None);
        assert_eq!(extract_system_from_value("Alpha Quadrant"), None);
        assert_eq!(extract_system_from_value("(Hoth system)"), Some("Hoth system".to_string()));
    }

    #[test]
    fn test_extract_system_from_wikitext_tries_params_in_order() {
        let text = "{{Planet\n| location = [[Outer Rim]] near the Anoat system\n|system=[[Hoth system]]\n}}";
        assert_eq!(
            extract_system_from_wikitext(text, &["system", "location"]),
            Some("Hoth system".to_string())
        );
        assert_eq!(
            extract_system_from_wikitext(text, &["location"]),
            Some("Outer Rim near the Anoat system".to_string())
        );
        assert_eq!(extract_system_from_wikitext(text, &["star system"]), None);
        assert_eq!(extract_system_from_wikitext("", &["system"]), None);
    }

    #[test]
    fn test_extract_system_from_categories() {
        let cats = vec![
            "Category:Ice planets".to_string(),
            "Category:Hoth system locations".to_string(),
        ];
        assert_eq!(extract_system_from_categories(&cats), Some("Hoth system".to_string()));
        assert_eq!(extract_system_from_categories(&[]), None);
    }
}
