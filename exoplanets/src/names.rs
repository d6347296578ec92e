//! Display names for exoplanet systems.
//!
//! The archive uses IAU constellation abbreviations (`51 Peg`, `Proxima Cen`).
//! The viewer shows the genitive forms instead.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// IAU constellation abbreviation to Latin genitive.
pub const CONSTELLATION_GENITIVE: [(&str, &str); 88] = [
    ("And", "Andromedae"),
    ("Ant", "Antliae"),
    ("Aps", "Apodis"),
    ("Aqr", "Aquarii"),
    ("Aql", "Aquilae"),
    ("Ara", "Arae"),
    ("Ari", "Arietis"),
    ("Aur", "Aurigae"),
    ("Boo", "Bootis"),
    ("Cae", "Caeli"),
    ("Cam", "Camelopardalis"),
    ("Cap", "Capricorni"),
    ("Car", "Carinae"),
    ("Cas", "Cassiopeiae"),
    ("Cen", "Centauri"),
    ("Cep", "Cephei"),
    ("Cet", "Ceti"),
    ("Cha", "Chamaeleontis"),
    ("Cir", "Circini"),
    ("CMa", "Canis Majoris"),
    ("CMi", "Canis Minoris"),
    ("Cnc", "Cancri"),
    ("Col", "Columbae"),
    ("Com", "Comae Berenices"),
    ("CrA", "Coronae Australis"),
    ("CrB", "Coronae Borealis"),
    ("Crt", "Crateris"),
    ("Cru", "Crucis"),
    ("Crv", "Corvi"),
    ("CVn", "Canum Venaticorum"),
    ("Cyg", "Cygni"),
    ("Del", "Delphini"),
    ("Dor", "Doradus"),
    ("Dra", "Draconis"),
    ("Equ", "Equulei"),
    ("Eri", "Eridani"),
    ("For", "Fornacis"),
    ("Gem", "Geminorum"),
    ("Gru", "Gruis"),
    ("Her", "Herculis"),
    ("Hor", "Horologii"),
    ("Hya", "Hydrae"),
    ("Hyi", "Hydri"),
    ("Ind", "Indi"),
    ("Lac", "Lacertae"),
    ("LMi", "Leonis Minoris"),
    ("Leo", "Leonis"),
    ("Lep", "Leporis"),
    ("Lib", "Librae"),
    ("Lup", "Lupi"),
    ("Lyn", "Lyncis"),
    ("Lyr", "Lyrae"),
    ("Men", "Mensae"),
    ("Mic", "Microscopii"),
    ("Mon", "Monocerotis"),
    ("Mus", "Muscae"),
    ("Nor", "Normae"),
    ("Oct", "Octantis"),
    ("Oph", "Ophiuchi"),
    ("Ori", "Orionis"),
    ("Pav", "Pavonis"),
    ("Peg", "Pegasi"),
    ("Per", "Persei"),
    ("Phe", "Phoenicis"),
    ("Pic", "Pictoris"),
    ("PsA", "Piscis Austrini"),
    ("Psc", "Piscium"),
    ("Pup", "Puppis"),
    ("Pyx", "Pyxidis"),
    ("Ret", "Reticuli"),
    ("Scl", "Sculptoris"),
    ("Sco", "Scorpii"),
    ("Sct", "Scuti"),
    ("Ser", "Serpentis"),
    ("Sex", "Sextantis"),
    ("Sge", "Sagittae"),
    ("Sgr", "Sagittarii"),
    ("Tau", "Tauri"),
    ("Tel", "Telescopii"),
    ("TrA", "Trianguli Australis"),
    ("Tri", "Trianguli"),
    ("Tuc", "Tucanae"),
    ("UMa", "Ursae Majoris"),
    ("UMi", "Ursae Minoris"),
    ("Vel", "Velorum"),
    ("Vir", "Virginis"),
    ("Vol", "Volantis"),
    ("Vul", "Vulpeculae"),
];

/// Genitive for an abbreviation; case-sensitive, dots ignored (`U.Ma` → `UMa`).
pub fn constellation_genitive(abbrev: &str) -> Option<&'static str> {
    let key: String = abbrev.chars().filter(|c| *c != '.').collect();
    CONSTELLATION_GENITIVE
        .iter()
        .find(|(a, _)| *a == key)
        .map(|(_, g)| *g)
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid pattern"));
static PROXIMA_CEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Proxima\s+Cen\b").expect("valid pattern"));
static ALPHA_CEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Alpha\s+Cen\b").expect("valid pattern"));
static GJ_551: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(GJ\s*551|Gl\s*551)\b").expect("valid pattern"));
static FLAMSTEED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+)\s+([A-Za-z]{2,3})\b(?:\s*([b-z])\b)?").expect("valid pattern")
});
static PROXIMA_FAMILY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(Proxima\s+Cen|Proxima\s+Centauri|GJ\s*551|Gl\s*551)\b")
        .expect("valid pattern")
});
static ALPHA_FAMILY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(Alpha\s+Cen|Alpha\s+Centauri)\b").expect("valid pattern"));

/// Trim and collapse runs of whitespace to one space.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Expand constellation abbreviations and the Centauri special cases.
pub fn beautify_system_name(raw: &str) -> String {
    let mut s = collapse_whitespace(raw);
    if s.is_empty() {
        return s;
    }
    s = PROXIMA_CEN.replace(&s, "Proxima Centauri").into_owned();
    s = ALPHA_CEN.replace(&s, "Alpha Centauri").into_owned();
    if GJ_551.is_match(&s) {
        s = "Proxima Centauri".to_string();
    }

    FLAMSTEED
        .replace(&s, |caps: &Captures| {
            let number = &caps[1];
            match constellation_genitive(&caps[2]) {
                Some(genitive) => match caps.get(3) {
                    Some(letter) => format!("{number} {genitive} {}", letter.as_str()),
                    None => format!("{number} {genitive}"),
                },
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Every name a system may be searched by, sorted and deduplicated.
pub fn build_system_aliases(raw_name: &str, pretty_name: &str) -> BTreeSet<String> {
    let raw = collapse_whitespace(raw_name);
    let pretty = collapse_whitespace(pretty_name);
    let mut aliases = BTreeSet::new();

    if PROXIMA_FAMILY.is_match(&raw) {
        aliases.extend(
            ["Proxima Centauri", "Proxima Cen", "GJ 551", "Gl 551", "Alpha Centauri"]
                .map(String::from),
        );
    }
    if ALPHA_FAMILY.is_match(&raw) {
        aliases.extend(["Alpha Centauri", "Alpha Cen", "Rigil Kentaurus"].map(String::from));
    }

    let beautified = beautify_system_name(&raw);
    for name in [raw, pretty, beautified] {
        if !name.is_empty() {
            aliases.insert(name);
        }
    }
    aliases
}

/// Planet display name: the archive's `pl_name` when present, else host plus
/// its lowercase letter (`b` when unknown). Letters stay lowercase so they
/// cannot collide with stellar components A, B, C.
pub fn format_exoplanet_display_name(host: &str, pl_name: Option<&str>, letter: Option<&str>) -> String {
    if let Some(name) = pl_name.map(str::trim).filter(|n| !n.is_empty()) {
        return beautify_system_name(name);
    }

    let host = beautify_system_name(host);
    let letter = letter
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map_or_else(|| "b".to_string(), str::to_lowercase);
    if host.is_empty() {
        letter
    } else {
        format!("{host} {letter}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_every_constellation_once() {
        let keys: BTreeSet<&str> = CONSTELLATION_GENITIVE.iter().map(|(a, _)| *a).collect();
        assert_eq!(keys.len(), 88);
        assert_eq!(constellation_genitive("UMa"), Some("Ursae Majoris"));
        assert_eq!(constellation_genitive("uma"), None);
    }

    #[test]
    fn test_flamsteed_expansion() {
        assert_eq!(beautify_system_name("51 Peg b"), "51 Pegasi b");
        assert_eq!(beautify_system_name("51  Peg"), "51 Pegasi");
        assert_eq!(beautify_system_name("47 UMa c"), "47 Ursae Majoris c");
        assert_eq!(beautify_system_name("61 Cyg A"), "61 Cygni A");
        assert_eq!(beautify_system_name("14 Her"), "14 Herculis");
        assert_eq!(beautify_system_name("12 Xyz b"), "12 Xyz b");
    }

    #[test]
    fn test_centauri_special_cases() {
        assert_eq!(beautify_system_name("Proxima Cen"), "Proxima Centauri");
        assert_eq!(beautify_system_name("proxima cen b"), "Proxima Centauri b");
        assert_eq!(beautify_system_name("Alpha Cen A"), "Alpha Centauri A");
        assert_eq!(beautify_system_name("GJ 551"), "Proxima Centauri");
        assert_eq!(beautify_system_name("Gl551"), "Proxima Centauri");
        assert_eq!(beautify_system_name("Proxima Centauri"), "Proxima Centauri");
    }

    #[test]
    fn test_names_without_abbreviations_pass_through() {
        assert_eq!(beautify_system_name("  Kepler-22  "), "Kepler-22");
        assert_eq!(beautify_system_name("HD 189733"), "HD 189733");
        assert_eq!(beautify_system_name(""), "");
    }

    #[test]
    fn test_aliases() {
        let aliases = build_system_aliases("Proxima Cen", "Proxima Centauri");
        let expected: BTreeSet<String> = ["Alpha Centauri", "GJ 551", "Gl 551", "Proxima Cen", "Proxima Centauri"]
            .map(String::from)
            .into();
        assert_eq!(aliases, expected);

        let peg = build_system_aliases("51 Peg", "51 Pegasi");
        assert_eq!(peg.into_iter().collect::<Vec<_>>(), vec!["51 Peg", "51 Pegasi"]);

        let alpha = build_system_aliases("alpha Cen", "Alpha Centauri");
        assert!(alpha.contains("Rigil Kentaurus"));
        assert!(alpha.contains("alpha Cen"));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(
            format_exoplanet_display_name("51 Peg", Some("51 Peg b"), Some("b")),
            "51 Pegasi b"
        );
        assert_eq!(
            format_exoplanet_display_name("Kepler-90", None, Some("H")),
            "Kepler-90 h"
        );
        assert_eq!(format_exoplanet_display_name("TOI-700", Some("  "), None), "TOI-700 b");
        assert_eq!(format_exoplanet_display_name("", None, None), "b");
    }
}
