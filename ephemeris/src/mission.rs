//! Mission feed plans.
//!
//! A [`MissionPlan`] says what to fetch for one spacecraft and how to lay the
//! result out on disk. The presets reproduce the feeds the viewer ships with.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDateTime;
use shared::time::parse_horizons_time;
use shared::JsonStyle;

use crate::query::StepSize;

/// A body known to Horizons by SPK id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub name: String,
    pub spkid: i64,
}

impl Body {
    pub fn new(name: &str, spkid: i64) -> Self {
        Self {
            name: name.to_string(),
            spkid,
        }
    }
}

/// Sun and the eight planets.
pub fn major_bodies() -> Vec<Body> {
    [
        ("Sun", 10),
        ("Mercury", 199),
        ("Venus", 299),
        ("Earth", 399),
        ("Mars", 499),
        ("Jupiter", 599),
        ("Saturn", 699),
        ("Uranus", 799),
        ("Neptune", 899),
    ]
    .iter()
    .map(|(name, id)| Body::new(name, *id))
    .collect()
}

/// High-resolution sampling around an encounter.
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterWindow {
    /// Short name used in the dataset id, e.g. `jupiter`
    pub name: String,
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    pub step: StepSize,
    pub description: String,
}

/// How bodies are keyed in the multi-body feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKeying {
    /// `"Jupiter": {name, spkid, pv}`
    ByName,
    /// `"599": {name, pv}`
    BySpkId,
}

/// Everything needed to build one mission's feeds.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionPlan {
    pub id: String,
    pub spacecraft: Body,
    /// Stem of the daily feed file, e.g. `parker_solar_probe` for `parker_solar_probe_1d.json`
    pub daily_stem: String,
    /// Stem of window files, e.g. `parker` for `parker_venus_ga1_10m.json`
    pub window_stem: String,
    pub launch: NaiveDateTime,
    pub bodies: Vec<Body>,
    pub planet_step: StepSize,
    pub daily_step: StepSize,
    pub windows: Vec<EncounterWindow>,
    pub keying: ObjectKeying,
    /// Directory, relative to the output root, holding the feeds
    pub feed_dir: String,
    pub style: JsonStyle,
    /// Output root relative to the repository root
    pub output_dir: PathBuf,
}

/// Known missions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mission {
    Voyager1,
    Voyager2,
    Parker,
}

impl FromStr for Mission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "voyager1" => Ok(Mission::Voyager1),
            "voyager2" => Ok(Mission::Voyager2),
            "parker" | "parker_solar_probe" => Ok(Mission::Parker),
            other => Err(format!(
                "unknown mission {other:?}; expected voyager1, voyager2 or parker"
            )),
        }
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mission::Voyager1 => "voyager1",
            Mission::Voyager2 => "voyager2",
            Mission::Parker => "parker",
        };
        write!(f, "{name}")
    }
}

/// Preset times are literals; a typo here is a programming error.
fn at(text: &str) -> NaiveDateTime {
    parse_horizons_time(text).unwrap_or_else(|| panic!("bad preset time {text:?}"))
}

fn window(
    name: &str,
    start: &str,
    stop: &str,
    step: StepSize,
    description: &str,
) -> EncounterWindow {
    EncounterWindow {
        name: name.to_string(),
        start: at(start),
        stop: at(stop),
        step,
        description: description.to_string(),
    }
}

const EVENTS_OUTPUT: &str = "NASA_Data/events_in_our_solar_system/output";

impl Mission {
    pub fn plan(self) -> MissionPlan {
        match self {
            Mission::Voyager1 => MissionPlan {
                id: "voyager1".to_string(),
                spacecraft: Body::new("Voyager 1", -31),
                daily_stem: "voyager1".to_string(),
                window_stem: "voyager1".to_string(),
                launch: at("1977-09-05 12:56:00"),
                bodies: major_bodies(),
                planet_step: StepSize::days(5),
                daily_step: StepSize::days(1),
                windows: vec![
                    window(
                        "jupiter",
                        "1979-02-20 00:00:00",
                        "1979-03-15 00:00:00",
                        StepSize::minutes(30),
                        "Voyager 1 hi-res window around Jupiter encounter; 30-minute sampling.",
                    ),
                    window(
                        "saturn",
                        "1980-11-01 00:00:00",
                        "1980-11-20 00:00:00",
                        StepSize::minutes(30),
                        "Voyager 1 hi-res window around Saturn/Titan encounter; 30-minute sampling.",
                    ),
                ],
                keying: ObjectKeying::ByName,
                feed_dir: String::new(),
                style: JsonStyle::Pretty,
                output_dir: PathBuf::from("Ephemeris/public"),
            },
            Mission::Voyager2 => {
                let encounter = |planet: &str, start: &str, stop: &str| {
                    window(
                        &planet.to_ascii_lowercase(),
                        start,
                        stop,
                        StepSize::minutes(30),
                        &format!(
                            "Voyager 2 hi-res window around {planet} encounter; 30-minute sampling."
                        ),
                    )
                };
                MissionPlan {
                    id: "voyager2".to_string(),
                    spacecraft: Body::new("Voyager 2", -32),
                    daily_stem: "voyager2".to_string(),
                    window_stem: "voyager2".to_string(),
                    launch: at("1977-08-20 14:29:00"),
                    bodies: major_bodies(),
                    planet_step: StepSize::days(5),
                    daily_step: StepSize::days(1),
                    windows: vec![
                        encounter("Jupiter", "1979-06-25 00:00:00", "1979-07-20 00:00:00"),
                        encounter("Saturn", "1981-08-10 00:00:00", "1981-09-05 00:00:00"),
                        encounter("Uranus", "1986-01-10 00:00:00", "1986-02-05 00:00:00"),
                        encounter("Neptune", "1989-08-10 00:00:00", "1989-09-05 00:00:00"),
                    ],
                    keying: ObjectKeying::BySpkId,
                    feed_dir: "ephemeris".to_string(),
                    style: JsonStyle::Compact,
                    output_dir: PathBuf::from(EVENTS_OUTPUT).join("voyager2"),
                }
            }
            Mission::Parker => MissionPlan {
                id: "parker".to_string(),
                spacecraft: Body::new("Parker Solar Probe", -95),
                daily_stem: "parker_solar_probe".to_string(),
                window_stem: "parker".to_string(),
                launch: at("2018-08-12 07:31:00"),
                bodies: major_bodies(),
                planet_step: StepSize::days(5),
                daily_step: StepSize::days(1),
                windows: vec![
                    window(
                        "venus_ga1",
                        "2018-10-02 00:00:00",
                        "2018-10-05 00:00:00",
                        StepSize::minutes(10),
                        "Parker Solar Probe hi-res window around the first Venus gravity assist; 10-minute sampling.",
                    ),
                    window(
                        "perihelion1",
                        "2018-11-05 00:00:00",
                        "2018-11-07 12:00:00",
                        StepSize::minutes(10),
                        "Parker Solar Probe hi-res window around the first perihelion; 10-minute sampling.",
                    ),
                ],
                keying: ObjectKeying::BySpkId,
                feed_dir: "ephemeris".to_string(),
                style: JsonStyle::Compact,
                output_dir: PathBuf::from(EVENTS_OUTPUT).join("parker_solar_probe"),
            },
        }
    }
}

impl MissionPlan {
    pub fn planets_id(&self) -> String {
        format!("planets_{}", self.planet_step.tag())
    }

    pub fn daily_id(&self) -> String {
        format!("{}_{}", self.daily_stem, self.daily_step.tag())
    }

    pub fn window_id(&self, window: &EncounterWindow) -> String {
        format!("{}_{}_{}", self.window_stem, window.name, window.step.tag())
    }

    /// Path of dataset `id` relative to the output root, as listed in the manifest.
    pub fn manifest_file(&self, id: &str) -> String {
        if self.feed_dir.is_empty() {
            format!("{id}.json")
        } else {
            format!("{}/{id}.json", self.feed_dir)
        }
    }

    pub fn planets_description(&self) -> String {
        format!(
            "Sun + {} planets; barycentric state vectors sampled every {} (AU, AU/day).",
            self.bodies.len().saturating_sub(1),
            describe_step(self.planet_step)
        )
    }

    pub fn daily_description(&self) -> String {
        format!(
            "{} barycentric state vectors sampled {} (AU, AU/day).",
            self.spacecraft.name,
            match describe_step(self.daily_step).as_str() {
                "1 day" => "daily".to_string(),
                other => format!("every {other}"),
            }
        )
    }
}

fn describe_step(step: StepSize) -> String {
    use crate::query::StepUnit;
    let unit = match step.unit {
        StepUnit::Days => "day",
        StepUnit::Hours => "hour",
        StepUnit::Minutes => "minute",
    };
    if step.count == 1 {
        format!("1 {unit}")
    } else {
        format!("{} {unit}s", step.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mission_names_parse() {
        assert_eq!("Voyager1".parse::<Mission>().unwrap(), Mission::Voyager1);
        assert_eq!("parker".parse::<Mission>().unwrap(), Mission::Parker);
        assert!("cassini".parse::<Mission>().is_err());
        assert_eq!(Mission::Voyager2.to_string(), "voyager2");
    }

    #[test]
    fn test_voyager1_ids_and_files() {
        let plan = Mission::Voyager1.plan();
        assert_eq!(plan.planets_id(), "planets_5d");
        assert_eq!(plan.daily_id(), "voyager1_1d");
        assert_eq!(plan.window_id(&plan.windows[0]), "voyager1_jupiter_30m");
        assert_eq!(plan.manifest_file("planets_5d"), "planets_5d.json");
        assert_eq!(plan.keying, ObjectKeying::ByName);
        assert_eq!(
            plan.planets_description(),
            "Sun + 8 planets; barycentric state vectors sampled every 5 days (AU, AU/day)."
        );
        assert_eq!(
            plan.daily_description(),
            "Voyager 1 barycentric state vectors sampled daily (AU, AU/day)."
        );
    }

    #[test]
    fn test_parker_layout() {
        let plan = Mission::Parker.plan();
        assert_eq!(plan.spacecraft.spkid, -95);
        assert_eq!(plan.daily_id(), "parker_solar_probe_1d");
        assert_eq!(plan.window_id(&plan.windows[0]), "parker_venus_ga1_10m");
        assert_eq!(
            plan.manifest_file("parker_perihelion1_10m"),
            "ephemeris/parker_perihelion1_10m.json"
        );
        assert_eq!(
            plan.output_dir,
            PathBuf::from("NASA_Data/events_in_our_solar_system/output/parker_solar_probe")
        );
    }

    #[test]
    fn test_voyager2_has_four_encounters() {
        let plan = Mission::Voyager2.plan();
        let ids: Vec<String> = plan.windows.iter().map(|w| plan.window_id(w)).collect();
        assert_eq!(
            ids,
            vec![
                "voyager2_jupiter_30m",
                "voyager2_saturn_30m",
                "voyager2_uranus_30m",
                "voyager2_neptune_30m"
            ]
        );
        assert_eq!(plan.bodies.len(), 9);
        assert_eq!(plan.bodies[0], Body::new("Sun", 10));
    }
}
