//! Horizons `VECTORS` query parameters.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use shared::time::format_horizons_time;
use shared::Query;

use crate::parse::HorizonsError;

/// Horizons REST endpoint.
pub const HORIZONS_URL: &str = "https://ssd.jpl.nasa.gov/api/horizons.api";

/// Solar System Barycenter
pub const CENTER: &str = "@0";
pub const REF_SYSTEM: &str = "ICRF";
pub const REF_PLANE: &str = "FRAME";
/// AU and AU/day
pub const OUT_UNITS: &str = "AU-D";
/// Position and velocity
pub const VEC_TABLE: &str = "2";
pub const TIME_TYPE: &str = "UT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepUnit {
    Days,
    Hours,
    Minutes,
}

impl StepUnit {
    fn seconds(self) -> i64 {
        match self {
            StepUnit::Days => 86_400,
            StepUnit::Hours => 3_600,
            StepUnit::Minutes => 60,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            StepUnit::Days => "d",
            StepUnit::Hours => "h",
            StepUnit::Minutes => "m",
        }
    }
}

/// Sampling interval such as `5 d` or `30 m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSize {
    pub count: u32,
    pub unit: StepUnit,
}

impl StepSize {
    pub fn days(count: u32) -> Self {
        Self {
            count,
            unit: StepUnit::Days,
        }
    }

    pub fn minutes(count: u32) -> Self {
        Self {
            count,
            unit: StepUnit::Minutes,
        }
    }

    /// Length of one step in seconds.
    pub fn seconds(&self) -> i64 {
        i64::from(self.count) * self.unit.seconds()
    }

    /// Compact form used in dataset ids, e.g. `30m`.
    pub fn tag(&self) -> String {
        format!("{}{}", self.count, self.unit.suffix())
    }
}

impl fmt::Display for StepSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count, self.unit.suffix())
    }
}

impl FromStr for StepSize {
    type Err = HorizonsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HorizonsError::InvalidStep(s.to_string());
        let trimmed = s.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (number, rest) = trimmed.split_at(digits_end);

        let count: u32 = number.parse().map_err(|_| invalid())?;
        if count == 0 {
            return Err(invalid());
        }
        let unit = match rest.trim().to_ascii_lowercase().as_str() {
            "d" => StepUnit::Days,
            "h" => StepUnit::Hours,
            "m" => StepUnit::Minutes,
            _ => return Err(invalid()),
        };
        Ok(Self { count, unit })
    }
}

/// A single Horizons vector request.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    /// SPK id of the target body
    pub command: i64,
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    pub step: StepSize,
}

fn quoted(value: &str) -> String {
    format!("'{value}'")
}

impl VectorQuery {
    pub fn new(command: i64, start: NaiveDateTime, stop: NaiveDateTime, step: StepSize) -> Self {
        Self {
            command,
            start,
            stop,
            step,
        }
    }

    /// Request parameters. Values are quoted the way the Horizons API
    /// documentation writes them; `VEC_TABLE` goes bare.
    pub fn params(&self) -> Query {
        let quoted_params = [
            ("EPHEM_TYPE", "VECTORS".to_string()),
            ("MAKE_EPHEM", "YES".to_string()),
            ("OBJ_DATA", "NO".to_string()),
            ("COMMAND", self.command.to_string()),
            ("CENTER", CENTER.to_string()),
            ("START_TIME", format_horizons_time(&self.start)),
            ("STOP_TIME", format_horizons_time(&self.stop)),
            ("STEP_SIZE", self.step.to_string()),
            ("REF_SYSTEM", REF_SYSTEM.to_string()),
            ("REF_PLANE", REF_PLANE.to_string()),
            ("OUT_UNITS", OUT_UNITS.to_string()),
        ];
        let trailing = [
            ("CSV_FORMAT", "YES"),
            ("VEC_LABELS", "NO"),
            ("VEC_DELTA_T", "NO"),
            ("VEC_CORR", "NONE"),
            ("TIME_TYPE", TIME_TYPE),
        ];

        let mut params = vec![("format".to_string(), "json".to_string())];
        params.extend(
            quoted_params
                .iter()
                .map(|(k, v)| (k.to_string(), quoted(v))),
        );
        params.push(("VEC_TABLE".to_string(), VEC_TABLE.to_string()));
        params.extend(trailing.iter().map(|(k, v)| (k.to_string(), quoted(v))));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::time::parse_horizons_time;

    #[test]
    fn test_step_size_parsing() {
        assert_eq!("5 d".parse::<StepSize>().unwrap(), StepSize::days(5));
        assert_eq!(" 30M ".parse::<StepSize>().unwrap(), StepSize::minutes(30));
        assert_eq!("2h".parse::<StepSize>().unwrap().seconds(), 7200);
        assert!("".parse::<StepSize>().is_err());
        assert!("0 d".parse::<StepSize>().is_err());
        assert!("5 y".parse::<StepSize>().is_err());
        assert!("d".parse::<StepSize>().is_err());
        assert!("1.5 d".parse::<StepSize>().is_err());
    }

    #[test]
    fn test_step_size_display_and_tag() {
        let step = StepSize::minutes(10);
        assert_eq!(step.to_string(), "10 m");
        assert_eq!(step.tag(), "10m");
        assert_eq!(StepSize::days(1).seconds(), 86_400);
    }

    #[test]
    fn test_params_quote_everything_but_vec_table() {
        let query = VectorQuery::new(
            -31,
            parse_horizons_time("1977-09-05 12:56:00").unwrap(),
            parse_horizons_time("1977-10-01 00:00:00").unwrap(),
            StepSize::days(1),
        );
        let params = query.params();
        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(params[0], ("format".to_string(), "json".to_string()));
        assert_eq!(get("COMMAND"), "'-31'");
        assert_eq!(get("CENTER"), "'@0'");
        assert_eq!(get("START_TIME"), "'1977-09-05 12:56:00'");
        assert_eq!(get("STEP_SIZE"), "'1 d'");
        assert_eq!(get("VEC_TABLE"), "2");
        assert_eq!(get("TIME_TYPE"), "'UT'");
        assert_eq!(params.len(), 18);
    }
}
