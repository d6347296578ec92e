//! UTC timestamps in the formats the datasets and Horizons use.

use chrono::{NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Calendar format Horizons accepts for `START_TIME`/`STOP_TIME`.
pub const HORIZONS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `2024-05-01T12:00:00+00:00`
pub fn now_iso_seconds() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
}

/// `2024-05-01T12:00:00.123456Z`
pub fn now_iso_z() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Midnight UTC today.
pub fn today_midnight_utc() -> NaiveDateTime {
    Utc::now().date_naive().and_time(chrono::NaiveTime::MIN)
}

pub fn format_horizons_time(t: &NaiveDateTime) -> String {
    t.format(HORIZONS_TIME_FORMAT).to_string()
}

/// Parse `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM` or a bare date.
pub fn parse_horizons_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, HORIZONS_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}
