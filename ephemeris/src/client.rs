//! Horizons client with chunked fetching.

use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use log::{debug, info};
use shared::time::format_horizons_time;
use shared::Fetch;

use crate::parse::{interpret_response, HorizonsError, HorizonsResult, VectorTable};
use crate::query::{StepSize, VectorQuery, HORIZONS_URL};

/// Horizons caps the rows returned per request; stay under it.
pub const MAX_SAMPLES_PER_CALL: i64 = 2000;

/// Pause between consecutive Horizons calls.
pub const DEFAULT_CALL_DELAY: Duration = Duration::from_millis(250);

/// Client for the Horizons vectors API.
#[derive(Debug, Clone)]
pub struct HorizonsClient<F> {
    fetch: F,
    url: String,
    call_delay: Duration,
}

impl<F: Fetch> HorizonsClient<F> {
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            url: HORIZONS_URL.to_string(),
            call_delay: DEFAULT_CALL_DELAY,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_call_delay(mut self, call_delay: Duration) -> Self {
        self.call_delay = call_delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One request, no chunking.
    pub fn vectors_once(&self, query: &VectorQuery) -> HorizonsResult<VectorTable> {
        debug!(
            "Horizons COMMAND={} {} .. {} step {}",
            query.command,
            format_horizons_time(&query.start),
            format_horizons_time(&query.stop),
            query.step
        );
        let response = self.fetch.get_json(&self.url, &query.params())?;
        interpret_response(query.command, &response)
    }

    /// Vectors for `command` over `[start, stop]`, split into requests of at
    /// most [`MAX_SAMPLES_PER_CALL`] samples.
    ///
    /// A start before the body's coverage is moved up to the first instant
    /// Horizons reports as usable. Samples repeated at chunk seams are dropped.
    pub fn vectors(
        &self,
        command: i64,
        start: NaiveDateTime,
        stop: NaiveDateTime,
        step: StepSize,
    ) -> HorizonsResult<VectorTable> {
        let span = TimeDelta::seconds(step.seconds() * (MAX_SAMPLES_PER_CALL - 1));
        let mut merged = VectorTable::default();
        let mut chunk_start = start;
        let mut calls = 0usize;

        while chunk_start < stop {
            let chunk_stop = (chunk_start + span).min(stop);
            if calls > 0 {
                std::thread::sleep(self.call_delay);
            }
            calls += 1;

            let query = VectorQuery::new(command, chunk_start, chunk_stop, step);
            match self.vectors_once(&query) {
                Ok(table) => merged.extend_after(table),
                Err(HorizonsError::StartTooEarly { earliest, message })
                    if earliest < stop && earliest > chunk_start =>
                {
                    info!(
                        "COMMAND={command}: coverage starts at {}, moving chunk start",
                        format_horizons_time(&earliest)
                    );
                    debug!("{message}");
                    chunk_start = earliest;
                    continue;
                }
                Err(e) => return Err(e),
            }
            chunk_start = chunk_stop;
        }

        if merged.len() < 2 {
            return Err(HorizonsError::TooFewSamples(merged.len()));
        }
        debug!(
            "COMMAND={command}: {} samples in {calls} calls",
            merged.len()
        );
        Ok(merged)
    }
}
