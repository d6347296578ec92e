//! Blocking HTTP client with retry and backoff.
//!
//! Public science archives routinely answer with 429s, 502s and half-written
//! bodies during maintenance windows. [`HttpClient`] retries those according to
//! its [`RetryPolicy`] and fails fast on anything a retry cannot fix (a 404, a
//! malformed query rejected with 400).

use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;

use crate::fetch::{Fetch, FetchError, FetchResult};
use crate::retry::RetryPolicy;

/// Longest body excerpt kept in a [`FetchError::Status`].
const ERROR_BODY_LIMIT: usize = 500;

/// Settings for an [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Sent as `User-Agent`; public APIs ask bots to identify themselves
    pub user_agent: String,
    /// Sent as `Accept` when set
    pub accept: Option<String>,
    pub connect_timeout: Duration,
    /// Whole-request timeout, body included
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl HttpConfig {
    /// Defaults: 30 s connect, 120 s total, archive retry preset.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept: None,
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Blocking HTTP client implementing [`Fetch`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    /// Build a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the header values are not valid
    /// HTTP header text or the TLS backend cannot be initialised.
    pub fn new(config: HttpConfig) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| FetchError::Transport(format!("invalid user agent: {e}")))?,
        );
        if let Some(accept) = &config.accept {
            headers.insert(
                ACCEPT,
                HeaderValue::from_str(accept)
                    .map_err(|e| FetchError::Transport(format!("invalid accept header: {e}")))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn send_once(&self, request: RequestBuilder, url: &str) -> FetchResult<String> {
        let response = request
            .send()
            .map_err(|e| FetchError::Transport(format!("{url}: {e}")))?;
        let status = response.status();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .map_err(|e| FetchError::Transport(format!("{url}: reading body: {e}")))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url,
                body: excerpt(&body, ERROR_BODY_LIMIT),
            });
        }

        debug!("{} {} ({} bytes)", status.as_u16(), final_url, body.len());
        Ok(body)
    }

    /// Run `attempt` until it succeeds, fails permanently, or the policy runs out.
    fn retrying<T>(
        &self,
        url: &str,
        mut attempt: impl FnMut() -> FetchResult<T>,
    ) -> FetchResult<T> {
        let policy = &self.config.retry;
        let attempts = policy.total_attempts();
        let mut last = FetchError::Transport(format!("{url}: no attempt made"));

        for n in 0..attempts {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    if n + 1 < attempts {
                        let delay = policy.delay(n);
                        warn!(
                            "attempt {}/{} for {url} failed: {e}; retrying in {:.1}s",
                            n + 1,
                            attempts,
                            delay.as_secs_f64()
                        );
                        std::thread::sleep(delay);
                    }
                    last = e;
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts,
            last: Box::new(last),
        })
    }
}

impl Fetch for HttpClient {
    fn get_text(&self, url: &str, query: &[(String, String)]) -> FetchResult<String> {
        self.retrying(url, || {
            self.send_once(self.client.get(url).query(query), url)
        })
    }

    fn post_form(&self, url: &str, form: &[(String, String)]) -> FetchResult<String> {
        self.retrying(url, || self.send_once(self.client.post(url).form(form), url))
    }

    /// Decode failures are retried too: a truncated body is usually a
    /// dropped connection, not a permanent condition.
    fn get_json(&self, url: &str, query: &[(String, String)]) -> FetchResult<Value> {
        self.retrying(url, || {
            let body = self.send_once(self.client.get(url).query(query), url)?;
            serde_json::from_str(&body).map_err(|e| FetchError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
        })
    }
}

/// First `limit` characters of `text`, with `…` appended when cut.
pub fn excerpt(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_short_text_untouched() {
        assert_eq!(excerpt("  hello  ", 10), "hello");
    }

    #[test]
    fn test_excerpt_cuts_on_char_boundary() {
        assert_eq!(excerpt("µµµµ", 2), "µµ…");
    }

    #[test]
    fn test_config_builders() {
        let config = HttpConfig::new("bot/1.0")
            .with_accept("application/json")
            .with_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::immediate(2));
        assert_eq!(config.accept.as_deref(), Some("application/json"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.attempts, 2);
    }

    #[test]
    fn test_client_rejects_invalid_user_agent() {
        let result = HttpClient::new(HttpConfig::new("bad\nagent"));
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
