//! The fetch seam shared by every source client.

use serde_json::Value;
use thiserror::Error;

/// Ordered `(name, value)` pairs for a query string or a form body.
pub type Query = Vec<(String, String)>;

/// Build a [`Query`] from borrowed pairs.
pub fn query<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Query {
    pairs
        .iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect()
}

/// Errors that can occur while fetching from a remote source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection, TLS or timeout failure before a status was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        /// First part of the response body, for CI logs.
        body: String,
    },

    /// The body could not be decoded (invalid JSON, bad UTF-8).
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// All attempts failed; carries the last failure.
    #[error("request failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Decode { .. } => true,
            FetchError::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            FetchError::Exhausted { .. } => false,
        }
    }

    /// The HTTP status behind this error, looking through `Exhausted`.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Exhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Something that can answer HTTP-shaped requests.
///
/// Implementations own retry behaviour: a returned error is final.
pub trait Fetch {
    /// GET `url` with `query` appended and return the body as text.
    fn get_text(&self, url: &str, query: &[(String, String)]) -> FetchResult<String>;

    /// POST `form` url-encoded to `url` and return the body as text.
    fn post_form(&self, url: &str, form: &[(String, String)]) -> FetchResult<String>;

    /// GET `url` and parse the body as JSON.
    fn get_json(&self, url: &str, query: &[(String, String)]) -> FetchResult<Value> {
        let body = self.get_text(url, query)?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn get_text(&self, url: &str, query: &[(String, String)]) -> FetchResult<String> {
        (**self).get_text(url, query)
    }

    fn post_form(&self, url: &str, form: &[(String, String)]) -> FetchResult<String> {
        (**self).post_form(url, form)
    }

    fn get_json(&self, url: &str, query: &[(String, String)]) -> FetchResult<Value> {
        (**self).get_json(url, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            status: code,
            url: "http://example.test".to_string(),
            body: String::new(),
        }
    }

    #[test]
    fn test_transient_statuses() {
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(status(408).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(400).is_transient());
    }

    #[test]
    fn test_status_looks_through_exhausted() {
        let err = FetchError::Exhausted {
            attempts: 3,
            last: Box::new(status(502)),
        };
        assert_eq!(err.status(), Some(502));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_query_builder_preserves_order() {
        let q = query(&[("b", "2"), ("a", "1")]);
        assert_eq!(q[0], ("b".to_string(), "2".to_string()));
        assert_eq!(q[1], ("a".to_string(), "1".to_string()));
    }
}
