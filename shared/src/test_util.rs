//! In-memory [`Fetch`] double for tests.
//!
//! Routes match on method, a URL substring and required query parameters.
//! The most specific matching route wins. Each route hands out its queued
//! responses in order and then keeps repeating the last one.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::fetch::{Fetch, FetchError, FetchResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request seen by [`CannedFetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl RecordedRequest {
    /// Value of parameter `name`, if sent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct Route {
    method: Method,
    url_part: String,
    params: Vec<(String, String)>,
    responses: VecDeque<FetchResult<String>>,
}

impl Route {
    fn matches(&self, method: Method, url: &str, params: &[(String, String)]) -> bool {
        self.method == method
            && url.contains(&self.url_part)
            && self
                .params
                .iter()
                .all(|required| params.iter().any(|sent| sent == required))
    }

    fn next(&mut self) -> Option<FetchResult<String>> {
        if self.responses.len() > 1 {
            self.responses.pop_front()
        } else {
            self.responses.front().cloned()
        }
    }
}

/// Canned responses keyed by request shape.
#[derive(Debug, Default)]
pub struct CannedFetch {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CannedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for requests shaped like `(method, url_part, params)`.
    pub fn respond(
        self,
        method: Method,
        url_part: &str,
        params: &[(&str, &str)],
        response: FetchResult<String>,
    ) -> Self {
        let params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        {
            let mut routes = lock(&self.routes);
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.url_part == url_part && r.params == params)
            {
                Some(route) => route.responses.push_back(response),
                None => routes.push(Route {
                    method,
                    url_part: url_part.to_string(),
                    params,
                    responses: VecDeque::from([response]),
                }),
            }
        }
        self
    }

    pub fn get(self, url_part: &str, params: &[(&str, &str)], body: impl Into<String>) -> Self {
        self.respond(Method::Get, url_part, params, Ok(body.into()))
    }

    pub fn get_json(self, url_part: &str, params: &[(&str, &str)], body: &Value) -> Self {
        self.get(url_part, params, body.to_string())
    }

    pub fn get_err(self, url_part: &str, params: &[(&str, &str)], err: FetchError) -> Self {
        self.respond(Method::Get, url_part, params, Err(err))
    }

    pub fn post(self, url_part: &str, params: &[(&str, &str)], body: impl Into<String>) -> Self {
        self.respond(Method::Post, url_part, params, Ok(body.into()))
    }

    pub fn post_err(self, url_part: &str, params: &[(&str, &str)], err: FetchError) -> Self {
        self.respond(Method::Post, url_part, params, Err(err))
    }

    /// Every request made so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Number of requests whose URL contains `url_part`.
    pub fn count(&self, url_part: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.url.contains(url_part))
            .count()
    }

    fn answer(&self, method: Method, url: &str, params: &[(String, String)]) -> FetchResult<String> {
        lock(&self.requests).push(RecordedRequest {
            method,
            url: url.to_string(),
            params: params.to_vec(),
        });

        let mut routes = lock(&self.routes);
        let mut best: Option<usize> = None;
        for (i, route) in routes.iter().enumerate() {
            if !route.matches(method, url, params) {
                continue;
            }
            let better = match best {
                Some(b) => route.params.len() > routes[b].params.len(),
                None => true,
            };
            if better {
                best = Some(i);
            }
        }

        best.and_then(|i| routes[i].next())
            .unwrap_or_else(|| {
                Err(FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                    body: "no canned response".to_string(),
                })
            })
    }
}

impl Fetch for CannedFetch {
    fn get_text(&self, url: &str, query: &[(String, String)]) -> FetchResult<String> {
        self.answer(Method::Get, url, query)
    }

    fn post_form(&self, url: &str, form: &[(String, String)]) -> FetchResult<String> {
        self.answer(Method::Post, url, form)
    }
}
