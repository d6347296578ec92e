//! Shared plumbing for the dataset compilers.
//!
//! Every source client in the workspace talks to the network through the
//! [`Fetch`] trait, so the job logic runs unchanged against the blocking
//! [`HttpClient`] in production and against [`test_util::CannedFetch`] in tests.

pub mod fetch;
pub mod http;
pub mod numeric;
pub mod output;
pub mod retry;
pub mod storage;
pub mod tabular;
pub mod test_util;
pub mod time;

pub use fetch::{query, Fetch, FetchError, FetchResult, Query};
pub use http::{HttpClient, HttpConfig};
pub use output::{write_json_atomic, JsonStyle, OutputError};
pub use retry::{Backoff, RetryPolicy};
pub use storage::DatasetStore;
