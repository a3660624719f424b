//! Network I/O: feed fetching with per-attempt timeouts, cancellation and
//! bounded retries.

pub mod fetch;
pub mod retry;

pub use fetch::{FeedFetcher, FetchError, HttpFetcher, fetch_once, fetch_with_retry};
pub use retry::RetryPolicy;
