//! Feed fetching.
//!
//! [`FeedFetcher`] performs one plain GET. [`fetch_once`] bounds a single
//! attempt by a timeout and a cancellation token; [`fetch_with_retry`] repeats
//! it for transient failures with the backoff of a [`RetryPolicy`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::RetryPolicy;
use crate::config::CheckerConfig;

/// Errors from a single fetch attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The attempt exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// The caller cancelled the fetch.
    #[error("request cancelled")]
    Cancelled,

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),

    /// Any other transport failure (reading the body, redirects, ...).
    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Whether another attempt could succeed: timeouts, connection and
    /// transport errors, HTTP 5xx and 429. Other statuses and cancellation
    /// are final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Request(_) => true,
            Self::Status(code) => *code == 429 || (500..600).contains(code),
            Self::Cancelled => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Source of feed bodies.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// GET `url` once and return the body of a successful response.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// [`FeedFetcher`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    github_token: Option<String>,
}

impl HttpFetcher {
    /// Build a client from the checker configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Request`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &CheckerConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self::with_client(client, config.github_token.clone()))
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client, github_token: Option<String>) -> Self {
        Self {
            client,
            github_token,
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let mut request = self.client.get(url);
        let token = self
            .github_token
            .as_ref()
            .filter(|_| url.starts_with("https://api.github.com/"));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url, status = status.as_u16(), "Fetched feed");
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?)
    }
}

/// One attempt, bounded by `timeout` and aborted when `cancel` fires. The
/// in-flight request is dropped in both cases.
///
/// # Errors
///
/// Returns [`FetchError::Timeout`], [`FetchError::Cancelled`] or whatever the
/// fetcher reported.
pub async fn fetch_once<F: FeedFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Bytes, FetchError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FetchError::Cancelled),
        result = tokio::time::timeout(timeout, fetcher.fetch(url)) => {
            result.unwrap_or(Err(FetchError::Timeout))
        }
    }
}

/// Fetch with retries for transient failures.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-transient error.
pub async fn fetch_with_retry<F: FeedFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    policy: &RetryPolicy,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Bytes, FetchError> {
    let attempts = policy.attempts();
    let mut failures = 0;
    loop {
        match fetch_once(fetcher, url, timeout, cancel).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_transient() && failures + 1 < attempts => {
                failures += 1;
                let delay = policy.backoff(failures);
                warn!(url, attempt = failures, error = %e, ?delay, "Fetch failed, retrying");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(FetchError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays scripted results, one per call.
    struct Scripted {
        results: Mutex<Vec<Result<Bytes, FetchError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut results: Vec<Result<Bytes, FetchError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl FeedFetcher for Scripted {
        async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(FetchError::Status(500)))
        }
    }

    struct Hangs;

    #[async_trait]
    impl FeedFetcher for Hangs {
        async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
            std::future::pending().await
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    #[test]
    fn transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(FetchError::Status(429).is_transient());
        assert!(!FetchError::Status(404).is_transient());
        assert!(!FetchError::Status(403).is_transient());
        assert!(!FetchError::Cancelled.is_transient());
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let fetcher = Scripted::new(vec![
            Err(FetchError::Status(502)),
            Err(FetchError::Connect("refused".into())),
            Ok(Bytes::from_static(b"feed")),
        ]);
        let body = fetch_with_retry(
            &fetcher,
            "http://feed",
            &fast_policy(3),
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(body.as_ref(), b"feed");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let fetcher = Scripted::new(vec![]);
        let err = fetch_with_retry(
            &fetcher,
            "http://feed",
            &fast_policy(4),
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, FetchError::Status(500));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let fetcher = Scripted::new(vec![Err(FetchError::Status(404))]);
        let err = fetch_with_retry(
            &fetcher,
            "http://feed",
            &fast_policy(5),
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, FetchError::Status(404));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_bounds_each_attempt() {
        let err = fetch_with_retry(
            &Hangs,
            "http://feed",
            &fast_policy(2),
            Duration::from_millis(20),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, FetchError::Timeout);
    }

    #[tokio::test]
    async fn cancellation_aborts() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fetch_once(&Hangs, "http://feed", Duration::from_secs(30), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Cancelled);
    }
}
