//! Checkpoint verification.
//!
//! A checkpoint is the fingerprint of an appcast feed at the time the
//! manifest was written. [`Verifier::check`] fetches the feed again and
//! reports whether the fingerprint still matches. A mismatch is only
//! reported; nothing is ever written back to the manifest.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cask_schema::Sha256Digest;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::checkpoint;
use crate::config::CheckerConfig;
use crate::feed::{Feed, FeedError, FeedRelease, Provider};
use crate::io::{FeedFetcher, FetchError, HttpFetcher, RetryPolicy, fetch_with_retry};
use crate::resolver::{ResolvedAppcast, ResolvedCask};

/// Why a feed could not be checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Every attempt timed out.
    Timeout,
    /// The check was cancelled.
    Cancelled,
    /// The connection or transfer failed.
    Network {
        /// Transport error description.
        message: String,
    },
    /// The server answered with an error status.
    Status {
        /// HTTP status code.
        code: u16,
    },
}

impl From<FetchError> for UnavailableReason {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Timeout => Self::Timeout,
            FetchError::Cancelled => Self::Cancelled,
            FetchError::Status(code) => Self::Status { code },
            FetchError::Connect(message) | FetchError::Request(message) => {
                Self::Network { message }
            }
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Network { message } => write!(f, "network error: {message}"),
            Self::Status { code } => write!(f, "HTTP {code}"),
        }
    }
}

/// Result of checking one appcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// The resolved configuration declares no appcast.
    NotApplicable,
    /// The feed still matches its recorded checkpoint.
    Unchanged {
        /// The matching checkpoint.
        checkpoint: Sha256Digest,
    },
    /// The feed no longer matches.
    Changed {
        /// Checkpoint recorded in the manifest.
        recorded: Sha256Digest,
        /// Fingerprint of the feed as fetched now.
        latest: Sha256Digest,
        /// Newest release the feed advertises, when its format is known.
        #[serde(skip_serializing_if = "Option::is_none")]
        release: Option<FeedRelease>,
    },
    /// The feed could not be fetched.
    Unavailable {
        /// What went wrong.
        reason: UnavailableReason,
    },
}

impl VerificationOutcome {
    /// Whether the feed moved past its checkpoint.
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    /// Short label for tables and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotApplicable => "no appcast",
            Self::Unchanged { .. } => "unchanged",
            Self::Changed { .. } => "changed",
            Self::Unavailable { .. } => "unavailable",
        }
    }
}

/// Errors raised while taking a [`FeedSnapshot`].
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The feed, or the GitHub releases behind it, could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The feed body is not in the detected format.
    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// A feed as it is served now, with the checkpoint a manifest would record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedSnapshot {
    /// The appcast URL.
    pub url: String,
    /// Fingerprint of the body served at `url`.
    pub checkpoint: Sha256Digest,
    /// Releases the feed advertises.
    pub feed: Feed,
}

/// Fetches appcasts and compares them with their checkpoints.
#[derive(Clone)]
pub struct Verifier {
    fetcher: Arc<dyn FeedFetcher>,
    retry: RetryPolicy,
    timeout: Duration,
    cancel: CancellationToken,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    /// Verifier over an arbitrary fetcher.
    pub fn new(fetcher: Arc<dyn FeedFetcher>, config: &CheckerConfig) -> Self {
        Self {
            fetcher,
            retry: config.retry,
            timeout: config.timeout(),
            cancel: CancellationToken::new(),
        }
    }

    /// Verifier over HTTP.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the HTTP client cannot be built.
    pub fn from_config(config: &CheckerConfig) -> Result<Self, FetchError> {
        Ok(Self::new(Arc::new(HttpFetcher::new(config)?), config))
    }

    /// Abort in-flight and future checks when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token that aborts this verifier's checks.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Verify the appcast of a resolved package.
    pub async fn verify(&self, cask: &ResolvedCask) -> VerificationOutcome {
        let outcome = self.check(cask.appcast.as_ref()).await;
        match &outcome {
            VerificationOutcome::Unavailable { reason } => {
                info!(cask = %cask.token, %reason, "Appcast unavailable");
            }
            other => info!(cask = %cask.token, outcome = other.label(), "Checked appcast"),
        }
        outcome
    }

    /// Check one appcast against its recorded checkpoint.
    pub async fn check(&self, appcast: Option<&ResolvedAppcast>) -> VerificationOutcome {
        let Some(appcast) = appcast else {
            return VerificationOutcome::NotApplicable;
        };

        let body = match fetch_with_retry(
            self.fetcher.as_ref(),
            &appcast.url,
            &self.retry,
            self.timeout,
            &self.cancel,
        )
        .await
        {
            Ok(body) => body,
            Err(e) => {
                return VerificationOutcome::Unavailable { reason: e.into() };
            }
        };

        let latest = checkpoint::fingerprint(&body);
        if latest == appcast.checkpoint {
            return VerificationOutcome::Unchanged { checkpoint: latest };
        }

        let release = self.inspect(&appcast.url, &body).await;
        VerificationOutcome::Changed {
            recorded: appcast.checkpoint.clone(),
            latest,
            release,
        }
    }

    /// Fetch an appcast and parse it, for review without a manifest.
    ///
    /// GitHub `releases.atom` URLs are fingerprinted as served, while their
    /// releases are read from the releases API.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] when either fetch fails after retries or a
    /// GitHub releases response is malformed.
    pub async fn snapshot(&self, url: &str) -> Result<FeedSnapshot, SnapshotError> {
        let body =
            fetch_with_retry(self.fetcher.as_ref(), url, &self.retry, self.timeout, &self.cancel)
                .await?;
        let feed = self.read_feed(url, &body, &self.retry).await?;
        debug!(url, provider = %feed.provider, releases = feed.releases.len(), "Read feed");
        Ok(FeedSnapshot {
            url: url.to_string(),
            checkpoint: checkpoint::fingerprint(&body),
            feed,
        })
    }

    /// Best effort: find the newest release the feed advertises. Failures are
    /// logged and otherwise ignored.
    async fn inspect(&self, url: &str, body: &[u8]) -> Option<FeedRelease> {
        let feed = self
            .read_feed(url, body, &RetryPolicy::none())
            .await
            .inspect_err(|e| debug!(url, error = %e, "Feed not understood"))
            .ok()?;
        feed.latest_stable()
            .or_else(|| feed.releases.first())
            .cloned()
    }

    async fn read_feed(
        &self,
        url: &str,
        body: &[u8],
        retry: &RetryPolicy,
    ) -> Result<Feed, SnapshotError> {
        let (provider, api_url) = Provider::guess_by_url(url);
        if provider == Provider::GitHub {
            let api_body =
                fetch_with_retry(self.fetcher.as_ref(), &api_url, retry, self.timeout, &self.cancel)
                    .await?;
            return Ok(Feed::parse(provider, &String::from_utf8_lossy(&api_body))?);
        }
        let text = String::from_utf8_lossy(body);
        Ok(Feed::parse(Provider::guess_by_content(&text), &text)?)
    }
}
