//! Appcast feed inspection.
//!
//! Recognises the common feed formats and extracts the releases they
//! advertise, newest first. Inspection is informational: a feed that cannot be
//! parsed never affects the checkpoint comparison.

pub mod github;
pub mod provider;
pub mod sourceforge;
pub mod sparkle;

use std::cmp::Ordering;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub use provider::Provider;

/// Errors raised while parsing a feed body.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The GitHub releases response is not the expected JSON.
    #[error("Invalid GitHub releases JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One release advertised by a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRelease {
    /// Marketing version (`1.2.3`).
    pub version: String,
    /// Build number, when the feed carries one separately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Download URLs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    /// Oldest macOS version supported, as written in the feed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_system_version: Option<String>,
    /// Whether the release is a pre-release.
    pub prerelease: bool,
}

/// A parsed feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    /// Detected provider.
    pub provider: Provider,
    /// Releases, newest first.
    pub releases: Vec<FeedRelease>,
}

impl Feed {
    /// Parse `body` as a feed of the given provider.
    ///
    /// # Errors
    ///
    /// Returns a [`FeedError`] when a GitHub releases response is malformed.
    /// XML feeds parse leniently and yield no releases when unrecognisable.
    pub fn parse(provider: Provider, body: &str) -> Result<Self, FeedError> {
        let releases = match provider {
            Provider::Sparkle => sparkle::parse(body),
            Provider::GitHub => github::parse(body)?,
            Provider::SourceForge => sourceforge::parse(body),
            Provider::Unknown => Vec::new(),
        };
        Ok(Self { provider, releases })
    }

    /// Newest stable release.
    pub fn latest_stable(&self) -> Option<&FeedRelease> {
        self.releases.iter().find(|r| !r.prerelease)
    }

    /// Newest pre-release.
    pub fn latest_prerelease(&self) -> Option<&FeedRelease> {
        self.releases.iter().find(|r| r.prerelease)
    }

    /// Keep only the releases whose version matches `pattern`. GitHub
    /// versions are the tag without its leading `v`.
    pub fn retain_matching(&mut self, pattern: &Regex) {
        self.releases.retain(|r| pattern.is_match(&r.version));
    }
}

/// Whether a version string looks like a pre-release.
pub fn is_prerelease(version: &str) -> bool {
    let lower = version.to_ascii_lowercase();
    ["alpha", "beta", "rc", "pre", "dev", "preview", "nightly"]
        .iter()
        .any(|tag| lower.contains(tag))
}

/// Compare two version strings by their numeric components, falling back to
/// plain string order when those are equal.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    fn numbers(s: &str) -> Vec<u64> {
        s.split(|c: char| !c.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse().unwrap_or(u64::MAX))
            .collect()
    }
    numbers(a).cmp(&numbers(b)).then_with(|| a.cmp(b))
}

/// Sort newest first, by version and then build.
pub(crate) fn sort_newest_first(releases: &mut [FeedRelease]) {
    releases.sort_by(|a, b| {
        compare_versions(&b.version, &a.version).then_with(|| {
            compare_versions(
                b.build.as_deref().unwrap_or_default(),
                a.build.as_deref().unwrap_or_default(),
            )
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(version: &str, prerelease: bool) -> FeedRelease {
        FeedRelease {
            version: version.to_string(),
            build: None,
            urls: Vec::new(),
            minimum_system_version: None,
            prerelease,
        }
    }

    #[test]
    fn version_ordering() {
        assert_eq!(compare_versions("1.10.0", "1.9.2"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "2.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn stable_and_prerelease_selection() {
        let feed = Feed {
            provider: Provider::GitHub,
            releases: vec![
                release("2.0.0-beta.1", true),
                release("1.9.0", false),
                release("1.8.0", false),
            ],
        };
        assert_eq!(feed.latest_stable().map(|r| r.version.as_str()), Some("1.9.0"));
        assert_eq!(
            feed.latest_prerelease().map(|r| r.version.as_str()),
            Some("2.0.0-beta.1")
        );
    }

    #[test]
    fn filter_keeps_matching_versions() {
        let mut feed = Feed {
            provider: Provider::GitHub,
            releases: vec![
                release("3.0.0", false),
                release("2.4.1", false),
                release("2.4.0-rc.1", true),
            ],
        };
        feed.retain_matching(&Regex::new(r"^2\.4").unwrap());
        let kept: Vec<&str> = feed.releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(kept, vec!["2.4.1", "2.4.0-rc.1"]);
        assert_eq!(feed.latest_stable().map(|r| r.version.as_str()), Some("2.4.1"));
    }

    #[test]
    fn sorts_descending() {
        let mut releases = vec![release("0.9", false), release("1.10", false), release("1.2", false)];
        sort_newest_first(&mut releases);
        let order: Vec<&str> = releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(order, vec!["1.10", "1.2", "0.9"]);
    }

    #[test]
    fn prerelease_tags() {
        assert!(is_prerelease("2.0b1-beta"));
        assert!(is_prerelease("3.0.0-RC1"));
        assert!(!is_prerelease("3.0.0"));
    }
}
