//! Appcast command
use std::process::ExitCode;

use anyhow::{Context, Result};
use cask_core::feed::FeedRelease;
use cask_core::{CheckerConfig, FeedSnapshot, Verifier};
use regex::Regex;
use serde::Serialize;

use crate::ui::table::print_snapshot;

/// What `appcast` prints. With no `only_*` flag set, the full listing.
#[derive(Debug, Default, Clone)]
pub struct AppcastOptions {
    /// Keep only releases whose version matches.
    pub filter: Option<Regex>,
    /// Ignore pre-releases.
    pub stable: bool,
    pub only_checkpoint: bool,
    pub only_provider: bool,
    pub only_version: bool,
    pub only_downloads: bool,
    pub json: bool,
}

impl AppcastOptions {
    fn is_listing(&self) -> bool {
        !(self.only_checkpoint || self.only_provider || self.only_version || self.only_downloads)
    }
}

#[derive(Debug, Serialize)]
struct AppcastReport<'a> {
    #[serde(flatten)]
    snapshot: &'a FeedSnapshot,
    latest: Option<&'a FeedRelease>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prerelease: Option<&'a FeedRelease>,
}

/// Fetch `url` and report its checkpoint and the releases it advertises.
pub async fn appcast(url: &str, config: &CheckerConfig, opts: &AppcastOptions) -> Result<ExitCode> {
    let verifier = Verifier::from_config(config).context("Failed to build HTTP client")?;
    let mut snapshot = verifier
        .snapshot(url)
        .await
        .with_context(|| format!("Failed to read {url}"))?;

    if let Some(pattern) = &opts.filter {
        snapshot.feed.retain_matching(pattern);
    }
    if opts.stable {
        snapshot.feed.releases.retain(|r| !r.prerelease);
    }

    let latest = snapshot
        .feed
        .latest_stable()
        .or_else(|| snapshot.feed.releases.first());
    let prerelease = snapshot
        .feed
        .latest_prerelease()
        .filter(|pre| latest.is_none_or(|l| pre.version != l.version));

    if opts.json {
        let report = AppcastReport {
            snapshot: &snapshot,
            latest,
            prerelease,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    if opts.is_listing() {
        print_snapshot(&snapshot, latest, prerelease);
        return Ok(ExitCode::SUCCESS);
    }

    if opts.only_checkpoint {
        println!("{}", snapshot.checkpoint);
    }
    if opts.only_provider {
        println!("{}", snapshot.feed.provider);
    }
    if opts.only_version {
        match latest {
            Some(release) => match &release.build {
                Some(build) => println!("{} {build}", release.version),
                None => println!("{}", release.version),
            },
            None => println!("-"),
        }
    }
    if opts.only_downloads {
        for url in latest.map(|r| r.urls.as_slice()).unwrap_or_default() {
            println!("{url}");
        }
    }
    Ok(ExitCode::SUCCESS)
}
