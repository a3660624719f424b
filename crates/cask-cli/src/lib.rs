//! cask-check - resolve cask manifests and verify appcast checkpoints
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Evaluates the conditional clauses of a cask against an explicit set of
//! platform facts and checks whether the appcast feeds they point at have
//! moved past their recorded checkpoints.
//!
//! # Exit Status
//!
//! ```text
//! 0  success
//! 1  a manifest failed to load, resolve or be checked
//! 2  --outdated was given and at least one checkpoint changed
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use cask_core::{CheckerConfig, PlatformFacts};
use cask_schema::{CpuArch, MacRelease, WordSize};
use clap::{Args, Parser, Subcommand};
use regex::Regex;

#[derive(Debug, Parser)]
#[command(name = "cask-check")]
#[command(author, version, about = "Resolve cask manifests and verify appcast checkpoints")]
pub struct Cli {
    #[command(flatten)]
    pub network: NetworkArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve a manifest to a single package descriptor
    Resolve {
        /// Manifest file (.rb or .toml)
        file: PathBuf,
        #[command(flatten)]
        platform: PlatformArgs,
        /// Print the descriptor as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve manifests and verify their appcast checkpoints
    Verify {
        /// Manifest files (.rb or .toml)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        platform: PlatformArgs,
        /// Print the outcomes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify every manifest below a directory
    Check {
        /// Directory containing .rb and .toml manifests
        dir: PathBuf,
        #[command(flatten)]
        platform: PlatformArgs,
        /// Exit with status 2 when any checkpoint changed
        #[arg(long)]
        outdated: bool,
        /// Print the outcomes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch an appcast and show its checkpoint and newest releases
    Appcast {
        /// Feed URL
        url: String,
        /// Keep only releases whose version matches this regex
        #[arg(long, short = 'f', value_name = "REGEX")]
        filter: Option<Regex>,
        /// Ignore pre-releases
        #[arg(long, alias = "github-latest")]
        stable: bool,
        /// Print only the checkpoint
        #[arg(long, short = 'c')]
        checkpoint: bool,
        /// Print only the provider
        #[arg(long, short = 'p')]
        provider: bool,
        /// Print only the latest version and build
        #[arg(long = "app-version", short = 'V')]
        app_version: bool,
        /// Print only the latest download URLs
        #[arg(long, short = 'd')]
        downloads: bool,
        /// Print the snapshot as JSON
        #[arg(long, conflicts_with_all = ["checkpoint", "provider", "app_version", "downloads"])]
        json: bool,
    },
}

/// Platform to resolve for.
#[derive(Debug, Args)]
pub struct PlatformArgs {
    /// macOS release, by name or number (e.g. mavericks, 10.9)
    #[arg(long, short = 'r')]
    pub release: MacRelease,
    /// CPU family (intel, arm, ppc)
    #[arg(long, default_value = "intel")]
    pub arch: CpuArch,
    /// Word size (32 or 64)
    #[arg(long, default_value = "64")]
    pub bits: WordSize,
}

impl PlatformArgs {
    pub fn facts(&self) -> PlatformFacts {
        PlatformFacts::new(self.release)
            .with_arch(self.arch)
            .with_word_size(self.bits)
    }
}

/// Overrides for the network settings in `config.toml`.
#[derive(Debug, Args)]
pub struct NetworkArgs {
    /// Per-attempt timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
    /// Attempts per feed, including the first
    #[arg(long, global = true)]
    pub retries: Option<u32>,
    /// Feeds checked at once
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,
    /// Token for GitHub API requests
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

impl NetworkArgs {
    /// Apply the flags on top of a loaded configuration.
    pub fn apply(&self, config: &mut CheckerConfig) {
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        if let Some(attempts) = self.retries {
            config.retry.max_attempts = attempts;
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if let Some(token) = &self.github_token {
            config.github_token = Some(token.clone());
        }
    }
}
