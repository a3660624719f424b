//! Checker configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` in the
//! cask-check home, then `CASK_CHECK_*` environment variables. The binary
//! applies its command-line flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::io::RetryPolicy;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// An environment override could not be parsed.
    #[error("Invalid value for {var}: '{value}'")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// A setting is out of range.
    #[error("Invalid {field}: {reason}")]
    Invalid {
        /// Setting name.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Settings for feed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerConfig {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
    /// Maximum number of feeds checked at once.
    pub concurrency: usize,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Token for GitHub API requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            retry: RetryPolicy::default(),
            concurrency: 8,
            user_agent: crate::USER_AGENT.to_string(),
            github_token: None,
        }
    }
}

impl CheckerConfig {
    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reject settings no check can run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "must be at least one second",
            });
        }
        Ok(())
    }

    /// Load from the default config path and the process environment.
    ///
    /// # Errors
    ///
    /// See [`CheckerConfig::load_from`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(
            crate::paths::config_path().as_deref(),
            |var| std::env::var(var).ok(),
        )
    }

    /// Load from `path` (ignored when missing) and apply overrides read
    /// through `env`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file is unreadable or invalid, an
    /// environment override does not parse, or the result fails
    /// [`CheckerConfig::validate`].
    pub fn load_from(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "Loading config");
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            _ => Self::default(),
        };

        if let Some(v) = parse_env(&env, "CASK_CHECK_TIMEOUT")? {
            config.timeout_secs = v;
        }
        if let Some(v) = parse_env(&env, "CASK_CHECK_RETRIES")? {
            config.retry.max_attempts = v;
        }
        if let Some(v) = parse_env(&env, "CASK_CHECK_CONCURRENCY")? {
            config.concurrency = v;
        }
        if let Some(v) = env("CASK_CHECK_USER_AGENT") {
            config.user_agent = v;
        }
        if let Some(v) = env("CASK_CHECK_GITHUB_TOKEN").or_else(|| env("GITHUB_TOKEN")) {
            config.github_token = Some(v);
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    env(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { var, value })
        })
        .transpose()
}
