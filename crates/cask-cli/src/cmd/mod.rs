//! Subcommand implementations.

pub mod appcast;
pub mod check;
pub mod resolve;
pub mod verify;

use std::collections::BTreeMap;
use std::process::ExitCode;

use cask_core::{EngineError, PlatformFacts, VerificationOutcome};
use serde::Serialize;

/// Exit status for a batch that found at least one changed checkpoint.
pub const EXIT_OUTDATED: u8 = 2;

/// One entry of a JSON report.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReportEntry {
    Outcome(VerificationOutcome),
    Error { error: String },
}

/// A manifest file that never made it into the catalog.
#[derive(Debug, Serialize)]
pub struct LoadFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub error: String,
}

impl From<&EngineError> for LoadFailure {
    fn from(e: &EngineError) -> Self {
        Self {
            path: e.path().map(|p| p.display().to_string()),
            error: e.to_string(),
        }
    }
}

/// Machine-readable result of `verify` and `check`.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub checked_at: String,
    pub facts: &'a PlatformFacts,
    pub results: BTreeMap<String, ReportEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub load_errors: Vec<LoadFailure>,
}

impl<'a> Report<'a> {
    pub fn new(facts: &'a PlatformFacts) -> Self {
        Self {
            checked_at: chrono::Utc::now().to_rfc3339(),
            facts,
            results: BTreeMap::new(),
            load_errors: Vec::new(),
        }
    }

    pub fn print(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// Exit status for a finished batch. Failures win over `--outdated`.
pub fn exit_status(failed: bool, changed: bool, outdated: bool) -> u8 {
    if failed {
        1
    } else if outdated && changed {
        EXIT_OUTDATED
    } else {
        0
    }
}

/// [`exit_status`] as a process exit code.
pub fn exit_code(failed: bool, changed: bool, outdated: bool) -> ExitCode {
    ExitCode::from(exit_status(failed, changed, outdated))
}
