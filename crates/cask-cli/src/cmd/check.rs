//! Check command
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use cask_core::{Catalog, CheckerConfig, Engine, PlatformFacts, Verifier};

use super::{LoadFailure, Report, ReportEntry, exit_code};
use crate::ui::table::{OutcomeRow, outcome_table};
use crate::ui::{TerminalReporter, print_error};

/// Verify every manifest below `dir`.
pub async fn check(
    dir: &Path,
    facts: &PlatformFacts,
    config: &CheckerConfig,
    outdated: bool,
    json: bool,
) -> Result<ExitCode> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let (catalog, failures) = Catalog::load_dir(dir);
    if !json {
        for failure in &failures {
            print_error(&failure.to_string());
        }
    }
    if catalog.is_empty() && failures.is_empty() {
        bail!("No manifests found in {}", dir.display());
    }

    let verifier = Verifier::from_config(config).context("Failed to build HTTP client")?;
    let engine = Engine::new(catalog, verifier, config.concurrency);
    let reporter = TerminalReporter::new(json);
    let results = engine.check_all_with(facts, &reporter).await;

    let mut failed = !failures.is_empty();
    let mut changed = false;
    let mut report = Report::new(facts);
    report.load_errors = failures.iter().map(LoadFailure::from).collect();
    let mut rows = Vec::new();

    for (token, result) in results {
        match result {
            Ok(checked) => {
                changed |= checked.outcome.is_changed();
                rows.push(OutcomeRow::new(
                    token.to_string(),
                    Some(&checked.cask),
                    &checked.outcome,
                ));
                report
                    .results
                    .insert(token.to_string(), ReportEntry::Outcome(checked.outcome));
            }
            Err(e) => {
                failed = true;
                rows.push(OutcomeRow::failed(token.to_string(), e.to_string()));
                report
                    .results
                    .insert(token.to_string(), ReportEntry::Error { error: e.to_string() });
            }
        }
    }

    if json {
        report.print()?;
    } else {
        println!("{}", outcome_table(&rows));
    }
    Ok(exit_code(failed, changed, outdated))
}
