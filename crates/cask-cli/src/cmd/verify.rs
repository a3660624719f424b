//! Verify command
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cask_core::{CheckReporter, CheckerConfig, PlatformFacts, Verifier, source};
use cask_schema::CaskToken;

use super::{Report, ReportEntry, exit_code};
use crate::ui::table::{OutcomeRow, outcome_table};
use crate::ui::{TerminalReporter, print_error};

/// Resolve and verify each file in turn. A file whose token was already
/// checked is reported as an error under its path.
pub async fn verify(
    files: &[PathBuf],
    facts: &PlatformFacts,
    config: &CheckerConfig,
    json: bool,
) -> Result<ExitCode> {
    let verifier = Verifier::from_config(config).context("Failed to build HTTP client")?;
    let reporter = TerminalReporter::new(json);
    let mut report = Report::new(facts);
    let mut rows = Vec::new();
    let mut failed = false;
    let mut seen: BTreeMap<CaskToken, String> = BTreeMap::new();

    for file in files {
        let label = file.display().to_string();
        let cask = match source::load_file(file)
            .map_err(anyhow::Error::from)
            .and_then(|m| cask_core::resolve(&m, facts).map_err(anyhow::Error::from))
        {
            Ok(cask) => cask,
            Err(e) => {
                failed = true;
                if !json {
                    print_error(&format!("{label}: {e}"));
                }
                report
                    .results
                    .insert(label.clone(), ReportEntry::Error { error: e.to_string() });
                rows.push(OutcomeRow::failed(label, e.to_string()));
                continue;
            }
        };

        if let Some(first) = seen.get(&cask.token) {
            failed = true;
            let error = format!(
                "Duplicate cask token '{}' (first loaded from {first})",
                cask.token
            );
            if !json {
                print_error(&format!("{label}: {error}"));
            }
            report
                .results
                .insert(label.clone(), ReportEntry::Error { error: error.clone() });
            rows.push(OutcomeRow::failed(label, error));
            continue;
        }
        seen.insert(cask.token.clone(), label);

        reporter.checking(&cask.token);
        let outcome = verifier.verify(&cask).await;
        reporter.outcome(&cask.token, &outcome);
        rows.push(OutcomeRow::new(cask.token.to_string(), Some(&cask), &outcome));
        report
            .results
            .insert(cask.token.to_string(), ReportEntry::Outcome(outcome));
    }

    if json {
        report.print()?;
    } else {
        println!("{}", outcome_table(&rows));
    }
    Ok(exit_code(failed, false, false))
}
