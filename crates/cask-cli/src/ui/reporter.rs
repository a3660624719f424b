//! Progress lines on stderr while feeds are checked.

use cask_core::{CheckReporter, VerificationOutcome};
use cask_schema::CaskToken;
use crossterm::style::Stylize;

use super::Theme;

/// [`CheckReporter`] that prints one line per finished check. Silent when
/// the final output is JSON.
#[derive(Debug, Clone, Copy)]
pub struct TerminalReporter {
    quiet: bool,
    theme: Theme,
}

impl TerminalReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            theme: Theme::default(),
        }
    }
}

impl CheckReporter for TerminalReporter {
    fn section(&self, title: &str) {
        if !self.quiet {
            eprintln!("{} {title}", "==>".with(self.theme.colors.header).bold());
        }
    }

    fn checking(&self, token: &CaskToken) {
        tracing::debug!(cask = %token, "Checking");
    }

    fn outcome(&self, token: &CaskToken, outcome: &VerificationOutcome) {
        if self.quiet {
            return;
        }
        let color = match outcome {
            VerificationOutcome::Unchanged { .. } => self.theme.colors.success,
            VerificationOutcome::Changed { .. } => self.theme.colors.warning,
            VerificationOutcome::Unavailable { .. } => self.theme.colors.error,
            VerificationOutcome::NotApplicable => self.theme.colors.secondary,
        };
        eprintln!(
            "  {:<width$} {}",
            token.as_str(),
            outcome.label().with(color),
            width = self.theme.layout.token_width
        );
    }

    fn failed(&self, token: &CaskToken, reason: &str) {
        if !self.quiet {
            eprintln!(
                "  {:<width$} {}",
                token.as_str(),
                reason.with(self.theme.colors.error),
                width = self.theme.layout.token_width
            );
        }
    }

    fn summary(&self, count: usize, elapsed_secs: f64) {
        if !self.quiet {
            let msg = format!("  {count} casks checked in {elapsed_secs:.1}s");
            eprintln!("{}", msg.with(self.theme.colors.secondary));
        }
    }
}
