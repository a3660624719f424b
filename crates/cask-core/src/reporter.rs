//! Reporter trait for dependency injection
//!
//! Lets the engine report batch progress without being coupled to a
//! specific terminal UI.

use cask_schema::CaskToken;

use crate::verifier::VerificationOutcome;

/// Receives progress events from batch checks.
pub trait CheckReporter: Send + Sync {
    /// A new phase has started (e.g. "Loading", "Checking").
    fn section(&self, title: &str);

    /// A check for `token` has started.
    fn checking(&self, token: &CaskToken);

    /// A check for `token` finished with `outcome`.
    fn outcome(&self, token: &CaskToken, outcome: &VerificationOutcome);

    /// `token` could not be checked at all (e.g. it failed to resolve).
    fn failed(&self, token: &CaskToken, reason: &str);

    /// Final summary of a batch.
    fn summary(&self, count: usize, elapsed_secs: f64);
}

impl<T: CheckReporter + ?Sized> CheckReporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn checking(&self, token: &CaskToken) {
        (**self).checking(token);
    }
    fn outcome(&self, token: &CaskToken, outcome: &VerificationOutcome) {
        (**self).outcome(token, outcome);
    }
    fn failed(&self, token: &CaskToken, reason: &str) {
        (**self).failed(token, reason);
    }
    fn summary(&self, count: usize, elapsed_secs: f64) {
        (**self).summary(count, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl CheckReporter for NullReporter {
    fn section(&self, _: &str) {}
    fn checking(&self, _: &CaskToken) {}
    fn outcome(&self, _: &CaskToken, _: &VerificationOutcome) {}
    fn failed(&self, _: &CaskToken, _: &str) {}
    fn summary(&self, _: usize, _: f64) {}
}
