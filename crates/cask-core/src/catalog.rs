//! Manifest catalogs and the verification engine.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use cask_schema::CaskToken;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::facts::FactProvider;
use crate::manifest::Manifest;
use crate::reporter::{CheckReporter, NullReporter};
use crate::resolver::{self, ResolveError, ResolvedCask};
use crate::source::{self, Format, SourceError};
use crate::verifier::{VerificationOutcome, Verifier};

/// Errors raised by the catalog and engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No manifest with this token is loaded.
    #[error("Unknown cask: {0}")]
    UnknownCask(CaskToken),

    /// Two manifests share a token.
    #[error("Duplicate cask token '{token}'")]
    DuplicateToken {
        /// The token defined twice.
        token: CaskToken,
    },

    /// A manifest file failed to load.
    #[error("{}: {source}", .path.display())]
    Source {
        /// The manifest file.
        path: PathBuf,
        /// Underlying source error.
        source: SourceError,
    },

    /// Resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The catalog directory could not be walked.
    #[error("Failed to scan {}: {source}", .path.display())]
    Walk {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying walk error.
        source: walkdir::Error,
    },
}

impl EngineError {
    /// The file or directory the error concerns, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Source { path, .. } | Self::Walk { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// A resolved manifest together with the outcome of its appcast check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedCask {
    /// The descriptor the check ran against.
    pub cask: ResolvedCask,
    /// What the check found.
    pub outcome: VerificationOutcome,
}

/// A set of manifests keyed by token.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    manifests: BTreeMap<CaskToken, Arc<Manifest>>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateToken`] if the token is already taken.
    pub fn insert(&mut self, manifest: Manifest) -> Result<(), EngineError> {
        match self.manifests.entry(manifest.token().clone()) {
            Entry::Occupied(e) => Err(EngineError::DuplicateToken {
                token: e.key().clone(),
            }),
            Entry::Vacant(e) => {
                e.insert(Arc::new(manifest));
                Ok(())
            }
        }
    }

    /// Look up a manifest by token, ignoring case and surrounding blanks.
    pub fn get(&self, token: &str) -> Option<&Arc<Manifest>> {
        self.manifests.get(&CaskToken::new(token))
    }

    /// Number of manifests.
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Manifests in token order.
    pub fn iter(&self) -> impl Iterator<Item = (&CaskToken, &Arc<Manifest>)> {
        self.manifests.iter()
    }

    /// Load every `*.rb` and `*.toml` manifest below `root`.
    ///
    /// Files that fail to load do not stop the scan; they are returned next
    /// to the catalog.
    pub fn load_dir(root: &Path) -> (Self, Vec<EngineError>) {
        let mut catalog = Self::new();
        let mut failures = Vec::new();

        for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    failures.push(EngineError::Walk {
                        path: root.to_path_buf(),
                        source,
                    });
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || Format::from_path(path).is_none() {
                continue;
            }

            match source::load_file(path) {
                Ok(manifest) => {
                    debug!(path = %path.display(), cask = %manifest.token(), "Loaded manifest");
                    if let Err(e) = catalog.insert(manifest) {
                        warn!(path = %path.display(), error = %e, "Skipping manifest");
                        failures.push(e);
                    }
                }
                Err(source) => {
                    warn!(path = %path.display(), error = %source, "Failed to load manifest");
                    failures.push(EngineError::Source {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }

        (catalog, failures)
    }
}

impl FromIterator<Manifest> for Catalog {
    /// The first manifest for a token wins; later duplicates are logged and
    /// dropped.
    fn from_iter<I: IntoIterator<Item = Manifest>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for manifest in iter {
            if let Err(e) = catalog.insert(manifest) {
                warn!(error = %e, "Dropping manifest");
            }
        }
        catalog
    }
}

/// Resolution and verification over a catalog.
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Catalog,
    verifier: Verifier,
    concurrency: usize,
}

impl Engine {
    /// Engine checking at most `concurrency` feeds at once.
    pub fn new(catalog: Catalog, verifier: Verifier, concurrency: usize) -> Self {
        Self {
            catalog,
            verifier,
            concurrency: concurrency.max(1),
        }
    }

    /// The loaded manifests.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resolve one manifest against the given facts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownCask`] or the [`ResolveError`].
    pub fn resolve(
        &self,
        token: &str,
        facts: &impl FactProvider,
    ) -> Result<ResolvedCask, EngineError> {
        let manifest = self
            .catalog
            .get(token)
            .ok_or_else(|| EngineError::UnknownCask(CaskToken::new(token)))?;
        Ok(resolver::resolve(manifest, &facts.snapshot())?)
    }

    /// Resolve one manifest and verify its appcast.
    ///
    /// # Errors
    ///
    /// Returns an error only when resolution fails; fetch problems are an
    /// [`VerificationOutcome::Unavailable`] outcome.
    pub async fn verify(
        &self,
        token: &str,
        facts: &impl FactProvider,
    ) -> Result<VerificationOutcome, EngineError> {
        let cask = self.resolve(token, facts)?;
        Ok(self.verifier.verify(&cask).await)
    }

    /// Verify every manifest in the catalog.
    pub async fn verify_all(
        &self,
        facts: &impl FactProvider,
    ) -> BTreeMap<CaskToken, Result<VerificationOutcome, ResolveError>> {
        self.verify_all_with(facts, &NullReporter).await
    }

    /// Verify every manifest, reporting progress. One failing manifest never
    /// affects the others.
    pub async fn verify_all_with(
        &self,
        facts: &impl FactProvider,
        reporter: &dyn CheckReporter,
    ) -> BTreeMap<CaskToken, Result<VerificationOutcome, ResolveError>> {
        self.check_all_with(facts, reporter)
            .await
            .into_iter()
            .map(|(token, result)| (token, result.map(|checked| checked.outcome)))
            .collect()
    }

    /// Like [`Engine::verify_all_with`], keeping each resolved descriptor
    /// next to its outcome.
    pub async fn check_all_with(
        &self,
        facts: &impl FactProvider,
        reporter: &dyn CheckReporter,
    ) -> BTreeMap<CaskToken, Result<CheckedCask, ResolveError>> {
        let facts = facts.snapshot();
        let started = Instant::now();
        reporter.section("Checking");

        let results: BTreeMap<_, _> = stream::iter(self.catalog.iter())
            .map(|(token, manifest)| async move {
                reporter.checking(token);
                let result = match resolver::resolve(manifest, &facts) {
                    Ok(cask) => {
                        let outcome = self.verifier.verify(&cask).await;
                        reporter.outcome(token, &outcome);
                        Ok(CheckedCask { cask, outcome })
                    }
                    Err(e) => {
                        reporter.failed(token, &e.to_string());
                        Err(e)
                    }
                };
                (token.clone(), result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        reporter.summary(results.len(), started.elapsed().as_secs_f64());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckerConfig;
    use crate::facts::PlatformFacts;
    use crate::io::{FeedFetcher, FetchError};
    use crate::source::{Format, parse_str};
    use async_trait::async_trait;
    use bytes::Bytes;
    use cask_schema::MacRelease;

    struct Offline;

    #[async_trait]
    impl FeedFetcher for Offline {
        async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
            Err(FetchError::Status(404))
        }
    }

    fn manifest(token: &str, appcast: bool) -> Manifest {
        let appcast = if appcast {
            "  appcast 'https://example.com/appcast.xml',\n          checkpoint: 'e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855'\n"
        } else {
            ""
        };
        let src = format!("cask '{token}' do\n  version '1.0'\n  sha256 :no_check\n{appcast}end\n");
        parse_str(&src, Format::Dsl).unwrap()
    }

    fn engine(catalog: Catalog) -> Engine {
        let verifier = Verifier::new(Arc::new(Offline), &CheckerConfig::default());
        Engine::new(catalog, verifier, 4)
    }

    #[test]
    fn duplicate_tokens_are_rejected() {
        let mut catalog = Catalog::new();
        catalog.insert(manifest("a", false)).unwrap();
        assert!(matches!(
            catalog.insert(manifest("a", true)),
            Err(EngineError::DuplicateToken { .. })
        ));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn collecting_keeps_the_first_duplicate() {
        let catalog: Catalog = [manifest("a", false), manifest("A", true)]
            .into_iter()
            .collect();
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.get("a").unwrap().has_appcast());
    }

    #[test]
    fn lookups_ignore_case() {
        let catalog: Catalog = [manifest("Mixed-Case", false)].into_iter().collect();
        assert!(catalog.get("mixed-case").is_some());
        assert!(catalog.get("MIXED-CASE").is_some());
        assert!(catalog.get(" Mixed-Case ").is_some());

        let engine = engine(catalog);
        let facts = PlatformFacts::new(MacRelease::Lion);
        assert_eq!(engine.resolve("MIXED-case", &facts).unwrap().token, "mixed-case");
    }

    #[test]
    fn unknown_cask() {
        let engine = engine(Catalog::new());
        let facts = PlatformFacts::new(MacRelease::Lion);
        assert!(matches!(
            engine.resolve("missing", &facts),
            Err(EngineError::UnknownCask(_))
        ));
    }

    #[tokio::test]
    async fn verify_all_covers_every_manifest() {
        let catalog: Catalog = [manifest("b", false), manifest("a", true)]
            .into_iter()
            .collect();
        let engine = engine(catalog);
        let results = engine
            .verify_all(&PlatformFacts::new(MacRelease::Lion))
            .await;

        let tokens: Vec<&str> = results.keys().map(|t| t.as_str()).collect();
        assert_eq!(tokens, vec!["a", "b"]);
        assert!(matches!(
            results["a"],
            Ok(VerificationOutcome::Unavailable { .. })
        ));
        assert_eq!(results["b"], Ok(VerificationOutcome::NotApplicable));
    }

    #[tokio::test]
    async fn checked_casks_keep_their_descriptor() {
        let catalog: Catalog = [manifest("a", true)].into_iter().collect();
        let engine = engine(catalog);
        let results = engine
            .check_all_with(&PlatformFacts::new(MacRelease::Lion), &NullReporter)
            .await;

        let checked = results["a"].as_ref().unwrap();
        assert_eq!(checked.cask.version.raw(), "1.0");
        assert_eq!(
            checked.cask.appcast.as_ref().map(|a| a.url.as_str()),
            Some("https://example.com/appcast.xml")
        );
        assert!(matches!(checked.outcome, VerificationOutcome::Unavailable { .. }));
    }
}
