//! Clause selection and descriptor assembly.
//!
//! Resolution walks the clauses in declaration order and takes the first
//! guarded clause whose guard holds, or the unconditional fallback when none
//! does. Version-critical fields (version, checksum, url, appcast,
//! auto_updates) come from the winning clause or, where it is silent, from
//! the manifest's outer scope; never from a clause that lost. Templates are
//! expanded last, against the version that was actually selected.

use cask_schema::{CaskToken, CaskVersion, Checksum, LicenseTag, Sha256Digest};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::facts::PlatformFacts;
use crate::manifest::{Clause, ClauseBody, Manifest};
use crate::predicate::PredicateError;
use crate::template::{Template, TemplateError};

/// Errors for a single resolution attempt. They never affect the manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A guard compared against a release outside the known order.
    #[error("{token}: clause {clause} compares against unknown release '{release}'")]
    UnknownRelease {
        /// Manifest token.
        token: CaskToken,
        /// Zero-based clause index.
        clause: usize,
        /// The offending release token.
        release: String,
    },

    /// A guard turned out to be structurally invalid.
    #[error("{token}: clause {clause}: {reason}")]
    MalformedPredicate {
        /// Manifest token.
        token: CaskToken,
        /// Zero-based clause index.
        clause: usize,
        /// Description of the problem.
        reason: String,
    },

    /// No guard matched and there is no fallback.
    #[error("{token}: no clause matches {facts} and no fallback is declared")]
    NoMatchingVersion {
        /// Manifest token.
        token: CaskToken,
        /// The facts that were evaluated.
        facts: PlatformFacts,
    },

    /// The selected clause lacks a required field.
    #[error("{token}: selected clause {clause} declares no {field}")]
    MissingField {
        /// Manifest token.
        token: CaskToken,
        /// Zero-based clause index.
        clause: usize,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A template could not be expanded against the selected version.
    #[error("{token}: cannot expand {field}: {source}")]
    Template {
        /// Manifest token.
        token: CaskToken,
        /// Which template failed (`url` or `appcast`).
        field: &'static str,
        /// Underlying template error.
        source: TemplateError,
    },
}

/// Which clause produced a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    /// A guarded clause matched.
    Guarded {
        /// Zero-based clause index.
        index: usize,
        /// The guard, rendered in manifest syntax.
        guard: String,
    },
    /// No guard matched; the unconditional clause applied.
    Fallback {
        /// Zero-based clause index.
        index: usize,
    },
}

impl Selection {
    /// Zero-based index of the selected clause.
    pub fn index(&self) -> usize {
        match self {
            Self::Guarded { index, .. } | Self::Fallback { index } => *index,
        }
    }
}

/// Expanded appcast of a resolved package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAppcast {
    /// Concrete feed URL.
    pub url: String,
    /// Recorded checkpoint.
    pub checkpoint: Sha256Digest,
}

/// A single concrete package descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCask {
    /// Manifest token.
    pub token: CaskToken,
    /// Selected version.
    pub version: CaskVersion,
    /// Selected installer checksum.
    pub checksum: Checksum,
    /// Expanded download URL.
    pub url: Option<String>,
    /// Expanded appcast, absent when this configuration has no feed.
    pub appcast: Option<ResolvedAppcast>,
    /// Whether the app updates itself.
    pub auto_updates: bool,
    /// Display name.
    pub name: Option<String>,
    /// Project homepage.
    pub homepage: Option<String>,
    /// License tag.
    pub license: Option<LicenseTag>,
    /// Installed artifact (`Example.app`).
    pub app: Option<String>,
    /// The clause that won.
    pub selected: Selection,
}

/// Resolve `manifest` against `facts`.
///
/// # Errors
///
/// Returns a [`ResolveError`] when a guard fails to evaluate, nothing
/// matches and there is no fallback, or a template cannot be expanded.
pub fn resolve(manifest: &Manifest, facts: &PlatformFacts) -> Result<ResolvedCask, ResolveError> {
    let token = manifest.token();
    let (selected, body) = select(manifest, facts)?;
    debug!(cask = %token, clause = selected.index(), %facts, "Selected clause");

    let outer = manifest.outer();
    let missing = |field| ResolveError::MissingField {
        token: token.clone(),
        clause: selected.index(),
        field,
    };

    let version = body
        .version
        .as_ref()
        .or(outer.version.as_ref())
        .ok_or_else(|| missing("version"))?
        .clone();
    let checksum = body
        .checksum
        .as_ref()
        .or(outer.checksum.as_ref())
        .ok_or_else(|| missing("sha256"))?
        .clone();

    let expand = |template: &Template, field| {
        template
            .expand(&version)
            .map_err(|source| ResolveError::Template {
                token: token.clone(),
                field,
                source,
            })
    };

    let url = body
        .url
        .as_ref()
        .or(outer.url.as_ref())
        .map(|t| expand(t, "url"))
        .transpose()?;

    let appcast = body
        .appcast
        .as_ref()
        .or(outer.appcast.as_ref())
        .map(|decl| {
            Ok(ResolvedAppcast {
                url: expand(&decl.url, "appcast")?,
                checkpoint: decl.checkpoint.clone(),
            })
        })
        .transpose()?;

    Ok(ResolvedCask {
        token: token.clone(),
        version,
        checksum,
        url,
        appcast,
        auto_updates: body.auto_updates.or(outer.auto_updates).unwrap_or(false),
        name: inherit(&body.display_name, &outer.display_name),
        homepage: inherit(&body.homepage, &outer.homepage),
        license: inherit(&body.license, &outer.license),
        app: inherit(&body.app, &outer.app),
        selected,
    })
}

/// First matching guarded clause, else the fallback.
fn select<'m>(
    manifest: &'m Manifest,
    facts: &PlatformFacts,
) -> Result<(Selection, &'m ClauseBody), ResolveError> {
    for (index, clause) in manifest.clauses().iter().enumerate() {
        let Clause::When { guard, body } = clause else {
            continue;
        };
        let matched = guard.evaluate(facts).map_err(|e| match e {
            PredicateError::UnknownRelease(release) => ResolveError::UnknownRelease {
                token: manifest.token().clone(),
                clause: index,
                release,
            },
            PredicateError::Malformed(reason) => ResolveError::MalformedPredicate {
                token: manifest.token().clone(),
                clause: index,
                reason,
            },
        })?;
        if matched {
            let selection = Selection::Guarded {
                index,
                guard: guard.to_string(),
            };
            return Ok((selection, body));
        }
    }

    manifest
        .fallback()
        .map(|(index, body)| (Selection::Fallback { index }, body))
        .ok_or_else(|| ResolveError::NoMatchingVersion {
            token: manifest.token().clone(),
            facts: *facts,
        })
}

fn inherit<T: Clone>(own: &Option<T>, outer: &Option<T>) -> Option<T> {
    own.as_ref().or(outer.as_ref()).cloned()
}
