//! In-memory manifest model.
//!
//! A [`Manifest`] is an outer scope plus an ordered list of clauses. The
//! outer scope holds metadata declared once (name, homepage, license, app)
//! and may also hold shared defaults for version-critical fields, as in a
//! cask that declares `version` once and branches only on `sha256`/`url`.
//! Clauses are either guarded or the single unconditional fallback.
//!
//! Manifests are validated on construction and immutable afterwards; every
//! resolution reads them without mutation, so one `Arc<Manifest>` can be
//! shared by any number of callers.

use cask_schema::{CaskToken, CaskVersion, Checksum, LicenseTag, Sha256Digest};
use serde::Serialize;
use thiserror::Error;

use crate::predicate::{Predicate, PredicateError};
use crate::template::Template;

/// Errors that reject a manifest at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The manifest has no clauses at all.
    #[error("Manifest '{0}' has no clauses")]
    Empty(CaskToken),

    /// The token is blank.
    #[error("Manifest token is empty")]
    EmptyToken,

    /// A guard is structurally invalid.
    #[error("Manifest '{token}', clause {clause}: {source}")]
    MalformedPredicate {
        /// Manifest token.
        token: CaskToken,
        /// Zero-based clause index.
        clause: usize,
        /// Underlying predicate error.
        source: PredicateError,
    },

    /// More than one unconditional clause.
    #[error("Manifest '{0}' declares more than one unconditional clause")]
    MultipleFallbacks(CaskToken),

    /// A clause can never yield a required field, even with outer defaults.
    #[error("Manifest '{token}', clause {clause}: no {field} declared")]
    MissingField {
        /// Manifest token.
        token: CaskToken,
        /// Zero-based clause index.
        clause: usize,
        /// Name of the missing field.
        field: &'static str,
    },
}

/// Appcast declaration: feed URL template plus the recorded checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppcastDecl {
    /// Feed URL; may reference the version.
    pub url: Template,
    /// Expected fingerprint of the feed content.
    pub checkpoint: Sha256Digest,
}

/// Fields a clause (or the outer scope) may declare. All optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClauseBody {
    /// `version`
    pub version: Option<CaskVersion>,
    /// `sha256`
    pub checksum: Option<Checksum>,
    /// `url`
    pub url: Option<Template>,
    /// `appcast ..., checkpoint: ...`
    pub appcast: Option<AppcastDecl>,
    /// `auto_updates`
    pub auto_updates: Option<bool>,
    /// `name`
    pub display_name: Option<String>,
    /// `homepage`
    pub homepage: Option<String>,
    /// `license`
    pub license: Option<LicenseTag>,
    /// `app`
    pub app: Option<String>,
}

impl ClauseBody {
    /// Whether no field is declared.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether any version-critical field is declared.
    pub fn has_release_fields(&self) -> bool {
        self.version.is_some()
            || self.checksum.is_some()
            || self.url.is_some()
            || self.appcast.is_some()
            || self.auto_updates.is_some()
    }
}

/// One definition clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Applies when `guard` holds.
    When {
        /// Guard predicate.
        guard: Predicate,
        /// Fields supplied by this clause.
        body: ClauseBody,
    },
    /// Applies when no guarded clause matched.
    Otherwise(ClauseBody),
}

impl Clause {
    /// The clause body.
    pub fn body(&self) -> &ClauseBody {
        match self {
            Self::When { body, .. } | Self::Otherwise(body) => body,
        }
    }

    /// The guard, if any.
    pub fn guard(&self) -> Option<&Predicate> {
        match self {
            Self::When { guard, .. } => Some(guard),
            Self::Otherwise(_) => None,
        }
    }
}

/// A validated, immutable package definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    token: CaskToken,
    outer: ClauseBody,
    clauses: Vec<Clause>,
}

impl Manifest {
    /// Build and validate a manifest.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] when the manifest has no clauses, a guard
    /// is malformed, there are several fallbacks, or a clause cannot yield a
    /// version or checksum even with the outer scope's defaults.
    pub fn new(
        token: impl Into<CaskToken>,
        outer: ClauseBody,
        clauses: Vec<Clause>,
    ) -> Result<Self, ManifestError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ManifestError::EmptyToken);
        }
        if clauses.is_empty() {
            return Err(ManifestError::Empty(token));
        }

        let mut fallbacks = 0;
        for (index, clause) in clauses.iter().enumerate() {
            match clause {
                Clause::When { guard, .. } => {
                    guard
                        .validate()
                        .map_err(|source| ManifestError::MalformedPredicate {
                            token: token.clone(),
                            clause: index,
                            source,
                        })?;
                }
                Clause::Otherwise(_) => fallbacks += 1,
            }

            let body = clause.body();
            if body.version.is_none() && outer.version.is_none() {
                return Err(ManifestError::MissingField {
                    token,
                    clause: index,
                    field: "version",
                });
            }
            if body.checksum.is_none() && outer.checksum.is_none() {
                return Err(ManifestError::MissingField {
                    token,
                    clause: index,
                    field: "sha256",
                });
            }
        }

        if fallbacks > 1 {
            return Err(ManifestError::MultipleFallbacks(token));
        }

        Ok(Self {
            token,
            outer,
            clauses,
        })
    }

    /// The manifest's token.
    pub fn token(&self) -> &CaskToken {
        &self.token
    }

    /// Outer-scope declarations.
    pub fn outer(&self) -> &ClauseBody {
        &self.outer
    }

    /// Clauses in declaration order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The unconditional clause, if declared.
    pub fn fallback(&self) -> Option<(usize, &ClauseBody)> {
        self.clauses.iter().enumerate().find_map(|(i, c)| match c {
            Clause::Otherwise(body) => Some((i, body)),
            Clause::When { .. } => None,
        })
    }

    /// Whether any configuration of this manifest declares an appcast.
    pub fn has_appcast(&self) -> bool {
        self.outer.appcast.is_some() || self.clauses.iter().any(|c| c.body().appcast.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ReleaseOp;

    const SHA: &str = "9065ae8493fa73bfdf5d29ffcd0012cd343475cf3d550ae526407b9910eb35b7";

    fn body(version: &str) -> ClauseBody {
        ClauseBody {
            version: Some(CaskVersion::new(version).unwrap()),
            checksum: Some(Checksum::parse(SHA).unwrap()),
            ..ClauseBody::default()
        }
    }

    #[test]
    fn empty_manifest_rejected() {
        let err = Manifest::new("empty", ClauseBody::default(), vec![]).unwrap_err();
        assert_eq!(err, ManifestError::Empty(CaskToken::new("empty")));
    }

    #[test]
    fn blank_token_rejected() {
        let err = Manifest::new("  ", ClauseBody::default(), vec![Clause::Otherwise(body("1"))])
            .unwrap_err();
        assert_eq!(err, ManifestError::EmptyToken);
    }

    #[test]
    fn malformed_guard_rejected_at_load() {
        let clauses = vec![
            Clause::When {
                guard: Predicate::All(vec![]),
                body: body("1.0"),
            },
            Clause::Otherwise(body("2.0")),
        ];
        let err = Manifest::new("bad", ClauseBody::default(), clauses).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::MalformedPredicate { clause: 0, .. }
        ));
    }

    #[test]
    fn two_fallbacks_rejected() {
        let clauses = vec![Clause::Otherwise(body("1")), Clause::Otherwise(body("2"))];
        assert!(matches!(
            Manifest::new("dup", ClauseBody::default(), clauses),
            Err(ManifestError::MultipleFallbacks(_))
        ));
    }

    #[test]
    fn version_may_come_from_outer_scope() {
        let outer = ClauseBody {
            version: Some(CaskVersion::new("1.1.0").unwrap()),
            ..ClauseBody::default()
        };
        let branch = ClauseBody {
            checksum: Some(Checksum::NoCheck),
            ..ClauseBody::default()
        };
        let clauses = vec![
            Clause::When {
                guard: Predicate::release(ReleaseOp::Le, "leopard"),
                body: branch.clone(),
            },
            Clause::Otherwise(branch),
        ];
        let m = Manifest::new("global-version", outer, clauses).unwrap();
        assert_eq!(m.fallback().map(|(i, _)| i), Some(1));
        assert!(!m.has_appcast());
    }

    #[test]
    fn missing_checksum_rejected() {
        let no_sha = ClauseBody {
            version: Some(CaskVersion::new("1.0").unwrap()),
            ..ClauseBody::default()
        };
        let err = Manifest::new("x", ClauseBody::default(), vec![Clause::Otherwise(no_sha)])
            .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::MissingField {
                field: "sha256",
                ..
            }
        ));
    }
}
