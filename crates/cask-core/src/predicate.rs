//! Guard predicates over platform facts.
//!
//! A guard is a small boolean expression tree: release comparisons, CPU
//! capability checks and the usual combinators. Evaluation is pure and
//! total over well-formed trees; the only failures are structural problems
//! and release tokens outside the known order, which must never quietly
//! evaluate to `false`.

use cask_schema::{Capability, MacRelease};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facts::PlatformFacts;

/// Errors raised while validating or evaluating a predicate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredicateError {
    /// The expression tree is structurally invalid.
    #[error("Malformed predicate: {0}")]
    Malformed(String),

    /// A release comparison names a token outside the known release order.
    #[error("Unknown macOS release '{0}' in guard")]
    UnknownRelease(String),
}

/// Comparison operator for release guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseOp {
    /// `==`
    #[serde(rename = "==")]
    Eq,
    /// `!=`
    #[serde(rename = "!=")]
    Ne,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
}

impl ReleaseOp {
    /// The operator as written in guards.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Parse an operator symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        })
    }

    fn compare(self, lhs: MacRelease, rhs: MacRelease) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// A guard expression.
///
/// Release tokens are kept as written and looked up at evaluation time, so a
/// manifest mentioning a release this build does not know still loads; only
/// resolutions that actually reach that comparison fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// `MacOS.release <op> :token`
    Release {
        /// Comparison operator.
        op: ReleaseOp,
        /// Release token, without the leading colon.
        token: String,
    },
    /// `Hardware::CPU.<capability>?`
    Capability(Capability),
    /// `!expr`
    Not(Box<Predicate>),
    /// `a && b && ...`
    All(Vec<Predicate>),
    /// `a || b || ...`
    Any(Vec<Predicate>),
}

impl Predicate {
    /// Build a release comparison.
    pub fn release(op: ReleaseOp, token: &str) -> Self {
        let token = token.trim();
        Self::Release {
            op,
            token: token.strip_prefix(':').unwrap_or(token).to_string(),
        }
    }

    /// Negate a predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Predicate) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Check structural well-formedness.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError::Malformed`] for empty combinators or empty
    /// release tokens.
    pub fn validate(&self) -> Result<(), PredicateError> {
        match self {
            Self::Release { token, .. } => {
                if token.is_empty() {
                    return Err(PredicateError::Malformed(
                        "release comparison without a release token".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Capability(_) => Ok(()),
            Self::Not(inner) => inner.validate(),
            Self::All(items) | Self::Any(items) => {
                if items.is_empty() {
                    return Err(PredicateError::Malformed(format!(
                        "empty {} combinator",
                        if matches!(self, Self::All(_)) { "all" } else { "any" }
                    )));
                }
                items.iter().try_for_each(Predicate::validate)
            }
        }
    }

    /// Evaluate against a fact snapshot.
    ///
    /// `All`/`Any` short-circuit left to right.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError::UnknownRelease`] when an evaluated comparison
    /// names an unknown release, and [`PredicateError::Malformed`] for
    /// structurally invalid trees.
    pub fn evaluate(&self, facts: &PlatformFacts) -> Result<bool, PredicateError> {
        match self {
            Self::Release { op, token } => {
                if token.is_empty() {
                    return Err(PredicateError::Malformed(
                        "release comparison without a release token".to_string(),
                    ));
                }
                let rhs = MacRelease::from_token(token)
                    .map_err(|_| PredicateError::UnknownRelease(token.clone()))?;
                Ok(op.compare(facts.release, rhs))
            }
            Self::Capability(cap) => Ok(facts.has(*cap)),
            Self::Not(inner) => Ok(!inner.evaluate(facts)?),
            Self::All(items) => {
                if items.is_empty() {
                    return Err(PredicateError::Malformed("empty all combinator".to_string()));
                }
                for item in items {
                    if !item.evaluate(facts)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any(items) => {
                if items.is_empty() {
                    return Err(PredicateError::Malformed("empty any combinator".to_string()));
                }
                for item in items {
                    if item.evaluate(facts)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn fmt_operand(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All(_) | Self::Any(_) => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

/// Renders in the guard syntax accepted by the manifest sources.
impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Release { op, token } => write!(f, "MacOS.release {} :{token}", op.symbol()),
            Self::Capability(cap) => write!(f, "{cap}"),
            Self::Not(inner) => {
                write!(f, "!")?;
                inner.fmt_operand(f)
            }
            Self::All(items) | Self::Any(items) => {
                let sep = if matches!(self, Self::All(_)) { " && " } else { " || " };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    item.fmt_operand(f)?;
                }
                Ok(())
            }
        }
    }
}

/// Evaluate `predicate` against `facts`.
///
/// # Errors
///
/// See [`Predicate::evaluate`].
pub fn evaluate(predicate: &Predicate, facts: &PlatformFacts) -> Result<bool, PredicateError> {
    predicate.evaluate(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_schema::{CpuArch, WordSize};

    fn facts(release: MacRelease) -> PlatformFacts {
        PlatformFacts::new(release)
    }

    #[test]
    fn at_most_leopard() {
        let p = Predicate::release(ReleaseOp::Le, ":leopard");
        assert!(p.evaluate(&facts(MacRelease::Tiger)).unwrap());
        assert!(p.evaluate(&facts(MacRelease::Leopard)).unwrap());
        assert!(!p.evaluate(&facts(MacRelease::SnowLeopard)).unwrap());
        assert!(!p.evaluate(&facts(MacRelease::Sonoma)).unwrap());
    }

    #[test]
    fn every_operator() {
        let at = facts(MacRelease::Lion);
        let cases = [
            (ReleaseOp::Eq, "lion", true),
            (ReleaseOp::Ne, "lion", false),
            (ReleaseOp::Lt, "mountain_lion", true),
            (ReleaseOp::Le, "snow_leopard", false),
            (ReleaseOp::Gt, "snow_leopard", true),
            (ReleaseOp::Ge, "mavericks", false),
        ];
        for (op, token, expected) in cases {
            assert_eq!(
                Predicate::release(op, token).evaluate(&at).unwrap(),
                expected,
                "{op:?} {token}"
            );
        }
    }

    #[test]
    fn unknown_release_is_an_error_not_false() {
        let p = Predicate::release(ReleaseOp::Le, ":rhapsody");
        assert_eq!(
            p.evaluate(&facts(MacRelease::Lion)),
            Err(PredicateError::UnknownRelease("rhapsody".to_string()))
        );

        let eq = Predicate::release(ReleaseOp::Eq, "copland");
        assert!(matches!(
            eq.evaluate(&facts(MacRelease::Lion)),
            Err(PredicateError::UnknownRelease(_))
        ));
    }

    #[test]
    fn capability_or_release() {
        // Hardware::CPU.is_32_bit? || MacOS.release <= :leopard
        let p = Predicate::Any(vec![
            Predicate::Capability(Capability::Is32Bit),
            Predicate::release(ReleaseOp::Le, "leopard"),
        ]);

        let modern = facts(MacRelease::Mavericks);
        assert!(!p.evaluate(&modern).unwrap());

        let old_cpu = modern.with_arch(CpuArch::Intel).with_word_size(WordSize::Bits32);
        assert!(p.evaluate(&old_cpu).unwrap());

        assert!(p.evaluate(&facts(MacRelease::Tiger)).unwrap());
    }

    #[test]
    fn negation_and_conjunction() {
        let p = Predicate::All(vec![
            Predicate::release(ReleaseOp::Ge, "lion"),
            Predicate::not(Predicate::Capability(Capability::PowerPc)),
        ]);
        assert!(p.evaluate(&facts(MacRelease::Yosemite)).unwrap());
        assert!(!p.evaluate(&facts(MacRelease::Leopard)).unwrap());
    }

    #[test]
    fn short_circuit_skips_unreached_operands() {
        let p = Predicate::Any(vec![
            Predicate::release(ReleaseOp::Eq, "lion"),
            Predicate::release(ReleaseOp::Eq, "rhapsody"),
        ]);
        assert!(p.evaluate(&facts(MacRelease::Lion)).unwrap());
        assert!(p.evaluate(&facts(MacRelease::Tiger)).is_err());
    }

    #[test]
    fn validate_rejects_empty_combinators() {
        assert!(matches!(
            Predicate::All(vec![]).validate(),
            Err(PredicateError::Malformed(_))
        ));
        assert!(matches!(
            Predicate::not(Predicate::Any(vec![])).validate(),
            Err(PredicateError::Malformed(_))
        ));
        assert!(matches!(
            Predicate::release(ReleaseOp::Eq, ":").validate(),
            Err(PredicateError::Malformed(_))
        ));
        // Unknown tokens are a resolution-time concern.
        assert!(Predicate::release(ReleaseOp::Eq, "rhapsody").validate().is_ok());
    }

    #[test]
    fn display_uses_guard_syntax() {
        let p = Predicate::Any(vec![
            Predicate::Capability(Capability::Is32Bit),
            Predicate::All(vec![
                Predicate::release(ReleaseOp::Le, "leopard"),
                Predicate::not(Predicate::Capability(Capability::PowerPc)),
            ]),
        ]);
        assert_eq!(
            p.to_string(),
            "Hardware::CPU.is_32_bit? || (MacOS.release <= :leopard && !Hardware::CPU.ppc?)"
        );
    }
}
