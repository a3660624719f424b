//! Core library for cask-check.
//!
//! Loads cask manifests, resolves them against platform facts into concrete
//! package descriptors and verifies appcast checkpoints.

pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod facts;
pub mod feed;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod predicate;
pub mod reporter;
pub mod resolver;
pub mod source;
pub mod template;
pub mod verifier;

pub use catalog::{Catalog, CheckedCask, Engine, EngineError};
pub use config::{CheckerConfig, ConfigError};
pub use facts::{FactProvider, PlatformFacts};
pub use manifest::{Manifest, ManifestError};
pub use reporter::{CheckReporter, NullReporter};
pub use resolver::{ResolveError, ResolvedCask, resolve};
pub use verifier::{FeedSnapshot, SnapshotError, UnavailableReason, VerificationOutcome, Verifier};

/// User Agent string for feed requests
pub const USER_AGENT: &str = concat!("cask-check/", env!("CARGO_PKG_VERSION"));
