//! Shared value types for cask manifests.
//!
//! Everything in this crate is a plain value: release identifiers with a
//! fixed total order, CPU capability flags, validated SHA-256 digests and
//! structured version strings. The engine in `cask-core` builds on these.

pub mod arch;
pub mod hash;
pub mod release;
pub mod types;
pub mod version;

// Re-exports
pub use arch::*;
pub use hash::*;
pub use release::*;
pub use types::*;
pub use version::{CaskVersion, VersionError, VersionMethod};
