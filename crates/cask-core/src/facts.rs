//! Platform facts consumed by guard evaluation.
//!
//! The engine never asks the operating system anything. Callers hand it a
//! [`PlatformFacts`] snapshot, either directly or through a [`FactProvider`],
//! so resolution stays a pure function that tests can drive with synthetic
//! hosts.

use cask_schema::{Capability, CpuArch, MacRelease, WordSize};
use serde::{Deserialize, Serialize};

/// An immutable snapshot of the facts a guard can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformFacts {
    /// Running macOS release.
    pub release: MacRelease,
    /// CPU family.
    #[serde(default)]
    pub arch: CpuArch,
    /// Native word size.
    #[serde(default)]
    pub word_size: WordSize,
}

impl PlatformFacts {
    /// Facts for a 64-bit Apple Silicon host on `release`.
    pub fn new(release: MacRelease) -> Self {
        Self {
            release,
            arch: CpuArch::default(),
            word_size: WordSize::default(),
        }
    }

    /// Replace the CPU family.
    pub fn with_arch(mut self, arch: CpuArch) -> Self {
        self.arch = arch;
        self
    }

    /// Replace the word size.
    pub fn with_word_size(mut self, word_size: WordSize) -> Self {
        self.word_size = word_size;
        self
    }

    /// Whether `capability` holds on this host.
    pub fn has(&self, capability: Capability) -> bool {
        capability.holds(self.arch, self.word_size)
    }
}

impl std::fmt::Display for PlatformFacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = match self.word_size {
            WordSize::Bits32 => 32,
            WordSize::Bits64 => 64,
        };
        write!(f, "{} ({}, {bits}-bit)", self.release, self.arch)
    }
}

/// Source of platform facts, injected at call time.
pub trait FactProvider: Send + Sync {
    /// Take a snapshot of the current facts.
    fn snapshot(&self) -> PlatformFacts;
}

/// A fixed snapshot is its own provider.
impl FactProvider for PlatformFacts {
    fn snapshot(&self) -> PlatformFacts {
        *self
    }
}

impl<T: FactProvider + ?Sized> FactProvider for std::sync::Arc<T> {
    fn snapshot(&self) -> PlatformFacts {
        (**self).snapshot()
    }
}
