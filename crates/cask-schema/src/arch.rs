//! CPU facts that manifests branch on.
//!
//! Casks written for the `PowerPC` and 32-bit Intel eras guard their URLs on
//! `Hardware::CPU.is_32_bit?` and friends. These types describe the host in
//! those terms without probing it; callers supply the values.
//!
//! # Example
//!
//! ```
//! use cask_schema::{Capability, CpuArch, WordSize};
//!
//! assert!(Capability::Intel.holds(CpuArch::Intel, WordSize::Bits32));
//! assert!(Capability::Is32Bit.holds(CpuArch::Intel, WordSize::Bits32));
//! assert!(!Capability::Arm.holds(CpuArch::Intel, WordSize::Bits64));
//! ```

use serde::{Deserialize, Serialize};

/// CPU family of the evaluated host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum CpuArch {
    /// Apple Silicon
    #[default]
    Arm,
    /// Intel `x86` / `x86_64`
    Intel,
    /// `PowerPC` (G3/G4/G5)
    PowerPc,
}

impl CpuArch {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Intel => "intel",
            Self::PowerPc => "ppc",
        }
    }
}

impl std::fmt::Display for CpuArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CpuArch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm" | "arm64" | "aarch64" => Ok(Self::Arm),
            "intel" | "x86" | "x86_64" | "amd64" | "i386" => Ok(Self::Intel),
            "ppc" | "powerpc" | "ppc64" => Ok(Self::PowerPc),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

/// Native word size of the evaluated host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WordSize {
    /// 32-bit
    #[serde(rename = "32")]
    Bits32,
    /// 64-bit
    #[default]
    #[serde(rename = "64")]
    Bits64,
}

impl std::str::FromStr for WordSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "32" | "32bit" | "32-bit" => Ok(Self::Bits32),
            "64" | "64bit" | "64-bit" => Ok(Self::Bits64),
            _ => Err(format!("Unknown word size: {s}")),
        }
    }
}

/// A boolean capability a guard may ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// `Hardware::CPU.is_32_bit?`
    Is32Bit,
    /// `Hardware::CPU.is_64_bit?`
    Is64Bit,
    /// `Hardware::CPU.intel?`
    Intel,
    /// `Hardware::CPU.arm?`
    Arm,
    /// `Hardware::CPU.ppc?`
    PowerPc,
}

impl Capability {
    /// Resolve a `Hardware::CPU` query method (`is_32_bit?`, `intel?`, ...).
    pub fn from_method(method: &str) -> Option<Self> {
        match method.trim_end_matches('?') {
            "is_32_bit" => Some(Self::Is32Bit),
            "is_64_bit" => Some(Self::Is64Bit),
            "intel" => Some(Self::Intel),
            "arm" => Some(Self::Arm),
            "ppc" => Some(Self::PowerPc),
            _ => None,
        }
    }

    /// The query method name as written in manifests.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Is32Bit => "is_32_bit?",
            Self::Is64Bit => "is_64_bit?",
            Self::Intel => "intel?",
            Self::Arm => "arm?",
            Self::PowerPc => "ppc?",
        }
    }

    /// Whether this capability holds for the given CPU.
    pub fn holds(&self, arch: CpuArch, word: WordSize) -> bool {
        match self {
            Self::Is32Bit => word == WordSize::Bits32,
            Self::Is64Bit => word == WordSize::Bits64,
            Self::Intel => arch == CpuArch::Intel,
            Self::Arm => arch == CpuArch::Arm,
            Self::PowerPc => arch == CpuArch::PowerPc,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hardware::CPU.{}", self.method())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_aliases() {
        assert_eq!("x86_64".parse::<CpuArch>().unwrap(), CpuArch::Intel);
        assert_eq!("aarch64".parse::<CpuArch>().unwrap(), CpuArch::Arm);
        assert_eq!("PowerPC".parse::<CpuArch>().unwrap(), CpuArch::PowerPc);
        assert!("sparc".parse::<CpuArch>().is_err());
    }

    #[test]
    fn capability_methods() {
        assert_eq!(Capability::from_method("is_32_bit?"), Some(Capability::Is32Bit));
        assert_eq!(Capability::from_method("ppc?"), Some(Capability::PowerPc));
        assert_eq!(Capability::from_method("is_128_bit?"), None);
        assert_eq!(
            Capability::Is64Bit.to_string(),
            "Hardware::CPU.is_64_bit?"
        );
    }

    #[test]
    fn word_size_capabilities() {
        assert!(Capability::Is64Bit.holds(CpuArch::Arm, WordSize::Bits64));
        assert!(!Capability::Is32Bit.holds(CpuArch::Arm, WordSize::Bits64));
    }
}
