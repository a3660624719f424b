//! SHA-256 digests and the manifest checksum type.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors raised while validating digests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    /// The hex portion is not 64 characters long.
    #[error("Invalid SHA256 digest: expected 64 hex characters, got {len} in '{input}'")]
    Length {
        /// Number of characters found.
        len: usize,
        /// The rejected input.
        input: String,
    },

    /// The input contains characters outside `[0-9a-fA-F]`.
    #[error("Invalid SHA256 digest: contains non-hex characters in '{0}'")]
    NotHex(String),
}

/// A validated SHA256 digest (64 lowercase hex characters)
///
/// Used both for installer checksums and for appcast checkpoints, so an
/// invalid hex string is rejected when the manifest is loaded rather than
/// surfacing as a confusing mismatch later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Create a new `Sha256Digest`, validating the input.
    ///
    /// Accepts strings with or without a `sha256:` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the hex portion is not exactly 64 ASCII hex characters.
    pub fn new(s: impl Into<String>) -> Result<Self, DigestError> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s);

        if hex.len() != 64 {
            return Err(DigestError::Length {
                len: hex.len(),
                input: s.clone(),
            });
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::NotHex(s.clone()));
        }

        Ok(Self(hex.to_lowercase()))
    }

    /// Wrap raw digest bytes (e.g. the output of a hasher).
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Sha256Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Installer checksum as declared by a manifest.
///
/// The engine never downloads payloads; it only carries the selected value.
/// `NoCheck` is the explicit "unverified" sentinel (`sha256 :no_check`) and
/// is distinct from a missing checksum, which is a manifest error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// A concrete SHA-256 digest.
    Sha256(Sha256Digest),
    /// Explicitly unverified.
    NoCheck,
}

impl Checksum {
    /// Sentinel spelling used in manifests and serialized output.
    pub const NO_CHECK: &'static str = "no_check";

    /// Parse a checksum, accepting `no_check` / `:no_check` for the sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is neither the sentinel nor a valid digest.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        match s.trim().trim_start_matches(':') {
            Self::NO_CHECK => Ok(Self::NoCheck),
            _ => Sha256Digest::new(s.trim()).map(Self::Sha256),
        }
    }

    /// The digest, if this checksum is verifiable.
    pub fn digest(&self) -> Option<&Sha256Digest> {
        match self {
            Self::Sha256(d) => Some(d),
            Self::NoCheck => None,
        }
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256(d) => write!(f, "{d}"),
            Self::NoCheck => write!(f, ":{}", Self::NO_CHECK),
        }
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Sha256(d) => serializer.serialize_str(d.as_str()),
            Self::NoCheck => serializer.serialize_str(Self::NO_CHECK),
        }
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
