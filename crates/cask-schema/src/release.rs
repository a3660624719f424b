//! macOS release identifiers.
//!
//! Manifests compare the running release against symbolic names such as
//! `:leopard` or `:mavericks`. Those names form a fixed total order, which is
//! what lets an `<= :leopard` branch written years ago keep evaluating
//! correctly on releases that did not exist yet.
//!
//! # Example
//!
//! ```
//! use cask_schema::MacRelease;
//!
//! let lion: MacRelease = ":lion".parse().unwrap();
//! assert!(lion > MacRelease::Leopard);
//! assert_eq!(lion.version(), "10.7");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A token that is not part of the known release order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown macOS release: {0}")]
pub struct UnknownRelease(pub String);

/// A macOS release, ordered oldest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MacRelease {
    /// Mac OS X 10.0
    Cheetah,
    /// Mac OS X 10.1
    Puma,
    /// Mac OS X 10.2
    Jaguar,
    /// Mac OS X 10.3
    Panther,
    /// Mac OS X 10.4
    Tiger,
    /// Mac OS X 10.5
    Leopard,
    /// Mac OS X 10.6
    SnowLeopard,
    /// Mac OS X 10.7
    Lion,
    /// OS X 10.8
    MountainLion,
    /// OS X 10.9
    Mavericks,
    /// OS X 10.10
    Yosemite,
    /// OS X 10.11
    ElCapitan,
    /// macOS 10.12
    Sierra,
    /// macOS 10.13
    HighSierra,
    /// macOS 10.14
    Mojave,
    /// macOS 10.15
    Catalina,
    /// macOS 11
    BigSur,
    /// macOS 12
    Monterey,
    /// macOS 13
    Ventura,
    /// macOS 14
    Sonoma,
    /// macOS 15
    Sequoia,
    /// macOS 26
    Tahoe,
}

impl MacRelease {
    /// Every known release in ascending order.
    pub const ALL: [MacRelease; 22] = [
        Self::Cheetah,
        Self::Puma,
        Self::Jaguar,
        Self::Panther,
        Self::Tiger,
        Self::Leopard,
        Self::SnowLeopard,
        Self::Lion,
        Self::MountainLion,
        Self::Mavericks,
        Self::Yosemite,
        Self::ElCapitan,
        Self::Sierra,
        Self::HighSierra,
        Self::Mojave,
        Self::Catalina,
        Self::BigSur,
        Self::Monterey,
        Self::Ventura,
        Self::Sonoma,
        Self::Sequoia,
        Self::Tahoe,
    ];

    /// The symbolic name used in manifests (without the leading colon).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheetah => "cheetah",
            Self::Puma => "puma",
            Self::Jaguar => "jaguar",
            Self::Panther => "panther",
            Self::Tiger => "tiger",
            Self::Leopard => "leopard",
            Self::SnowLeopard => "snow_leopard",
            Self::Lion => "lion",
            Self::MountainLion => "mountain_lion",
            Self::Mavericks => "mavericks",
            Self::Yosemite => "yosemite",
            Self::ElCapitan => "el_capitan",
            Self::Sierra => "sierra",
            Self::HighSierra => "high_sierra",
            Self::Mojave => "mojave",
            Self::Catalina => "catalina",
            Self::BigSur => "big_sur",
            Self::Monterey => "monterey",
            Self::Ventura => "ventura",
            Self::Sonoma => "sonoma",
            Self::Sequoia => "sequoia",
            Self::Tahoe => "tahoe",
        }
    }

    /// Marketing version number (`10.9`, `14`, ...).
    pub fn version(&self) -> &'static str {
        match self {
            Self::Cheetah => "10.0",
            Self::Puma => "10.1",
            Self::Jaguar => "10.2",
            Self::Panther => "10.3",
            Self::Tiger => "10.4",
            Self::Leopard => "10.5",
            Self::SnowLeopard => "10.6",
            Self::Lion => "10.7",
            Self::MountainLion => "10.8",
            Self::Mavericks => "10.9",
            Self::Yosemite => "10.10",
            Self::ElCapitan => "10.11",
            Self::Sierra => "10.12",
            Self::HighSierra => "10.13",
            Self::Mojave => "10.14",
            Self::Catalina => "10.15",
            Self::BigSur => "11",
            Self::Monterey => "12",
            Self::Ventura => "13",
            Self::Sonoma => "14",
            Self::Sequoia => "15",
            Self::Tahoe => "26",
        }
    }

    /// Look up a release by its symbolic name. A leading `:` is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownRelease`] when the token is not in the known order.
    pub fn from_token(token: &str) -> Result<Self, UnknownRelease> {
        let name = token.trim().trim_start_matches(':');
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == name)
            .ok_or_else(|| UnknownRelease(token.to_string()))
    }

    /// Look up a release by version number, e.g. `10.9`, `10.9.5` or `14.2`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownRelease`] when no release carries that version.
    pub fn from_version(version: &str) -> Result<Self, UnknownRelease> {
        let mut parts = version.trim().split('.');
        let major = parts.next().unwrap_or_default();
        let key = if major == "10" {
            match parts.next() {
                Some(minor) => format!("10.{minor}"),
                None => return Err(UnknownRelease(version.to_string())),
            }
        } else {
            major.to_string()
        };

        Self::ALL
            .iter()
            .copied()
            .find(|r| r.version() == key)
            .ok_or_else(|| UnknownRelease(version.to_string()))
    }
}

impl std::fmt::Display for MacRelease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MacRelease {
    type Err = UnknownRelease;

    /// Accepts either a symbolic name (`lion`, `:lion`) or a version number (`10.7`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().starts_with(|c: char| c.is_ascii_digit()) {
            Self::from_version(s)
        } else {
            Self::from_token(s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_chronological() {
        assert!(MacRelease::Tiger < MacRelease::Leopard);
        assert!(MacRelease::Leopard < MacRelease::SnowLeopard);
        assert!(MacRelease::ElCapitan < MacRelease::Sierra);
        assert!(MacRelease::Catalina < MacRelease::BigSur);
        assert!(MacRelease::Sequoia < MacRelease::Tahoe);

        let mut sorted = MacRelease::ALL;
        sorted.sort();
        assert_eq!(sorted, MacRelease::ALL);
    }

    #[test]
    fn tokens_round_trip() {
        for release in MacRelease::ALL {
            assert_eq!(MacRelease::from_token(release.as_str()).unwrap(), release);
            assert_eq!(
                MacRelease::from_token(&format!(":{release}")).unwrap(),
                release
            );
        }
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = MacRelease::from_token(":rhapsody").unwrap_err();
        assert_eq!(err, UnknownRelease(":rhapsody".to_string()));
    }

    #[test]
    fn parse_by_version_number() {
        assert_eq!("10.9".parse::<MacRelease>().unwrap(), MacRelease::Mavericks);
        assert_eq!("10.10.5".parse::<MacRelease>().unwrap(), MacRelease::Yosemite);
        assert_eq!("14.2".parse::<MacRelease>().unwrap(), MacRelease::Sonoma);
        assert!("10".parse::<MacRelease>().is_err());
        assert!("9.1".parse::<MacRelease>().is_err());
    }
}
