//! Identifier newtypes shared across the workspace.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// A normalized cask token (`google-chrome`, `six-versions-six-appcasts`).
///
/// Tokens are unique within a catalog and are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaskToken(String);

impl CaskToken {
    /// Create a new token, normalizing the input to lowercase.
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    /// Return the normalized token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CaskToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for CaskToken {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for CaskToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CaskToken {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl PartialEq<&str> for CaskToken {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl Borrow<str> for CaskToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CaskToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CaskToken {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// License tag as declared by `license :commercial` and similar.
///
/// Stored without the leading colon. Free-form because manifests use both
/// symbolic tags (`:oss`, `:gratis`) and SPDX identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseTag(String);

impl LicenseTag {
    /// Create a tag, stripping a leading `:`.
    pub fn new(tag: &str) -> Self {
        let tag = tag.trim();
        Self(tag.strip_prefix(':').unwrap_or(tag).to_string())
    }

    /// Return the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LicenseTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LicenseTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_case_insensitive() {
        let token = CaskToken::new(" Google-Chrome ");
        assert_eq!(token.as_str(), "google-chrome");
        assert_eq!(token, "GOOGLE-CHROME");
    }

    #[test]
    fn license_strips_colon() {
        assert_eq!(LicenseTag::new(":commercial").as_str(), "commercial");
        assert_eq!(LicenseTag::new("MIT").as_str(), "MIT");
    }
}
