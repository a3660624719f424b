//! Structured cask versions.
//!
//! A cask version is an opaque vendor string (`1.1.0`, `2.0b3`,
//! `1.2.3,1000:400`, `latest`). URL templates refer to derived forms of it
//! (`#{version.major}`, `#{version.no_dots}`, ...); those forms are computed
//! from the raw string on demand and can never drift from it.
//!
//! # Example
//!
//! ```
//! use cask_schema::CaskVersion;
//!
//! let v = CaskVersion::new("1.1.0").unwrap();
//! assert_eq!(v.major(), Some("1"));
//! assert_eq!(v.no_separator(), "110");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors raised while building versions or version methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The raw version string is empty.
    #[error("Version string is empty")]
    Empty,

    /// A template referenced a method that does not exist.
    #[error("Unknown version method: {0}")]
    UnknownMethod(String),
}

/// A cask version: the raw string plus derived forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaskVersion {
    raw: String,
}

impl CaskVersion {
    /// Create a version from its raw string. `:latest` is stored as `latest`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Empty`] for blank input.
    pub fn new(raw: &str) -> Result<Self, VersionError> {
        let raw = raw.trim();
        let raw = raw.strip_prefix(':').unwrap_or(raw);
        if raw.is_empty() {
            return Err(VersionError::Empty);
        }
        Ok(Self {
            raw: raw.to_string(),
        })
    }

    /// The version exactly as declared.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Leading numeric component (`"1"` for `"1.1.0"`), if the version starts with digits.
    pub fn major(&self) -> Option<&str> {
        numeric_components(&self.raw).first().copied()
    }

    /// The raw string with every non-alphanumeric separator removed (`"110"` for `"1.1.0"`).
    pub fn no_separator(&self) -> String {
        self.raw.chars().filter(|c| c.is_alphanumeric()).collect()
    }

    /// Apply a chain of methods left to right, as `#{version.a.b}` does.
    ///
    /// Returns `None` when some method has no value for this version.
    pub fn apply(&self, methods: &[VersionMethod]) -> Option<String> {
        methods
            .iter()
            .try_fold(self.raw.clone(), |acc, m| m.apply(&acc))
    }

    /// Whether this is the `latest` placeholder version.
    pub fn is_latest(&self) -> bool {
        self.raw == "latest"
    }
}

impl std::fmt::Display for CaskVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl AsRef<str> for CaskVersion {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl std::str::FromStr for CaskVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Serialized as `{ raw, major, no_separator }` so descriptors show the
/// derived forms; deserializes from either that shape or a plain string.
impl Serialize for CaskVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr<'a> {
            raw: &'a str,
            major: Option<&'a str>,
            no_separator: String,
        }

        Repr {
            raw: &self.raw,
            major: self.major(),
            no_separator: self.no_separator(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CaskVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Plain(String),
            Structured { raw: String },
        }

        let raw = match Repr::deserialize(deserializer)? {
            Repr::Plain(s) | Repr::Structured { raw: s } => s,
        };
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// A named substitution method usable in `#{version.<method>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionMethod {
    /// First numeric component.
    Major,
    /// Second numeric component.
    Minor,
    /// Third numeric component.
    Patch,
    /// `major.minor`
    MajorMinor,
    /// `major.minor.patch`
    MajorMinorPatch,
    /// All non-alphanumeric characters removed.
    NoSeparator,
    /// Dots removed, other separators kept.
    NoDots,
    /// Dots replaced by underscores.
    DotsToUnderscores,
    /// Dots replaced by hyphens.
    DotsToHyphens,
    /// Text before the first comma (whole string if there is none).
    BeforeComma,
    /// Text after the first comma.
    AfterComma,
    /// Text before the first colon (whole string if there is none).
    BeforeColon,
    /// Text after the first colon.
    AfterColon,
}

impl VersionMethod {
    /// Look up a method by the name used in templates.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::UnknownMethod`] for names outside the supported set.
    pub fn from_name(name: &str) -> Result<Self, VersionError> {
        Ok(match name {
            "major" => Self::Major,
            "minor" => Self::Minor,
            "patch" => Self::Patch,
            "major_minor" => Self::MajorMinor,
            "major_minor_patch" => Self::MajorMinorPatch,
            "no_separator" => Self::NoSeparator,
            "no_dots" => Self::NoDots,
            "dots_to_underscores" => Self::DotsToUnderscores,
            "dots_to_hyphens" => Self::DotsToHyphens,
            "before_comma" => Self::BeforeComma,
            "after_comma" => Self::AfterComma,
            "before_colon" => Self::BeforeColon,
            "after_colon" => Self::AfterColon,
            other => return Err(VersionError::UnknownMethod(other.to_string())),
        })
    }

    /// The template spelling of this method.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::MajorMinor => "major_minor",
            Self::MajorMinorPatch => "major_minor_patch",
            Self::NoSeparator => "no_separator",
            Self::NoDots => "no_dots",
            Self::DotsToUnderscores => "dots_to_underscores",
            Self::DotsToHyphens => "dots_to_hyphens",
            Self::BeforeComma => "before_comma",
            Self::AfterComma => "after_comma",
            Self::BeforeColon => "before_colon",
            Self::AfterColon => "after_colon",
        }
    }

    /// Apply this method to a (possibly already transformed) version string.
    pub fn apply(&self, s: &str) -> Option<String> {
        let parts = numeric_components(s);
        match self {
            Self::Major => parts.first().map(|p| (*p).to_string()),
            Self::Minor => parts.get(1).map(|p| (*p).to_string()),
            Self::Patch => parts.get(2).map(|p| (*p).to_string()),
            Self::MajorMinor => (parts.len() >= 2).then(|| parts[..2].join(".")),
            Self::MajorMinorPatch => (parts.len() >= 3).then(|| parts[..3].join(".")),
            Self::NoSeparator => Some(s.chars().filter(|c| c.is_alphanumeric()).collect()),
            Self::NoDots => Some(s.replace('.', "")),
            Self::DotsToUnderscores => Some(s.replace('.', "_")),
            Self::DotsToHyphens => Some(s.replace('.', "-")),
            Self::BeforeComma => Some(s.split_once(',').map_or(s, |(a, _)| a).to_string()),
            Self::AfterComma => s.split_once(',').map(|(_, b)| b.to_string()),
            Self::BeforeColon => Some(s.split_once(':').map_or(s, |(a, _)| a).to_string()),
            Self::AfterColon => s.split_once(':').map(|(_, b)| b.to_string()),
        }
    }
}

impl std::fmt::Display for VersionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Leading `digits(.digits)*` run of `s`, split on dots.
fn numeric_components(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    for part in s.split('.') {
        let digits = part
            .find(|c: char| !c.is_ascii_digit())
            .map_or(part, |end| &part[..end]);
        if digits.is_empty() {
            break;
        }
        parts.push(digits);
        if digits.len() != part.len() {
            break;
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> CaskVersion {
        CaskVersion::new(s).unwrap()
    }

    fn apply(version: &str, chain: &[&str]) -> Option<String> {
        let methods: Vec<VersionMethod> = chain
            .iter()
            .map(|n| VersionMethod::from_name(n).unwrap())
            .collect();
        v(version).apply(&methods)
    }

    #[test]
    fn derived_forms() {
        assert_eq!(v("1.1.0").major(), Some("1"));
        assert_eq!(v("1.1.0").no_separator(), "110");
        assert_eq!(v("10.2b3").major(), Some("10"));
        assert_eq!(v("2.0-beta.1").no_separator(), "20beta1");
        assert_eq!(v("latest").major(), None);
        assert!(v(":latest").is_latest());
    }

    #[test]
    fn no_separator_keeps_unicode_letters() {
        assert_eq!(v("2.0-β.1").no_separator(), "20β1");
        assert_eq!(apply("1.0_für", &["no_separator"]).as_deref(), Some("10für"));
    }

    #[test]
    fn empty_version_rejected() {
        assert_eq!(CaskVersion::new("  "), Err(VersionError::Empty));
    }

    #[test]
    fn methods_on_compound_version() {
        let raw = "1.2.3,1000:400";
        assert_eq!(apply(raw, &[]).as_deref(), Some(raw));
        assert_eq!(apply(raw, &["major"]).as_deref(), Some("1"));
        assert_eq!(apply(raw, &["minor"]).as_deref(), Some("2"));
        assert_eq!(apply(raw, &["patch"]).as_deref(), Some("3"));
        assert_eq!(apply(raw, &["major_minor"]).as_deref(), Some("1.2"));
        assert_eq!(apply(raw, &["major_minor_patch"]).as_deref(), Some("1.2.3"));
        assert_eq!(apply(raw, &["before_comma"]).as_deref(), Some("1.2.3"));
        assert_eq!(apply(raw, &["after_comma"]).as_deref(), Some("1000:400"));
        assert_eq!(apply(raw, &["before_colon"]).as_deref(), Some("1.2.3,1000"));
        assert_eq!(apply(raw, &["after_colon"]).as_deref(), Some("400"));
        assert_eq!(apply(raw, &["no_dots"]).as_deref(), Some("123,1000:400"));
        assert_eq!(
            apply(raw, &["dots_to_underscores"]).as_deref(),
            Some("1_2_3,1000:400")
        );
        assert_eq!(
            apply(raw, &["dots_to_hyphens"]).as_deref(),
            Some("1-2-3,1000:400")
        );
        assert_eq!(
            apply(raw, &["before_colon", "before_comma", "no_dots"]).as_deref(),
            Some("123")
        );
    }

    #[test]
    fn missing_components_yield_none() {
        assert_eq!(apply("7", &["minor"]), None);
        assert_eq!(apply("1.2", &["after_comma"]), None);
        assert_eq!(apply("latest", &["major"]), None);
    }

    #[test]
    fn unknown_method() {
        assert_eq!(
            VersionMethod::from_name("unknown"),
            Err(VersionError::UnknownMethod("unknown".to_string()))
        );
    }

    #[test]
    fn serde_shapes() {
        let json = serde_json::to_value(v("1.1.0")).unwrap();
        assert_eq!(json["raw"], "1.1.0");
        assert_eq!(json["major"], "1");
        assert_eq!(json["no_separator"], "110");

        let from_plain: CaskVersion = serde_json::from_str("\"0.2.0\"").unwrap();
        assert_eq!(from_plain.raw(), "0.2.0");
        let from_struct: CaskVersion = serde_json::from_value(json).unwrap();
        assert_eq!(from_struct.raw(), "1.1.0");
    }
}
