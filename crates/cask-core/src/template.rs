//! URL templates with version substitution points.
//!
//! Templates are parsed when a manifest is built and expanded only after a
//! clause has been selected, so an expansion can never see a version from a
//! branch that lost. Supported substitutions are `#{version}` and
//! `#{version.<method>[.<method>...]}`; anything else inside `#{...}` is
//! rejected up front.

use cask_schema::{CaskVersion, VersionError, VersionMethod};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Errors raised while parsing or expanding a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// `#{` without a matching `}`.
    #[error("Unterminated interpolation in '{0}'")]
    Unterminated(String),

    /// An interpolation that is not a version reference.
    #[error("Unsupported interpolation '#{{{expr}}}' in '{template}'")]
    Unsupported {
        /// The expression between the braces.
        expr: String,
        /// The full template.
        template: String,
    },

    /// A version method that does not exist.
    #[error("{0}")]
    Method(#[from] VersionError),

    /// A method chain has no value for the resolved version.
    #[error("'#{{{expr}}}' has no value for version {version}")]
    NoValue {
        /// The expression between the braces.
        expr: String,
        /// The version it was expanded against.
        version: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Literal(String),
    Version(Vec<VersionMethod>),
}

/// A parsed template string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] for unterminated or unsupported
    /// interpolations and unknown version methods.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("#{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| TemplateError::Unterminated(source.to_string()))?;
            segments.push(Segment::Version(parse_expr(&after[..end], source)?));
            rest = &after[end + 1..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the template references the version at all.
    pub fn is_versioned(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Version(_)))
    }

    /// Substitute `version` into every interpolation.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NoValue`] when a method chain has no value for
    /// this version (e.g. `minor` of `"7"`).
    pub fn expand(&self, version: &CaskVersion) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Version(methods) => {
                    let value =
                        version
                            .apply(methods)
                            .ok_or_else(|| TemplateError::NoValue {
                                expr: render_expr(methods),
                                version: version.raw().to_string(),
                            })?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl std::str::FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_expr(expr: &str, template: &str) -> Result<Vec<VersionMethod>, TemplateError> {
    let mut parts = expr.trim().split('.');
    if parts.next() != Some("version") {
        return Err(TemplateError::Unsupported {
            expr: expr.to_string(),
            template: template.to_string(),
        });
    }
    parts
        .map(|name| VersionMethod::from_name(name).map_err(TemplateError::from))
        .collect()
}

fn render_expr(methods: &[VersionMethod]) -> String {
    let mut expr = String::from("version");
    for m in methods {
        expr.push('.');
        expr.push_str(m.name());
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(raw: &str) -> CaskVersion {
        CaskVersion::new(raw).unwrap()
    }

    #[test]
    fn expands_raw_and_major() {
        let t = Template::parse("https://example.com/sparkle/#{version.major}/appcast.xml").unwrap();
        assert!(t.is_versioned());
        assert_eq!(
            t.expand(&version("1.1.0")).unwrap(),
            "https://example.com/sparkle/1/appcast.xml"
        );

        let t = Template::parse("https://example.com/app_#{version}.dmg").unwrap();
        assert_eq!(
            t.expand(&version("0.2.0")).unwrap(),
            "https://example.com/app_0.2.0.dmg"
        );
    }

    #[test]
    fn no_dots_and_no_separator() {
        let t = Template::parse("praat#{version.no_dots}_mac64.dmg").unwrap();
        assert_eq!(t.expand(&version("1.1.0")).unwrap(), "praat110_mac64.dmg");

        let t = Template::parse("app-#{version.no_separator}.zip").unwrap();
        assert_eq!(t.expand(&version("2.0,b3")).unwrap(), "app-20b3.zip");
    }

    #[test]
    fn multiple_and_chained() {
        let t = Template::parse("#{version.major} #{version.minor} #{version.patch}").unwrap();
        assert_eq!(t.expand(&version("1.2.3")).unwrap(), "1 2 3");

        let t = Template::parse("#{version.before_colon.before_comma.no_dots}").unwrap();
        assert_eq!(t.expand(&version("1.2.3,1000:400")).unwrap(), "123");
    }

    #[test]
    fn literal_only() {
        let t = Template::parse("https://example.com/appcast.xml").unwrap();
        assert!(!t.is_versioned());
        assert_eq!(
            t.expand(&version("9")).unwrap(),
            "https://example.com/appcast.xml"
        );
    }

    #[test]
    fn rejects_bad_templates() {
        assert!(matches!(
            Template::parse("https://x/#{version.unknown}"),
            Err(TemplateError::Method(_))
        ));
        assert!(matches!(
            Template::parse("https://x/#{language}"),
            Err(TemplateError::Unsupported { .. })
        ));
        assert!(matches!(
            Template::parse("https://x/#{version"),
            Err(TemplateError::Unterminated(_))
        ));
    }

    #[test]
    fn missing_value_fails_expansion() {
        let t = Template::parse("v#{version.minor}").unwrap();
        let err = t.expand(&version("7")).unwrap_err();
        assert_eq!(err.to_string(), "'#{version.minor}' has no value for version 7");
    }
}
