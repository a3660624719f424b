//! TOML manifest front-end.
//!
//! ```toml
//! [cask]
//! token = "two-versions"
//! name = "Example"
//! homepage = "https://example.com/"
//! license = "commercial"
//! app = "Example.app"
//!
//! [defaults]
//! url = "https://example.com/app_#{version}.dmg"
//! appcast = { url = "https://example.com/sparkle/#{version.major}/appcast.xml", checkpoint = "95ff..." }
//!
//! [[clause]]
//! when = "MacOS.release == :mavericks"
//! version = "0.9.0"
//! sha256 = "82ad..."
//!
//! [[clause]]
//! version = "1.1.0"
//! sha256 = "9065..."
//! ```
//!
//! A clause without `when` is the unconditional fallback.

use cask_schema::{CaskVersion, Checksum, LicenseTag, Sha256Digest};
use serde::Deserialize;
use ::toml::Spanned;

use super::SourceError;
use super::guard::parse_guard;
use crate::manifest::{AppcastDecl, Clause, ClauseBody, Manifest};
use crate::template::Template;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    cask: Spanned<RawTable>,
    #[serde(default)]
    defaults: Option<Spanned<RawTable>>,
    #[serde(default)]
    clause: Vec<Spanned<RawTable>>,
}

/// Every table shares one shape; `token` is only valid in `[cask]` and
/// `when` only in `[[clause]]`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    token: Option<String>,
    when: Option<String>,
    version: Option<String>,
    sha256: Option<String>,
    url: Option<String>,
    appcast: Option<RawAppcast>,
    auto_updates: Option<bool>,
    name: Option<String>,
    homepage: Option<String>,
    license: Option<String>,
    app: Option<String>,
}

impl RawTable {
    fn reject(&self, key: &str, table: &str, line: usize) -> Result<(), SourceError> {
        let present = match key {
            "token" => self.token.is_some(),
            _ => self.when.is_some(),
        };
        if present {
            return Err(SourceError::Parse {
                line,
                message: format!("'{key}' is not allowed in {table}"),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAppcast {
    url: String,
    checkpoint: String,
}

/// Parse a TOML manifest.
///
/// # Errors
///
/// Returns [`SourceError::Toml`] for malformed documents and a line-tagged
/// [`SourceError`] for invalid values or guards.
pub fn parse(src: &str) -> Result<Manifest, SourceError> {
    let doc: Document = ::toml::from_str(src)?;
    let line_of = |span: std::ops::Range<usize>| line_at(src, span.start);

    let info_line = line_of(doc.cask.span());
    let mut info = doc.cask.into_inner();
    info.reject("when", "[cask]", info_line)?;
    let token = info.token.take().ok_or_else(|| SourceError::Parse {
        line: info_line,
        message: "[cask] requires a token".to_string(),
    })?;
    let mut outer = convert(info, info_line)?;

    if let Some(defaults) = doc.defaults {
        let line = line_of(defaults.span());
        let defaults = defaults.into_inner();
        defaults.reject("token", "[defaults]", line)?;
        defaults.reject("when", "[defaults]", line)?;
        merge_defaults(&mut outer, convert(defaults, line)?, line)?;
    }

    let clauses = doc
        .clause
        .into_iter()
        .map(|clause| {
            let line = line_of(clause.span());
            let mut clause = clause.into_inner();
            clause.reject("token", "[[clause]]", line)?;
            let when = clause.when.take();
            let body = convert(clause, line)?;
            Ok(match when {
                Some(guard) => Clause::When {
                    guard: parse_guard(&guard, line)?,
                    body,
                },
                None => Clause::Otherwise(body),
            })
        })
        .collect::<Result<Vec<_>, SourceError>>()?;

    Ok(Manifest::new(token.as_str(), outer, clauses)?)
}

fn line_at(src: &str, offset: usize) -> usize {
    src.get(..offset).map_or(1, |head| head.matches('\n').count() + 1)
}

fn convert(raw: RawTable, line: usize) -> Result<ClauseBody, SourceError> {
    let template = |s: String| {
        Template::parse(&s).map_err(|source| SourceError::Template { line, source })
    };

    Ok(ClauseBody {
        version: raw
            .version
            .map(|v| CaskVersion::new(&v))
            .transpose()
            .map_err(|source| SourceError::Version { line, source })?,
        checksum: raw
            .sha256
            .map(|s| Checksum::parse(&s))
            .transpose()
            .map_err(|source| SourceError::Digest { line, source })?,
        url: raw.url.map(template).transpose()?,
        appcast: raw
            .appcast
            .map(|a| {
                Ok::<_, SourceError>(AppcastDecl {
                    url: template(a.url)?,
                    checkpoint: Sha256Digest::new(a.checkpoint)
                        .map_err(|source| SourceError::Digest { line, source })?,
                })
            })
            .transpose()?,
        auto_updates: raw.auto_updates,
        display_name: raw.name,
        homepage: raw.homepage,
        license: raw.license.as_deref().map(LicenseTag::new),
        app: raw.app,
    })
}

/// Fold `[defaults]` into the outer scope. A field set in both is ambiguous.
fn merge_defaults(
    outer: &mut ClauseBody,
    defaults: ClauseBody,
    line: usize,
) -> Result<(), SourceError> {
    fn fill<T>(slot: &mut Option<T>, value: Option<T>, field: &str, line: usize) -> Result<(), SourceError> {
        match (slot.is_some(), value) {
            (true, Some(_)) => Err(SourceError::Parse {
                line,
                message: format!("'{field}' is set in both [cask] and [defaults]"),
            }),
            (_, Some(v)) => {
                *slot = Some(v);
                Ok(())
            }
            (_, None) => Ok(()),
        }
    }

    fill(&mut outer.version, defaults.version, "version", line)?;
    fill(&mut outer.checksum, defaults.checksum, "sha256", line)?;
    fill(&mut outer.url, defaults.url, "url", line)?;
    fill(&mut outer.appcast, defaults.appcast, "appcast", line)?;
    fill(&mut outer.auto_updates, defaults.auto_updates, "auto_updates", line)?;
    fill(&mut outer.display_name, defaults.display_name, "name", line)?;
    fill(&mut outer.homepage, defaults.homepage, "homepage", line)?;
    fill(&mut outer.license, defaults.license, "license", line)?;
    fill(&mut outer.app, defaults.app, "app", line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{Predicate, ReleaseOp};

    const TWO_VERSIONS: &str = r##"
[cask]
token = "two-versions"
name = "Example"
homepage = "https://example.com/"
license = "commercial"
app = "Example.app"

[defaults]
url = "https://example.com/app_#{version}.dmg"
appcast = { url = "https://example.com/sparkle/#{version.major}/appcast.xml", checkpoint = "95ffe5b581434db6284ed8dfe0cddead69a5d3f7269ca488baba3bd1218e43f7" }
auto_updates = true

[[clause]]
when = "MacOS.release == :mavericks"
version = "0.9.0"
sha256 = "82adf42ce6031ab59a3072e607788e73f594ad5f21c7118aabc6c5dafe3d0b47"

[[clause]]
version = "1.1.0"
sha256 = "9065ae8493fa73bfdf5d29ffcd0012cd343475cf3d550ae526407b9910eb35b7"
"##;

    #[test]
    fn parses_clauses_and_defaults() {
        let m = parse(TWO_VERSIONS).unwrap();
        assert_eq!(m.token(), "two-versions");
        assert_eq!(m.clauses().len(), 2);
        assert_eq!(
            m.clauses()[0].guard(),
            Some(&Predicate::release(ReleaseOp::Eq, "mavericks"))
        );
        assert_eq!(m.fallback().map(|(i, _)| i), Some(1));
        assert!(m.outer().appcast.is_some());
        assert_eq!(m.outer().auto_updates, Some(true));
        assert_eq!(m.outer().display_name.as_deref(), Some("Example"));
    }

    #[test]
    fn guard_errors_point_at_the_clause() {
        let src = "[cask]\ntoken = \"x\"\n\n[[clause]]\nwhen = \"MacOS.release <=\"\nversion = \"1\"\nsha256 = \"no_check\"\n";
        // The span starts at the `[[clause]]` header or its first key.
        assert!(matches!(
            parse(src),
            Err(SourceError::Parse { line: 4 | 5, .. })
        ));
    }

    #[test]
    fn rejects_unknown_fields_and_conflicts() {
        let unknown = "[cask]\ntoken = \"x\"\n\n[[clause]]\nversion = \"1\"\nsha256 = \"no_check\"\nsha1 = \"abc\"\n";
        assert!(matches!(parse(unknown), Err(SourceError::Toml(_))));

        let conflict = "[cask]\ntoken = \"x\"\nurl = \"https://a/\"\n\n[defaults]\nurl = \"https://b/\"\n\n[[clause]]\nversion = \"1\"\nsha256 = \"no_check\"\n";
        assert!(matches!(
            parse(conflict),
            Err(SourceError::Parse { line: 5 | 6, .. })
        ));

        let misplaced = "[cask]\ntoken = \"x\"\nwhen = \"MacOS.release == :lion\"\n\n[[clause]]\nversion = \"1\"\nsha256 = \"no_check\"\n";
        assert!(matches!(parse(misplaced), Err(SourceError::Parse { .. })));
    }

    #[test]
    fn no_clauses_is_empty_manifest() {
        assert!(matches!(
            parse("[cask]\ntoken = \"x\"\n"),
            Err(SourceError::Manifest(_))
        ));
    }

    #[test]
    fn line_at_counts_newlines() {
        assert_eq!(line_at("a\nb\nc", 0), 1);
        assert_eq!(line_at("a\nb\nc", 2), 2);
        assert_eq!(line_at("a\nb\nc", 4), 3);
    }
}
