//! Feed provider detection.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static GITHUB_ATOM_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/(?P<user>[^/]+)/(?P<repo>[^/]+)/.*\.atom").expect("static regex")
});
static SPARKLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<rss.*xmlns:sparkle)|(<rss.*<enclosure)").expect("static regex")
});
static GITHUB_ATOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<feed.*<id>tag:github\.com").expect("static regex"));
static SOURCEFORGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<rss.*xmlns:sf)|(<channel.*xmlns:sf)").expect("static regex")
});

/// Known feed formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Sparkle RSS.
    Sparkle,
    /// GitHub releases (Atom feed or API).
    #[serde(rename = "github")]
    GitHub,
    /// `SourceForge` project RSS.
    SourceForge,
    /// Anything else.
    Unknown,
}

impl Provider {
    /// Detect a provider from the feed URL. GitHub release Atom feeds are
    /// rewritten to the releases API, which carries prerelease flags and
    /// asset URLs; the returned URL is the one to inspect.
    pub fn guess_by_url(url: &str) -> (Self, String) {
        match GITHUB_ATOM_URL.captures(url) {
            Some(caps) => (
                Self::GitHub,
                format!(
                    "https://api.github.com/repos/{}/{}/releases",
                    &caps["user"], &caps["repo"]
                ),
            ),
            None => (Self::Unknown, url.to_string()),
        }
    }

    /// Detect a provider from the feed body.
    pub fn guess_by_content(content: &str) -> Self {
        if SPARKLE.is_match(content) {
            Self::Sparkle
        } else if GITHUB_ATOM.is_match(content) {
            Self::GitHub
        } else if SOURCEFORGE.is_match(content) {
            Self::SourceForge
        } else {
            Self::Unknown
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Sparkle => "Sparkle",
            Self::GitHub => "GitHub",
            Self::SourceForge => "SourceForge",
            Self::Unknown => "-",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_atom_url_is_rewritten() {
        let (provider, url) = Provider::guess_by_url("https://github.com/owner/app/releases.atom");
        assert_eq!(provider, Provider::GitHub);
        assert_eq!(url, "https://api.github.com/repos/owner/app/releases");

        let (provider, url) = Provider::guess_by_url("https://example.com/appcast.xml");
        assert_eq!(provider, Provider::Unknown);
        assert_eq!(url, "https://example.com/appcast.xml");
    }

    #[test]
    fn content_detection() {
        let sparkle = r#"<?xml version="1.0"?><rss version="2.0" xmlns:sparkle="http://www.andymatuschak.org/xml-namespaces/sparkle"><channel></channel></rss>"#;
        assert_eq!(Provider::guess_by_content(sparkle), Provider::Sparkle);

        let plain_rss = r#"<rss><channel><item><enclosure url="x"/></item></channel></rss>"#;
        assert_eq!(Provider::guess_by_content(plain_rss), Provider::Sparkle);

        let atom = "<feed xmlns=\"http://www.w3.org/2005/Atom\">\n<id>tag:github.com,2008:https://github.com/o/r/releases</id></feed>";
        assert_eq!(Provider::guess_by_content(atom), Provider::GitHub);

        let sf = r#"<rss xmlns:sf="https://sourceforge.net/api/sfelements.rdf"><channel></channel></rss>"#;
        assert_eq!(Provider::guess_by_content(sf), Provider::SourceForge);

        assert_eq!(Provider::guess_by_content("<html></html>"), Provider::Unknown);
    }
}
