//! `SourceForge` project RSS.

use std::sync::LazyLock;

use regex::Regex;

use super::{FeedRelease, is_prerelease, sort_newest_first};

static ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item[\s>].*?</item>").expect("static regex"));
static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<title>\s*(?:<!\[CDATA\[(.*?)\]\]>|(.*?))\s*</title>").expect("static regex")
});
static MEDIA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<media:content\s[^>]*url\s*=\s*["']([^"']+)["']"#).expect("static regex")
});
static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[._-]\d+|\w)+").expect("static regex"));

/// Extract releases from a `SourceForge` files feed. Each item is one file;
/// the version is taken from its path and files sharing a version are
/// merged into one release.
pub fn parse(body: &str) -> Vec<FeedRelease> {
    let mut releases: Vec<FeedRelease> = Vec::new();
    for item in ITEM.find_iter(body) {
        let item = item.as_str();
        let Some(title) = TITLE
            .captures(item)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().trim())
        else {
            continue;
        };
        let Some(version) = VERSION.find(title).map(|m| m.as_str().to_string()) else {
            continue;
        };
        let url = MEDIA_URL.captures(item).map(|c| c[1].to_string());

        match releases.iter_mut().find(|r| r.version == version) {
            Some(existing) => existing.urls.extend(url),
            None => releases.push(FeedRelease {
                prerelease: is_prerelease(&version),
                urls: url.into_iter().collect(),
                build: None,
                minimum_system_version: None,
                version,
            }),
        }
    }
    sort_newest_first(&mut releases);
    releases
}
