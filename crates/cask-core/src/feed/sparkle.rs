//! Sparkle RSS appcasts.

use std::sync::LazyLock;

use regex::Regex;

use super::{FeedRelease, is_prerelease, sort_newest_first};

static COMMENT_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*|\s*-->").expect("static regex"));
static ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item[\s>].*?</item>").expect("static regex"));
static ENCLOSURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<enclosure\s[^>]*>").expect("static regex"));

/// Extract releases from a Sparkle appcast.
///
/// Commented-out items are included: feeds often keep older releases in
/// comments and some hide the current one there.
pub fn parse(body: &str) -> Vec<FeedRelease> {
    let body = COMMENT_MARKERS.replace_all(body, "");
    let mut releases: Vec<FeedRelease> = ITEM
        .find_iter(&body)
        .filter_map(|item| parse_item(item.as_str()))
        .collect();
    sort_newest_first(&mut releases);
    releases
}

fn parse_item(item: &str) -> Option<FeedRelease> {
    let enclosure = ENCLOSURE.find(item).map(|m| m.as_str());
    let from_enclosure = |name: &str| enclosure.and_then(|e| attribute(e, name));

    let short = from_enclosure("sparkle:shortVersionString")
        .or_else(|| element(item, "sparkle:shortVersionString"));
    let build = from_enclosure("sparkle:version").or_else(|| element(item, "sparkle:version"));
    let (version, build) = match (short, build) {
        (Some(short), build) => (short, build),
        (None, Some(build)) => (build, None),
        (None, None) => return None,
    };

    let minimum_system_version = element(item, "sparkle:minimumSystemVersion")
        .or_else(|| element(item, "minimumSystemVersion"));
    let prerelease = is_prerelease(&version)
        || element(item, "sparkle:channel").is_some_and(|c| c != "release");

    Some(FeedRelease {
        prerelease,
        urls: from_enclosure("url").into_iter().collect(),
        version,
        build,
        minimum_system_version,
    })
}

/// Value of `name="..."` or `name='...'` inside a tag.
fn attribute(tag: &str, name: &str) -> Option<String> {
    let pattern = format!(r#"{}\s*=\s*(?:"([^"]*)"|'([^']*)')"#, regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(tag)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Text content of the first `<name>...</name>` element.
fn element(xml: &str, name: &str) -> Option<String> {
    let name = regex::escape(name);
    let re = Regex::new(&format!(r"(?s)<{name}(?:\s[^>]*)?>(.*?)</{name}>")).ok()?;
    re.captures(xml)
        .map(|caps| caps[1].trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPCAST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:sparkle="http://www.andymatuschak.org/xml-namespaces/sparkle">
  <channel>
    <title>Example</title>
    <item>
      <title>Version 1.1.0</title>
      <pubDate>Mon, 05 Jun 2017 12:00:00 +0000</pubDate>
      <sparkle:minimumSystemVersion>10.9</sparkle:minimumSystemVersion>
      <enclosure url="https://example.com/app_1.1.0.dmg" sparkle:version="110" sparkle:shortVersionString="1.1.0" length="1" type="application/octet-stream"/>
    </item>
    <!--
    <item>
      <title>Version 1.2.0 beta</title>
      <enclosure url='https://example.com/app_1.2.0b1.dmg' sparkle:version='120' sparkle:shortVersionString='1.2.0-beta1'/>
    </item>
    -->
    <item>
      <title>Version 1.0.0</title>
      <enclosure url="https://example.com/app_1.0.0.dmg" sparkle:version="100" sparkle:shortVersionString="1.0.0"/>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn extracts_items_including_commented_ones() {
        let releases = parse(APPCAST);
        let versions: Vec<&str> = releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["1.2.0-beta1", "1.1.0", "1.0.0"]);

        let beta = &releases[0];
        assert!(beta.prerelease);
        assert_eq!(beta.urls, vec!["https://example.com/app_1.2.0b1.dmg"]);

        let stable = &releases[1];
        assert!(!stable.prerelease);
        assert_eq!(stable.build.as_deref(), Some("110"));
        assert_eq!(stable.minimum_system_version.as_deref(), Some("10.9"));
    }

    #[test]
    fn build_only_items_use_the_build_as_version() {
        let feed = r#"<rss><channel><item><enclosure url="https://e/a.zip" sparkle:version="2.4"/></item></channel></rss>"#;
        let releases = parse(feed);
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].version, "2.4");
        assert_eq!(releases[0].build, None);
    }

    #[test]
    fn element_fallback_and_channels() {
        let feed = r#"<rss><channel><item>
            <sparkle:version>300</sparkle:version>
            <sparkle:shortVersionString>3.0</sparkle:shortVersionString>
            <sparkle:channel>beta</sparkle:channel>
            <enclosure url="https://e/3.0.zip"/>
        </item></channel></rss>"#;
        let releases = parse(feed);
        assert_eq!(releases[0].version, "3.0");
        assert_eq!(releases[0].build.as_deref(), Some("300"));
        assert!(releases[0].prerelease);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse("not xml at all").is_empty());
    }
}
