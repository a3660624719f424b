//! GitHub releases API responses.

use serde::Deserialize;

use super::{FeedError, FeedRelease, is_prerelease};

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    browser_download_url: String,
}

/// Parse a `GET /repos/{owner}/{repo}/releases` response. Drafts are skipped
/// and the API order (newest first) is kept.
///
/// # Errors
///
/// Returns [`FeedError::Json`] if the body is not a releases array.
pub fn parse(body: &str) -> Result<Vec<FeedRelease>, FeedError> {
    let releases: Vec<GithubRelease> = serde_json::from_str(body)?;
    Ok(releases
        .into_iter()
        .filter(|r| !r.draft)
        .map(|r| {
            let version = r
                .tag_name
                .strip_prefix('v')
                .unwrap_or(&r.tag_name)
                .to_string();
            FeedRelease {
                prerelease: r.prerelease || is_prerelease(&version),
                urls: r.assets.into_iter().map(|a| a.browser_download_url).collect(),
                build: None,
                minimum_system_version: None,
                version,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_releases() {
        let body = r#"[
            {"tag_name": "v2.0.0", "draft": true, "prerelease": false, "assets": []},
            {"tag_name": "v1.5.0-rc.1", "draft": false, "prerelease": true, "assets": []},
            {"tag_name": "1.4.2", "draft": false, "prerelease": false,
             "assets": [{"browser_download_url": "https://github.com/o/r/releases/download/1.4.2/App.dmg", "name": "App.dmg"}]}
        ]"#;
        let releases = parse(body).unwrap();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].version, "1.5.0-rc.1");
        assert!(releases[0].prerelease);
        assert_eq!(releases[1].version, "1.4.2");
        assert!(!releases[1].prerelease);
        assert_eq!(
            releases[1].urls,
            vec!["https://github.com/o/r/releases/download/1.4.2/App.dmg"]
        );
    }

    #[test]
    fn rejects_non_array() {
        assert!(matches!(
            parse(r#"{"message": "Not Found"}"#),
            Err(FeedError::Json(_))
        ));
    }
}
