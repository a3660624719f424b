//! Descriptor and outcome rendering.

use cask_core::feed::FeedRelease;
use cask_core::resolver::{ResolvedCask, Selection};
use cask_core::{FeedSnapshot, PlatformFacts, VerificationOutcome};
use comfy_table::presets::NOTHING;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use crossterm::style::Stylize;

use super::Theme;

/// One row of the outcome table.
#[derive(Debug, Clone)]
pub struct OutcomeRow {
    token: String,
    version: String,
    status: &'static str,
    color: Color,
    detail: String,
}

impl OutcomeRow {
    pub fn new(token: String, cask: Option<&ResolvedCask>, outcome: &VerificationOutcome) -> Self {
        let (color, detail) = match outcome {
            VerificationOutcome::NotApplicable => (Color::DarkGrey, String::new()),
            VerificationOutcome::Unchanged { checkpoint } => {
                (Color::Green, short(checkpoint.as_str()).to_string())
            }
            VerificationOutcome::Changed {
                latest, release, ..
            } => {
                let detail = match release {
                    Some(r) => format!("feed offers {} ({})", r.version, short(latest.as_str())),
                    None => format!("now {}", short(latest.as_str())),
                };
                (Color::Yellow, detail)
            }
            VerificationOutcome::Unavailable { reason } => (Color::Red, reason.to_string()),
        };
        Self {
            token,
            version: cask.map_or_else(|| "-".to_string(), |c| c.version.to_string()),
            status: outcome.label(),
            color,
            detail,
        }
    }

    pub fn failed(token: String, reason: String) -> Self {
        Self {
            token,
            version: "-".to_string(),
            status: "error",
            color: Color::Red,
            detail: reason,
        }
    }
}

fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

/// Build the outcome table.
pub fn outcome_table(rows: &[OutcomeRow]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("cask").fg(Color::DarkGrey),
            Cell::new("version").fg(Color::DarkGrey),
            Cell::new("status").fg(Color::DarkGrey),
            Cell::new("detail").fg(Color::DarkGrey),
        ]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.token).fg(Color::Cyan),
            Cell::new(&row.version),
            Cell::new(row.status).fg(row.color),
            Cell::new(&row.detail),
        ]);
    }
    table
}

/// Print a resolved descriptor as aligned label/value lines.
pub fn print_descriptor(cask: &ResolvedCask, facts: &PlatformFacts) {
    let theme = Theme::default();
    let width = theme.layout.label_width;
    let line = |label: &str, value: &str| {
        println!(
            "  {} {}",
            format!("{label:<width$}").with(theme.colors.secondary),
            value
        );
    };

    println!(
        "{} {}",
        cask.token.as_str().with(theme.colors.token).bold(),
        cask.version.raw().with(theme.colors.version)
    );
    line("platform", &facts.to_string());
    let selected = match &cask.selected {
        Selection::Guarded { index, guard } => format!("clause {index} ({guard})"),
        Selection::Fallback { index } => format!("clause {index} (fallback)"),
    };
    line("selected", &selected);
    line("sha256", &cask.checksum.to_string());
    if let Some(url) = &cask.url {
        line("url", url);
    }
    match &cask.appcast {
        Some(appcast) => {
            line("appcast", &appcast.url);
            line("checkpoint", appcast.checkpoint.as_str());
        }
        None => line("appcast", "-"),
    }
    line("auto_updates", if cask.auto_updates { "yes" } else { "no" });
    for (label, value) in [
        ("name", cask.name.as_deref()),
        ("homepage", cask.homepage.as_deref()),
        ("license", cask.license.as_ref().map(|l| l.as_str())),
        ("app", cask.app.as_deref()),
    ] {
        if let Some(value) = value {
            line(label, value);
        }
    }
}

fn release_line(release: &FeedRelease) -> String {
    match &release.build {
        Some(build) => format!("{} (build {build})", release.version),
        None => release.version.clone(),
    }
}

/// Print a fetched appcast as aligned label/value lines.
pub fn print_snapshot(
    snapshot: &FeedSnapshot,
    latest: Option<&FeedRelease>,
    prerelease: Option<&FeedRelease>,
) {
    let theme = Theme::default();
    let width = theme.layout.label_width;
    let line = |label: &str, value: &str| {
        println!(
            "  {} {}",
            format!("{label:<width$}").with(theme.colors.secondary),
            value
        );
    };

    println!("{}", snapshot.url.as_str().with(theme.colors.token).bold());
    line("checkpoint", snapshot.checkpoint.as_str());
    line("provider", &snapshot.feed.provider.to_string());
    line("releases", &snapshot.feed.releases.len().to_string());
    match latest {
        Some(release) => {
            line("latest", &release_line(release));
            if let Some(minimum) = &release.minimum_system_version {
                line("requires", minimum);
            }
            for url in &release.urls {
                line("download", url);
            }
        }
        None => line("latest", "-"),
    }
    if let Some(release) = prerelease {
        line("pre-release", &release_line(release));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_core::UnavailableReason;

    #[test]
    fn rows_render_status_and_detail() {
        let rows = vec![
            OutcomeRow::new("alpha".into(), None, &VerificationOutcome::NotApplicable),
            OutcomeRow::new(
                "beta".into(),
                None,
                &VerificationOutcome::Unavailable {
                    reason: UnavailableReason::Status { code: 503 },
                },
            ),
            OutcomeRow::failed("gamma".into(), "no clause matches".into()),
        ];
        let rendered = outcome_table(&rows).to_string();
        assert!(rendered.contains("alpha"));
        assert!(rendered.contains("no appcast"));
        assert!(rendered.contains("HTTP 503"));
        assert!(rendered.contains("no clause matches"));
    }

    #[test]
    fn release_lines_carry_the_build() {
        let mut release = FeedRelease {
            version: "2.4.1".into(),
            build: Some("2410".into()),
            urls: Vec::new(),
            minimum_system_version: None,
            prerelease: false,
        };
        assert_eq!(release_line(&release), "2.4.1 (build 2410)");
        release.build = None;
        assert_eq!(release_line(&release), "2.4.1");
    }

    #[test]
    fn short_digest() {
        assert_eq!(short("0123456789abcdef"), "0123456789ab");
        assert_eq!(short("abc"), "abc");
    }
}
