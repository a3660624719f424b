//! Terminal output.

pub mod reporter;
pub mod table;
pub mod theme;

pub use reporter::TerminalReporter;
pub use theme::Theme;

use crossterm::style::Stylize;

/// Print an error line to stderr.
pub fn print_error(msg: &str) {
    let theme = Theme::default();
    eprintln!("{} {msg}", "error:".with(theme.colors.error).bold());
}
