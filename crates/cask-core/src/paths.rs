//! Well-known locations.

use dirs::home_dir;
use std::path::PathBuf;

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "CASK_CHECK_HOME";

/// Returns the cask-check home (`$CASK_CHECK_HOME`, else `~/.cask-check`), or
/// `None` if the user's home cannot be resolved.
pub fn try_cask_check_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var(HOME_ENV) {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".cask-check"))
}

/// Configuration file: ~/.cask-check/config.toml
pub fn config_path() -> Option<PathBuf> {
    try_cask_check_home().map(|h| h.join("config.toml"))
}
