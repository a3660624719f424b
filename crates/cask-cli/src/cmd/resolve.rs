//! Resolve command
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cask_core::{PlatformFacts, source};

use crate::ui;

/// Resolve one manifest file and print its descriptor.
pub fn resolve(file: &Path, facts: &PlatformFacts, json: bool) -> Result<ExitCode> {
    let manifest = source::load_file(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let cask = cask_core::resolve(&manifest, facts)
        .with_context(|| format!("Failed to resolve {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cask)?);
    } else {
        ui::table::print_descriptor(&cask, facts);
    }
    Ok(ExitCode::SUCCESS)
}
