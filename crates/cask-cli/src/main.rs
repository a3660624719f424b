//! cask-check - resolve cask manifests and verify appcast checkpoints

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cask_cli::cmd;
use cask_cli::{Cli, Commands};
use cask_core::CheckerConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            cask_cli::ui::print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = CheckerConfig::load().context("Failed to load configuration")?;
    cli.network.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Resolve {
            file,
            platform,
            json,
        } => cmd::resolve::resolve(&file, &platform.facts(), json),
        Commands::Verify {
            files,
            platform,
            json,
        } => cmd::verify::verify(&files, &platform.facts(), &config, json).await,
        Commands::Check {
            dir,
            platform,
            outdated,
            json,
        } => cmd::check::check(&dir, &platform.facts(), &config, outdated, json).await,
        Commands::Appcast {
            url,
            filter,
            stable,
            checkpoint,
            provider,
            app_version,
            downloads,
            json,
        } => {
            let opts = cmd::appcast::AppcastOptions {
                filter,
                stable,
                only_checkpoint: checkpoint,
                only_provider: provider,
                only_version: app_version,
                only_downloads: downloads,
                json,
            };
            cmd::appcast::appcast(&url, &config, &opts).await
        }
    }
}
