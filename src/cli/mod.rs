//! Command-line interface.

pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::core::config::Config;
use crate::core::dispatch::{self, RunOptions};
use crate::error::{Error, Result};
use crate::github::rest::RestClient;
use crate::github::Client;

/// Propagate GitHub Actions secrets and variables across repositories.
#[derive(Parser)]
#[command(
    name = "outfield",
    about = "Propagate GitHub Actions secrets and variables across many repositories",
    version
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "outfield.toml")]
    pub config: PathBuf,

    /// GitHub token (overrides config file)
    #[arg(long)]
    pub token: Option<String>,

    /// GitHub owner/organization (overrides config file)
    #[arg(long)]
    pub owner: Option<String>,

    /// Comma-separated list of repositories (overrides config file)
    #[arg(long)]
    pub repo: Option<String>,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Continue processing other repositories on error
    #[arg(long)]
    pub continue_on_error: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse a comma-separated repository list, trimming whitespace and dropping
/// empty entries.
pub fn parse_repos(repos: &str) -> Vec<String> {
    repos
        .split(',')
        .map(str::trim)
        .filter(|repo| !repo.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load configuration, apply flag overrides and run the dispatcher.
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config)?;

    let repos = cli.repo.as_deref().map(parse_repos).unwrap_or_default();
    config.apply_overrides(cli.token.as_deref(), cli.owner.as_deref(), repos);
    config.validate()?;

    let client: Arc<dyn Client> = Arc::new(RestClient::new(&config.github.token)?);

    info!(
        owner = %config.github.owner,
        repos = config.github.repos.len(),
        secrets = config.repository_secrets.len() + config.environment_secrets.values().map(|s| s.len()).sum::<usize>(),
        variables = config.repository_variables.len() + config.environment_variables.values().map(|v| v.len()).sum::<usize>(),
        "starting run"
    );
    if cli.dry_run {
        info!("dry-run mode, no changes will be made");
    }

    let options = RunOptions {
        dry_run: cli.dry_run,
        continue_on_error: cli.continue_on_error,
    };
    let report = dispatch::run(client, Arc::new(config), options).await;

    for unit_error in &report.errors {
        output::error(&unit_error.to_string());
    }

    if report.is_failure() {
        return Err(Error::RunFailed(report.errors.len()));
    }

    if cli.dry_run {
        output::success(&format!(
            "dry run complete: {} value(s) previewed",
            report.outcomes.len()
        ));
    } else {
        output::success(&format!("{} value(s) applied", report.outcomes.len()));
    }
    Ok(())
}
