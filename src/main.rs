//! Outfield - push GitHub Actions secrets and variables to many repositories at once.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use outfield::cli::{self, output, Cli};
use outfield::error::{ConfigError, Error};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env("OUTFIELD_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("outfield=debug")
        } else {
            EnvFilter::new("outfield=info")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();

    if let Err(e) = cli::execute(cli).await {
        let suggestion = match &e {
            Error::Config(ConfigError::MissingToken) => {
                Some("export GH_TOKEN_WITH_ACTIONS_WRITE or pass --token")
            }
            Error::Config(ConfigError::Read { .. }) => {
                Some("pass --config with the path to your outfield.toml")
            }
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
