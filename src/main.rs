//! tunegrab - Download tracks, albums and playlists with tags and cover art

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod cli;
mod config;
mod error;
mod remote;
mod sync;
mod track;
mod utils;

use cli::{Cli, Commands, Overrides};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "tunegrab=debug,reqwest=debug"
    } else {
        "tunegrab=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(utils::unless_quiet()),
        )
        .init();

    let overrides = Overrides {
        api_url: cli.api_url,
        token_command: cli.token_command,
    };

    match cli.command {
        Commands::Download { url, output, token } => {
            cli::commands::download(url, output, token, overrides, cli.verbose).await?;
        }
        Commands::Token {
            show,
            set,
            clear,
            refresh,
        } => {
            cli::commands::token(show, set, clear, refresh, overrides).await?;
        }
        Commands::Status => {
            cli::commands::status().await?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
