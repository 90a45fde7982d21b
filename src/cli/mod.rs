//! CLI module for tunegrab

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod auth;
pub mod commands;

pub use auth::TokenStore;

#[derive(Parser, Debug)]
#[command(
    name = "tunegrab",
    about = "Download tracks, albums and playlists with tags and cover art"
)]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base URL of the download service
    #[arg(long, global = true, env = "TUNEGRAB_API_URL")]
    pub api_url: Option<String>,

    /// Command that prints a fresh access token (split on whitespace)
    #[arg(long, global = true, env = "TUNEGRAB_TOKEN_COMMAND")]
    pub token_command: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a track, album or playlist
    Download {
        /// Track, album or playlist link (defaults to the last one used)
        #[arg(value_name = "URL")]
        url: Option<String>,

        /// Base output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Access token to start with instead of the cached one
        #[arg(long)]
        token: Option<String>,
    },

    /// Manage the cached access token
    Token {
        /// Print the cached token
        #[arg(long, conflicts_with_all = ["set", "clear", "refresh"])]
        show: bool,

        /// Prompt for a token and cache it
        #[arg(long, conflicts_with_all = ["clear", "refresh"])]
        set: bool,

        /// Remove the cached token
        #[arg(long, conflicts_with = "refresh")]
        clear: bool,

        /// Run the token command once and cache its result
        #[arg(long)]
        refresh: bool,
    },

    /// Show settings and the last run
    Status,

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Per-invocation overrides of the stored settings
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub token_command: Option<String>,
}
