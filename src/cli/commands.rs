//! CLI command handlers

use anyhow::{Context, Result};
use chrono::Utc;
use clap::CommandFactory;
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{Overrides, TokenStore};
use crate::config::Settings;
use crate::remote::{CommandTokenSource, DownloaderClient, TokenSource, UnavailableTokenSource};
use crate::sync::{EventSink, Pipeline, PipelineEvent, PipelineRunner, RunRequest};
use crate::utils::{Id3TagWriter, QuietGuard};

/// Apply command-line overrides on top of the stored settings
fn effective_settings(settings: &Settings, overrides: &Overrides) -> Settings {
    let mut effective = settings.clone();
    if let Some(url) = &overrides.api_url {
        effective.api_base_url = url.clone();
    }
    if let Some(command) = &overrides.token_command {
        effective.token_command = command.split_whitespace().map(str::to_string).collect();
    }
    effective
}

fn token_source(settings: &Settings) -> Arc<dyn TokenSource> {
    match CommandTokenSource::from_argv(&settings.token_command, settings.request_timeout()) {
        Some(source) => Arc::new(source),
        None => Arc::new(UnavailableTokenSource),
    }
}

fn build_pipeline(settings: &Settings) -> Result<Pipeline> {
    let client = DownloaderClient::new(&settings.api_base_url, settings.request_timeout())?;
    Ok(Pipeline::new(
        Arc::new(client),
        Arc::new(Id3TagWriter),
        token_source(settings),
        settings.retry_policy(),
    ))
}

/// Handle the `download` command
pub async fn download(
    url: Option<String>,
    output: Option<PathBuf>,
    token: Option<String>,
    overrides: Overrides,
    verbose: bool,
) -> Result<()> {
    let mut settings = Settings::load()?;
    let effective = effective_settings(&settings, &overrides);

    let reference = url
        .or_else(|| settings.last_url.clone())
        .ok_or_else(|| anyhow::anyhow!("No URL given and no previous download to repeat"))?;
    let output_dir = output.unwrap_or_else(|| settings.output_dir.clone());
    let token = token
        .or_else(|| TokenStore::load().ok())
        .unwrap_or_default();

    settings.last_url = Some(reference.clone());
    settings.output_dir = output_dir.clone();
    settings.save()?;

    println!(
        "Downloading {} to {}",
        reference.cyan(),
        output_dir.display()
    );

    let runner = PipelineRunner::new(build_pipeline(&effective)?);
    let (tx, rx) = mpsc::channel(256);
    let handle = runner.spawn(
        RunRequest {
            reference,
            output_dir,
            token,
        },
        EventSink::new(tx),
    )?;

    {
        let _quiet = (!verbose).then(QuietGuard::begin);
        render_progress(rx).await?;
    }

    let result = handle.await.context("Download task panicked")?;

    settings.last_run = Some(Utc::now());
    settings.save()?;

    let summary = result?;
    let counts = summary.counts;

    println!();
    if counts.failed == 0 {
        println!("{}", "Download complete!".green().bold());
    } else {
        println!("{}", "Download finished with failures".yellow().bold());
    }
    match &summary.name {
        Some(name) => println!("  {}: {}", summary.reference.kind, name),
        None => println!("  Track: {}", summary.reference.id),
    }
    println!("  Downloaded: {}", counts.downloaded);
    println!("  Skipped: {}", counts.skipped);
    println!("  Failed: {}", counts.failed);
    println!("  Location: {}", summary.output_dir.display());

    Ok(())
}

/// Draw pipeline events until the run closes the channel
async fn render_progress(mut rx: mpsc::Receiver<PipelineEvent>) -> Result<()> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("#>-"),
    );

    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::Progress { message } => {
                if !message.starts_with('\t') && !message.contains('\n') {
                    bar.set_message(message.clone());
                }
                bar.println(message);
            }
            PipelineEvent::Diagnostic { message } => {
                bar.println(message.red().to_string());
            }
            PipelineEvent::Counts(counts) => {
                bar.set_position(u64::from(counts.percent()));
            }
            PipelineEvent::TokenUpdated { token } => {
                if let Some(warning) = token_cache_warning(TokenStore::store(&token)) {
                    bar.println(warning.red().to_string());
                }
            }
        }
    }

    bar.finish_and_clear();
    Ok(())
}

/// Line to show when caching a refreshed token failed. Logging is muted
/// while the bar is drawn, so this goes through the bar.
fn token_cache_warning(stored: Result<()>) -> Option<String> {
    stored
        .err()
        .map(|e| format!("Failed to cache refreshed token: {:#}", e))
}

/// Handle the `token` command
pub async fn token(
    show: bool,
    set: bool,
    clear: bool,
    refresh: bool,
    overrides: Overrides,
) -> Result<()> {
    if set {
        let token = TokenStore::prompt()?;
        TokenStore::store(&token)?;
        println!("{}", "Access token stored in system keyring.".green());
    } else if clear {
        TokenStore::clear()?;
        println!("{}", "Access token cleared.".green());
    } else if refresh {
        let settings = effective_settings(&Settings::load()?, &overrides);
        println!("{}", "Getting new token...".cyan());
        let token = token_source(&settings).acquire().await?;
        let token = token.trim();
        if token.is_empty() {
            anyhow::bail!("Token command returned an empty token");
        }
        TokenStore::store(token)?;
        println!("{}", "Token fetched successfully!".green());
    } else if show {
        match TokenStore::load() {
            Ok(token) => println!("{}", token),
            Err(_) => println!("{}", "No access token cached.".yellow()),
        }
    } else if TokenStore::exists() {
        println!("An access token is cached. Use {} to print it.", "--show".cyan());
    } else {
        println!("{}", "No access token cached.".yellow());
    }

    Ok(())
}

/// Handle the `status` command
pub async fn status() -> Result<()> {
    let settings = Settings::load()?;

    println!("{}", "tunegrab status".green().bold());
    println!("  Settings: {}", Settings::config_path()?.display());
    println!("  Service: {}", settings.api_base_url);
    println!("  Output: {}", settings.output_dir.display());
    println!(
        "  Last URL: {}",
        settings.last_url.as_deref().unwrap_or("(none)")
    );
    match settings.last_run {
        Some(when) => println!("  Last run: {}", when.format("%Y-%m-%d %H:%M:%S")),
        None => println!("  Last run: {}", "never".yellow()),
    }
    if settings.token_command.is_empty() {
        println!("  Token command: {}", "not configured".yellow());
    } else {
        println!("  Token command: {}", settings.token_command.join(" "));
    }
    if TokenStore::exists() {
        println!("  Access token: {}", "cached".green());
    } else {
        println!("  Access token: {}", "none".yellow());
    }

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "tunegrab", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_settings() {
        let settings = Settings::default();
        let overrides = Overrides {
            api_url: Some("http://localhost:8080".to_string()),
            token_command: Some("node  mint-token.js --fast".to_string()),
        };

        let effective = effective_settings(&settings, &overrides);

        assert_eq!(effective.api_base_url, "http://localhost:8080");
        assert_eq!(
            effective.token_command,
            vec!["node", "mint-token.js", "--fast"]
        );
        assert_eq!(effective.output_dir, settings.output_dir);
    }

    #[test]
    fn test_token_cache_failure_is_shown() {
        let failed: Result<()> =
            Err(anyhow::anyhow!("keyring locked").context("Failed to store access token"));
        assert_eq!(
            token_cache_warning(failed).as_deref(),
            Some("Failed to cache refreshed token: Failed to store access token: keyring locked")
        );
        assert!(token_cache_warning(Ok(())).is_none());
    }

    #[test]
    fn test_no_overrides_keeps_settings() {
        let settings = Settings::default();
        assert_eq!(effective_settings(&settings, &Overrides::default()), settings);
    }
}
