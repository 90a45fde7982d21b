//! Access token acquisition
//!
//! Minting a fresh token involves an exchange with the service's web front
//! end that lives outside this program. The pipeline only needs something it
//! can await for a new token string.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Source of fresh access tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Obtain a new token. An empty string counts as failure to callers.
    async fn acquire(&self) -> Result<String>;
}

/// Runs an external helper program and reads the token from its stdout
#[derive(Debug, Clone)]
pub struct CommandTokenSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTokenSource {
    /// Build from an argv list; `None` if the list is empty
    pub fn from_argv(argv: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }
}

#[async_trait]
impl TokenSource for CommandTokenSource {
    async fn acquire(&self) -> Result<String> {
        debug!("Running token helper: {}", self.program);

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .with_context(|| {
                format!("Token helper timed out after {}s", self.timeout.as_secs())
            })?
            .with_context(|| format!("Failed to run token helper '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Token helper exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        let token = String::from_utf8(output.stdout)
            .context("Token helper printed invalid UTF-8")?
            .trim()
            .to_string();

        if token.is_empty() {
            anyhow::bail!("Token helper printed no token");
        }

        Ok(token)
    }
}

/// Token source used when no helper is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableTokenSource;

#[async_trait]
impl TokenSource for UnavailableTokenSource {
    async fn acquire(&self) -> Result<String> {
        anyhow::bail!("no token helper configured (set one with --token-command)")
    }
}
