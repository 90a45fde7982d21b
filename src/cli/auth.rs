//! Keyring-based storage for the service access token

use anyhow::{Context, Result};
use dialoguer::Password;
use keyring::Entry;
use tracing::{debug, info};

const KEYRING_SERVICE: &str = "tunegrab";
const TOKEN_KEY: &str = "access-token";

/// Caches the most recent access token between runs
pub struct TokenStore;

impl TokenStore {
    /// Load the cached token
    pub fn load() -> Result<String> {
        Self::entry()?
            .get_password()
            .context("No access token in keyring")
    }

    /// Store a token, replacing any cached one
    pub fn store(token: &str) -> Result<()> {
        Self::entry()?
            .set_password(token)
            .context("Failed to store access token in keyring")?;
        debug!("Access token stored in keyring");
        Ok(())
    }

    /// Remove the cached token
    pub fn clear() -> Result<()> {
        let _ = Self::entry()?.delete_credential();
        info!("Access token cleared from keyring");
        Ok(())
    }

    pub fn exists() -> bool {
        Self::load().is_ok()
    }

    /// Ask for a token on the terminal
    pub fn prompt() -> Result<String> {
        let token: String = Password::new()
            .with_prompt("Access token")
            .interact()
            .context("Failed to read access token")?;

        let token = token.trim().to_string();
        if token.is_empty() {
            anyhow::bail!("Access token cannot be empty");
        }
        Ok(token)
    }

    fn entry() -> Result<Entry> {
        Entry::new(KEYRING_SERVICE, TOKEN_KEY).context("Failed to access keyring")
    }
}
