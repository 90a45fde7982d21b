//! Access token validation and refresh

use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::debug;

use super::events::EventSink;
use crate::remote::{CatalogApi, TokenSource};
use crate::track::TrackDescriptor;

/// Tokens shorter than this are never sent to the service
const MIN_TOKEN_LEN: usize = 10;

/// The access token held for the duration of a run
#[derive(Debug, Clone, Default)]
pub struct Credential {
    token: String,
    rejected: bool,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            rejected: false,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Mark the token as refused by the service, so the next check refreshes
    /// it without probing
    pub fn invalidate(&mut self) {
        self.rejected = true;
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    fn replace(&mut self, token: String) {
        self.token = token;
        self.rejected = false;
    }
}

/// Picks which known track id to probe the token with
pub trait ProbeSelector: Send + Sync {
    fn pick(&self, tracks: &[TrackDescriptor]) -> Option<String>;
}

/// Probe with a uniformly random track from the current run
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomProbe;

impl ProbeSelector for RandomProbe {
    fn pick(&self, tracks: &[TrackDescriptor]) -> Option<String> {
        tracks
            .choose(&mut rand::thread_rng())
            .map(|track| track.id.clone())
    }
}

/// Always probe with the same id
#[derive(Debug, Clone)]
pub struct FixedProbe(pub String);

impl ProbeSelector for FixedProbe {
    fn pick(&self, _tracks: &[TrackDescriptor]) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Outcome of a credential check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Valid,
    Refreshed,
    RefreshFailed,
}

/// Keeps the run's token usable, refreshing it through a `TokenSource`
pub struct CredentialManager {
    api: Arc<dyn CatalogApi>,
    source: Arc<dyn TokenSource>,
    selector: Box<dyn ProbeSelector>,
}

impl CredentialManager {
    pub fn new(api: Arc<dyn CatalogApi>, source: Arc<dyn TokenSource>) -> Self {
        Self {
            api,
            source,
            selector: Box::new(RandomProbe),
        }
    }

    pub fn with_selector(mut self, selector: Box<dyn ProbeSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Make sure `credential` holds a token the service accepts
    ///
    /// A failed refresh leaves the previous token in place; the caller's
    /// next request will then fail and be retried like any other failure.
    pub async fn ensure_valid(
        &self,
        credential: &mut Credential,
        tracks: &[TrackDescriptor],
        events: &EventSink,
    ) -> CredentialStatus {
        if self.is_valid(credential, tracks, events).await {
            return CredentialStatus::Valid;
        }
        self.refresh(credential, events).await
    }

    async fn is_valid(
        &self,
        credential: &Credential,
        tracks: &[TrackDescriptor],
        events: &EventSink,
    ) -> bool {
        if credential.is_rejected() || credential.token().len() < MIN_TOKEN_LEN {
            return false;
        }

        let Some(probe_id) = self.selector.pick(tracks) else {
            return false;
        };

        debug!("Probing token with track {}", probe_id);
        match self.api.download_link(&probe_id, credential.token()).await {
            Ok(response) => response.success,
            Err(e) => {
                events
                    .diagnostic(format!("error while checking token: {:#}", e))
                    .await;
                false
            }
        }
    }

    async fn refresh(&self, credential: &mut Credential, events: &EventSink) -> CredentialStatus {
        events.progress("\tGetting new token").await;

        match self.source.acquire().await {
            Ok(token) if !token.trim().is_empty() => {
                credential.replace(token.trim().to_string());
                events.token_updated(credential.token()).await;
                events.progress("\tToken fetched successfully!").await;
                CredentialStatus::Refreshed
            }
            Ok(_) => {
                events.diagnostic("\tFailed to fetch token").await;
                CredentialStatus::RefreshFailed
            }
            Err(e) => {
                events
                    .diagnostic(format!("\tFailed to fetch token: {:#}", e))
                    .await;
                CredentialStatus::RefreshFailed
            }
        }
    }
}
