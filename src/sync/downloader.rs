//! Sequential per-track downloader with bounded retries

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::debug;
use url::Url;

use super::credentials::{Credential, CredentialManager};
use super::events::EventSink;
use crate::error::AttemptError;
use crate::remote::CatalogApi;
use crate::track::{RunLedger, Settlement, TrackDescriptor, TrackState};
use crate::utils::TagWriter;

/// How often and how patiently a track is retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff after the n-th failed attempt is `n * backoff_step`
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        self.backoff_step * failed_attempts
    }
}

/// Downloads, verifies and tags one track at a time
pub struct TrackDownloader {
    api: Arc<dyn CatalogApi>,
    tags: Arc<dyn TagWriter>,
    credentials: CredentialManager,
    retry: RetryPolicy,
}

impl TrackDownloader {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        tags: Arc<dyn TagWriter>,
        credentials: CredentialManager,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            api,
            tags,
            credentials,
            retry,
        }
    }

    /// Settle the track at `index` as downloaded, skipped or failed, then
    /// report the run's counts
    ///
    /// Download failures are recorded on the track, not returned. `Err` only
    /// signals a fault outside the per-track flow.
    pub async fn process(
        &self,
        index: usize,
        tracks: &[TrackDescriptor],
        ledger: &mut RunLedger,
        credential: &mut Credential,
        output_dir: &Path,
        events: &EventSink,
    ) -> Result<Settlement> {
        let track = tracks
            .get(index)
            .with_context(|| format!("No track at position {}", index))?;
        let state = ledger
            .get_mut(index)
            .with_context(|| format!("No run state for track {}", index))?;
        let path = output_dir.join(track.filename());

        if already_present(&path).await {
            state.settlement = Settlement::Skipped;
            events
                .progress(format!("file exists, skipping: {}", track.display_name()))
                .await;
        } else {
            events.progress(track.display_name()).await;
            self.download_with_retries(track, tracks, state, credential, &path, events)
                .await;
        }

        let settlement = state.settlement;
        events.counts(ledger.counts()).await;
        Ok(settlement)
    }

    async fn download_with_retries(
        &self,
        track: &TrackDescriptor,
        tracks: &[TrackDescriptor],
        state: &mut TrackState,
        credential: &mut Credential,
        path: &Path,
        events: &EventSink,
    ) {
        loop {
            state.attempts += 1;

            let err = match self
                .attempt(track, tracks, state, credential, path, events)
                .await
            {
                Ok(()) => {
                    state.settlement = Settlement::Downloaded;
                    state.error = None;
                    events.progress("\tdone").await;
                    return;
                }
                Err(err) => err,
            };

            if err.is_authorization_rejection() {
                debug!("Token rejected while fetching link for {}", track.id);
                credential.invalidate();
            }

            state.link = None;
            state.error = Some(err.to_string());
            discard_partial(path).await;
            events
                .diagnostic(format!("\terror while processing track: {}", err))
                .await;

            if state.attempts >= self.retry.max_attempts() {
                state.settlement = Settlement::Failed;
                return;
            }

            events
                .progress(format!(
                    "\tretrying... attempt {} of {}",
                    state.attempts, self.retry.max_retries
                ))
                .await;
            tokio::time::sleep(self.retry.backoff(state.attempts)).await;
        }
    }

    async fn attempt(
        &self,
        track: &TrackDescriptor,
        tracks: &[TrackDescriptor],
        state: &mut TrackState,
        credential: &mut Credential,
        path: &Path,
        events: &EventSink,
    ) -> Result<(), AttemptError> {
        self.credentials
            .ensure_valid(credential, tracks, events)
            .await;

        events.progress("\tget track link").await;
        let link = self.request_link(track, credential, events).await?;
        state.link = Some(link.to_string());

        events.progress("\tdownload audio").await;
        let payload = self.api.fetch_bytes(link.as_str()).await.map_err(|e| {
            AttemptError::Transport(e.context(format!(
                "Bad download response for track '{}' ({})",
                track.title, track.id
            )))
        })?;
        state.link = None;

        events.progress("\tsave file").await;
        fs::write(path, &payload).await?;
        let written = fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(AttemptError::EmptyFile);
        }

        events.progress("\tadding tags").await;
        self.tag(track, path).await
    }

    async fn request_link(
        &self,
        track: &TrackDescriptor,
        credential: &Credential,
        events: &EventSink,
    ) -> Result<Url, AttemptError> {
        let response = self
            .api
            .download_link(&track.id, credential.token())
            .await
            .map_err(AttemptError::Transport)?;

        if !response.success {
            events
                .diagnostic(format!("Could not get track link for {}", track.display_name()))
                .await;
            return Err(AttemptError::LinkRejected {
                status: response.status_code,
                message: response
                    .message
                    .unwrap_or_else(|| "download link request failed".to_string()),
            });
        }

        let link = response
            .link
            .filter(|l| !l.trim().is_empty())
            .ok_or(AttemptError::MissingLink)?;

        match Url::parse(link.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            _ => Err(AttemptError::InvalidLink(link)),
        }
    }

    /// Fetch the cover, if any, and write tags off the async runtime
    async fn tag(&self, track: &TrackDescriptor, path: &Path) -> Result<(), AttemptError> {
        let cover = match &track.cover_url {
            Some(url) => Some(self.api.fetch_bytes(url).await.map_err(|e| {
                AttemptError::Tagging(e.context("Failed to fetch cover art"))
            })?),
            None => None,
        };

        let tags = self.tags.clone();
        let path = path.to_path_buf();
        let track = track.clone();

        tokio::task::spawn_blocking(move || tags.write_tags(&path, &track, cover.as_deref()))
            .await
            .map_err(|e| AttemptError::Tagging(anyhow::anyhow!("Tagging task panicked: {}", e)))?
            .map_err(AttemptError::Tagging)
    }
}

/// A non-empty file at `path` counts as already downloaded
async fn already_present(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

async fn discard_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!("Failed to remove partial file {}: {}", path.display(), e),
    }
}
