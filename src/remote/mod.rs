//! Download service API client module

pub mod client;
pub mod models;
pub mod token;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::track::ReferenceKind;

pub use client::DownloaderClient;
pub use models::*;
pub use token::{CommandTokenSource, TokenSource, UnavailableTokenSource};

/// Remote calls the download pipeline depends on
///
/// `Err` means the call itself failed (transport, unreadable body). A response
/// the service marks as unsuccessful is returned as `Ok` with `success == false`.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Metadata for an album or playlist
    async fn entity_metadata(&self, kind: ReferenceKind, id: &str) -> Result<EntityMetadata>;

    /// Metadata for a single track
    async fn track_metadata(&self, id: &str) -> Result<TrackMetadata>;

    /// One page of an album's or playlist's track list
    async fn track_list_page(
        &self,
        kind: ReferenceKind,
        id: &str,
        offset: Option<&str>,
    ) -> Result<TrackListPage>;

    /// Request a single-use download link for a track
    async fn download_link(&self, track_id: &str, token: &str) -> Result<DownloadLink>;

    /// Fetch a binary resource (audio payload or cover art); non-success
    /// HTTP statuses are errors
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes>;
}
