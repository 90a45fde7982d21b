//! Resolving a collection reference to its ordered track list

use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

use super::events::EventSink;
use crate::error::PipelineError;
use crate::remote::{CatalogApi, EntityMetadata};
use crate::track::{CollectionReference, ReferenceKind, TrackDescriptor};
use crate::utils::clean_dir_name;

/// Tracks behind a reference, plus where to store them
#[derive(Debug, Clone)]
pub struct ResolvedCollection {
    /// Human-readable album or playlist name; `None` for a single track
    pub name: Option<String>,
    /// Subdirectory of the output directory; `None` for a single track
    pub subdirectory: Option<String>,
    /// Tracks in playlist/album order
    pub tracks: Vec<TrackDescriptor>,
}

/// Turns references into track descriptors using the remote service
pub struct CollectionResolver {
    api: Arc<dyn CatalogApi>,
}

impl CollectionResolver {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self { api }
    }

    /// Resolve a reference; any remote failure aborts the run
    ///
    /// The collection header goes to `events` as soon as the metadata is in,
    /// before any track list page is requested.
    pub async fn resolve(
        &self,
        reference: &CollectionReference,
        events: &EventSink,
    ) -> Result<ResolvedCollection, PipelineError> {
        match reference.kind {
            ReferenceKind::Track => self.resolve_track(&reference.id, events).await,
            ReferenceKind::Album | ReferenceKind::Playlist => {
                self.resolve_collection(reference.kind, &reference.id, events)
                    .await
            }
        }
    }

    async fn resolve_track(
        &self,
        id: &str,
        events: &EventSink,
    ) -> Result<ResolvedCollection, PipelineError> {
        let metadata = self
            .api
            .track_metadata(id)
            .await
            .map_err(|e| PipelineError::Resolution(format!("Failed to fetch track: {:#}", e)))?;

        if !metadata.success {
            return Err(PipelineError::Resolution(rejection_message(
                "track",
                metadata.message.as_deref(),
                metadata.status_code,
            )));
        }
        events.progress("Single track").await;

        let mut track = TrackDescriptor::from_entry(&metadata.track);
        if track.id.is_empty() {
            track.id = id.to_string();
        }

        Ok(ResolvedCollection {
            name: None,
            subdirectory: None,
            tracks: vec![track],
        })
    }

    async fn resolve_collection(
        &self,
        kind: ReferenceKind,
        id: &str,
        events: &EventSink,
    ) -> Result<ResolvedCollection, PipelineError> {
        let metadata = self.api.entity_metadata(kind, id).await.map_err(|e| {
            PipelineError::Resolution(format!("Failed to fetch {} metadata: {:#}", kind, e))
        })?;

        if !metadata.success {
            return Err(PipelineError::Resolution(rejection_message(
                kind,
                metadata.message.as_deref(),
                metadata.status_code,
            )));
        }

        let name = entity_name(kind, &metadata);
        events.progress(format!("{}: {}", kind, name)).await;
        let mut tracks = self.fetch_all_tracks(kind, id).await?;

        match kind {
            ReferenceKind::Playlist => number_by_position(&mut tracks),
            ReferenceKind::Album => {
                apply_album_fields(&mut tracks, metadata.cover.as_deref())
            }
            ReferenceKind::Track => {}
        }

        debug!("Resolved {} '{}' with {} tracks", kind, name, tracks.len());

        Ok(ResolvedCollection {
            subdirectory: Some(clean_dir_name(&name)),
            name: Some(name),
            tracks,
        })
    }

    /// Follow `nextOffset` until the service stops returning one
    async fn fetch_all_tracks(
        &self,
        kind: ReferenceKind,
        id: &str,
    ) -> Result<Vec<TrackDescriptor>, PipelineError> {
        let mut tracks = Vec::new();
        let mut offset: Option<String> = None;
        let mut seen_offsets = Vec::new();

        loop {
            let page = self
                .api
                .track_list_page(kind, id, offset.as_deref())
                .await
                .map_err(|e| {
                    PipelineError::Resolution(format!("Failed to fetch track list: {:#}", e))
                })?;

            tracks.extend(
                page.track_list
                    .unwrap_or_default()
                    .iter()
                    .map(TrackDescriptor::from_entry),
            );

            match page.next_offset {
                Some(next) if seen_offsets.contains(&next) => {
                    warn!("Track list offset {} repeated, stopping", next);
                    break;
                }
                Some(next) => {
                    seen_offsets.push(next.clone());
                    offset = Some(next);
                }
                None => break,
            }
        }

        Ok(tracks)
    }
}

fn rejection_message(what: impl Display, message: Option<&str>, status: Option<u16>) -> String {
    let mut text = format!(
        "not a valid {}, api returned error message: {}",
        what,
        message.unwrap_or("unknown error")
    );
    if let Some(code) = status {
        text.push_str(&format!(" (status {})", code));
    }
    text
}

/// Display name of an album or playlist, also used for its directory
fn entity_name(kind: ReferenceKind, metadata: &EntityMetadata) -> String {
    let title = metadata.title.as_deref().unwrap_or("Untitled");
    let artists = metadata
        .artists
        .as_ref()
        .map(|a| a.joined())
        .unwrap_or_else(|| "Unknown Artist".to_string());

    match kind {
        ReferenceKind::Playlist => format!("{} ({})", title, artists),
        _ => format!("{} - {}", artists, title),
    }
}

/// Playlist tracks are numbered by their position, whatever the source says
fn number_by_position(tracks: &mut [TrackDescriptor]) {
    for (index, track) in tracks.iter_mut().enumerate() {
        track.track_number = Some(index as u32 + 1);
    }
}

/// Album tracks keep their own numbers and share the album cover
fn apply_album_fields(tracks: &mut [TrackDescriptor], album_cover: Option<&str>) {
    let album_cover = album_cover.filter(|c| !c.trim().is_empty());
    for track in tracks {
        track.in_album = true;
        if let Some(cover) = album_cover {
            track.cover_url = Some(cover.to_string());
        }
    }
}
