//! Normalized per-track metadata

use crate::remote::TrackEntry;
use crate::utils::clean_filename;

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Extension of every file the downloader writes
pub const TRACK_EXTENSION: &str = "mp3";

/// Metadata for one track, as resolved at the start of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    /// Remote catalog id
    pub id: String,
    pub title: String,
    /// All artist names, joined with ", "
    pub artist: String,
    pub album: String,
    pub cover_url: Option<String>,
    /// Release date exactly as the service supplied it
    pub release_date: Option<String>,
    pub track_number: Option<u32>,
    /// Resolved as part of an album rather than a playlist or single track
    pub in_album: bool,
}

impl TrackDescriptor {
    /// Build a descriptor from a remote track entry
    pub fn from_entry(entry: &TrackEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: non_empty(entry.title.as_deref()).unwrap_or(UNKNOWN_TITLE).to_string(),
            artist: entry
                .artists
                .as_ref()
                .map(|a| a.joined())
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: non_empty(entry.album.as_deref()).unwrap_or(UNKNOWN_ALBUM).to_string(),
            cover_url: non_empty(entry.cover.as_deref()).map(str::to_string),
            release_date: non_empty(entry.release_date.as_deref()).map(str::to_string),
            track_number: entry.track_number.filter(|n| *n > 0),
            in_album: false,
        }
    }

    /// Human-readable name used in progress messages and reports
    pub fn display_name(&self) -> String {
        format!("{} - {} - {}", self.artist, self.album, self.title)
    }

    /// File name the track is stored under
    ///
    /// Depends only on the descriptor's metadata, so the same track maps to the
    /// same file on every run and already-downloaded files can be skipped.
    pub fn filename(&self) -> String {
        let stem = match (self.in_album, self.track_number) {
            (true, Some(number)) => format!("{:02} - {} - {}", number, self.artist, self.title),
            _ => self.display_name(),
        };
        clean_filename(&format!("{}.{}", stem, TRACK_EXTENSION))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
