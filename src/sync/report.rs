//! End-of-run comparison of expected tracks against the output directory

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::track::{RunLedger, Settlement, TrackDescriptor};

/// A track that ended the run without a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTrack {
    pub name: String,
    pub error: Option<String>,
}

/// Outcome of a run, compared against what is on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub failed: Vec<FailedTrack>,
    /// Files in the collection directory that no resolved track maps to
    pub orphans: Vec<String>,
    /// Resolved tracks with no file in the collection directory
    pub missing: Vec<String>,
    /// Whether the directory comparison applies (album and playlist runs)
    pub compared: bool,
}

/// Sidecar and sync-tool files that never count as orphans
fn is_ignored(name: &str) -> bool {
    name == ".DS_Store" || name.starts_with(".syncthing.") || name.ends_with(".stem.m4a")
}

impl ReconciliationReport {
    /// Report for a single-track run: failures only
    pub fn for_track(tracks: &[TrackDescriptor], ledger: &RunLedger) -> Self {
        Self {
            failed: failed_tracks(tracks, ledger),
            ..Default::default()
        }
    }

    /// Report for an album or playlist run whose directory could not be listed
    pub fn unscanned(tracks: &[TrackDescriptor], ledger: &RunLedger) -> Self {
        Self {
            failed: failed_tracks(tracks, ledger),
            compared: true,
            ..Default::default()
        }
    }

    /// Report for an album or playlist run, given the directory's file names
    pub fn for_collection<I>(tracks: &[TrackDescriptor], ledger: &RunLedger, listing: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let on_disk: HashSet<String> = listing.into_iter().collect();
        let expected: HashSet<String> = tracks.iter().map(TrackDescriptor::filename).collect();

        let mut orphans: Vec<String> = on_disk
            .iter()
            .filter(|name| !expected.contains(*name) && !is_ignored(name))
            .cloned()
            .collect();
        orphans.sort();

        let missing = tracks
            .iter()
            .filter(|track| !on_disk.contains(&track.filename()))
            .map(TrackDescriptor::display_name)
            .collect();

        Self {
            failed: failed_tracks(tracks, ledger),
            orphans,
            missing,
            compared: true,
        }
    }

    /// List `dir` and compare it against the resolved tracks
    pub async fn scan(dir: &Path, tracks: &[TrackDescriptor], ledger: &RunLedger) -> Result<Self> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to list {}", dir.display()))?;

        let mut listing = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            listing.push(entry.file_name().to_string_lossy().into_owned());
        }

        Ok(Self::for_collection(tracks, ledger, listing))
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.orphans.is_empty() && self.missing.is_empty()
    }
}

fn failed_tracks(tracks: &[TrackDescriptor], ledger: &RunLedger) -> Vec<FailedTrack> {
    tracks
        .iter()
        .zip(ledger.iter())
        .filter(|(_, state)| state.settlement == Settlement::Failed)
        .map(|(track, state)| FailedTrack {
            name: track.display_name(),
            error: state.error.clone(),
        })
        .collect()
}

impl fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.failed.is_empty() {
            writeln!(f, "Failed track downloads:")?;
            for track in &self.failed {
                match &track.error {
                    Some(error) => writeln!(f, "{}: {}", track.name, error)?,
                    None => writeln!(f, "{}", track.name)?,
                }
            }
            writeln!(f)?;
        }

        if !self.orphans.is_empty() {
            writeln!(f, "Tracks in folder but not in playlist:")?;
            for name in &self.orphans {
                writeln!(f, "{}", name)?;
            }
            writeln!(f)?;
        }

        if !self.missing.is_empty() {
            writeln!(f, "Tracks in playlist but not in folder:")?;
            for name in &self.missing {
                writeln!(f, "{}", name)?;
            }
            writeln!(f)?;
        }

        if self.is_clean() {
            if self.compared {
                write!(f, "All downloads completed successfully!")?;
            } else {
                write!(f, "Download completed successfully!")?;
            }
        }
        Ok(())
    }
}
