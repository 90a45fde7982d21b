//! Classification of user-supplied collection references

use std::fmt;

/// Kind of collection a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Track,
    Album,
    Playlist,
}

impl ReferenceKind {
    /// Path segment the remote service uses for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Track => "track",
            ReferenceKind::Album => "album",
            ReferenceKind::Playlist => "playlist",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified reference: what kind of entity, and its remote id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReference {
    pub kind: ReferenceKind,
    pub id: String,
}

// Playlist and album are checked before track.
const MARKERS: [(&str, ReferenceKind); 3] = [
    ("/playlist/", ReferenceKind::Playlist),
    ("/album/", ReferenceKind::Album),
    ("/track/", ReferenceKind::Track),
];

impl CollectionReference {
    /// Classify a reference string by the first matching path marker
    ///
    /// Returns `None` when no marker is present or nothing follows it.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();

        MARKERS.iter().find_map(|(marker, kind)| {
            let start = input.find(marker)? + marker.len();
            let id = input[start..]
                .split(['/', '?', '#'])
                .next()
                .unwrap_or_default();

            if id.is_empty() {
                return None;
            }

            Some(Self {
                kind: *kind,
                id: id.to_string(),
            })
        })
    }
}
