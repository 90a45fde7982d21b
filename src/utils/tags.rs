//! Writing track metadata into downloaded files

use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::id3::v2::{Frame, FrameId, Id3v2Tag, TimestampFrame};
use lofty::picture::{Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::items::Timestamp;
use lofty::tag::{Tag, TagType};
use lofty::TextEncoding;
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

use super::cover_art::normalize_cover;
use crate::track::TrackDescriptor;

/// Embeds a track's metadata into an audio file on disk
pub trait TagWriter: Send + Sync {
    /// Set title/artist/album/date/track number, and the front cover when
    /// `cover` is given, then save the file
    fn write_tags(&self, path: &Path, track: &TrackDescriptor, cover: Option<&[u8]>) -> Result<()>;
}

/// `TagWriter` producing ID3v2.3 tags
#[derive(Debug, Clone, Copy, Default)]
pub struct Id3TagWriter;

impl TagWriter for Id3TagWriter {
    fn write_tags(&self, path: &Path, track: &TrackDescriptor, cover: Option<&[u8]>) -> Result<()> {
        let mut tagged_file = Probe::open(path)
            .context("Failed to open audio file")?
            .read()
            .context("Failed to read audio file")?;

        if !tagged_file.supports_tag_type(TagType::Id3v2) {
            anyhow::bail!("File does not support ID3v2 tags");
        }
        let mut tag = tagged_file
            .remove(TagType::Id3v2)
            .unwrap_or_else(|| Tag::new(TagType::Id3v2));

        tag.set_album(track.album.clone());
        tag.set_artist(track.artist.clone());
        tag.set_title(track.title.clone());
        if let Some(number) = track.track_number {
            tag.set_track(number);
        }

        if let Some(data) = cover {
            tag.remove_picture_type(PictureType::CoverFront);
            tag.push_picture(cover_picture(data)?);
        }

        // ID3v2.3 has no TDRC; only a timestamp frame is split into TYER/TDAT on save
        let mut id3 = Id3v2Tag::from(tag);
        if let Some(date) = &track.release_date {
            match release_timestamp(date) {
                Some(timestamp) => {
                    id3.insert(Frame::Timestamp(TimestampFrame::new(
                        FrameId::Valid(Cow::Borrowed("TDRC")),
                        TextEncoding::Latin1,
                        timestamp,
                    )));
                }
                None => debug!("Ignoring unparseable release date {:?}", date),
            }
        }

        id3.save_to_path(path, WriteOptions::default().use_id3v23(true))
            .context("Failed to save tags")?;

        debug!("Tagged {}", path.display());
        Ok(())
    }
}

/// Parse a `YYYY[-MM[-DD]]` release date. A malformed month or day keeps
/// just the year.
fn release_timestamp(date: &str) -> Option<Timestamp> {
    let date = date.trim();
    let year = date.get(..4)?.parse::<u16>().ok()?;
    let year_only = Timestamp {
        year,
        ..Timestamp::default()
    };

    let Ok(parsed) = date.parse::<Timestamp>() else {
        return Some(year_only);
    };
    let month_ok = parsed.month.map_or(true, |m| (1..=12).contains(&m));
    let day_ok = parsed.day.map_or(true, |d| (1..=31).contains(&d));
    if !(month_ok && day_ok) {
        return Some(year_only);
    }

    Some(Timestamp {
        year: parsed.year,
        month: parsed.month,
        day: parsed.month.and(parsed.day),
        ..Timestamp::default()
    })
}

/// Build the front-cover picture, normalising the image when it decodes
fn cover_picture(data: &[u8]) -> Result<Picture> {
    let data = match normalize_cover(data) {
        Ok(jpeg) => jpeg,
        Err(e) => {
            warn!("Embedding cover art as fetched: {:#}", e);
            data.to_vec()
        }
    };

    let mut picture = Picture::from_reader(&mut Cursor::new(data))
        .context("Cover art is not a supported image")?;
    picture.set_pic_type(PictureType::CoverFront);
    Ok(picture)
}
