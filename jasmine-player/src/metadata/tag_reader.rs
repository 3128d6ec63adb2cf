//! Tag reading
//!
//! [`TagReader`] parses a local audio file into [`AudioTags`]. The default
//! implementation, [`LoftyTagReader`], uses lofty and understands every
//! container lofty does (ID3v2, Vorbis comments, MP4 atoms, RIFF INFO, ...).

use std::path::Path;

use lofty::picture::MimeType;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};

use crate::error::{Error, Result};

/// Embedded cover image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub data: Vec<u8>,
    /// File extension including the dot (`.png`, `.jpg`, ...)
    pub extension: &'static str,
}

/// Fields read from a tag container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub lyrics: Option<String>,
    pub artwork: Option<Artwork>,
}

/// Result of parsing one audio file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioTags {
    /// Duration from the audio properties (0 when unknown)
    pub duration_ms: u64,

    /// `None` when the file has no tag container at all
    pub fields: Option<TagFields>,
}

/// Parses tags out of a local file
pub trait TagReader: Send + Sync {
    /// Fails with [`Error::Parse`] on a malformed or unrecognized file
    fn read_tags(&self, path: &Path) -> Result<AudioTags>;
}

/// Tag reader backed by lofty
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<AudioTags> {
        let tagged_file = Probe::open(path)
            .map_err(|e| Error::Parse(e.to_string()))?
            .guess_file_type()
            .map_err(|e| Error::Parse(e.to_string()))?
            .read()
            .map_err(|e| Error::Parse(e.to_string()))?;

        let duration_ms = tagged_file.properties().duration().as_millis() as u64;

        let fields = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
            .map(tag_fields);

        tracing::debug!(
            file = %path.display(),
            duration_ms,
            has_tags = fields.is_some(),
            "Read tags"
        );

        Ok(AudioTags { duration_ms, fields })
    }
}

fn tag_fields(tag: &Tag) -> TagFields {
    let artwork = tag.pictures().first().map(|picture| Artwork {
        data: picture.data().to_vec(),
        extension: artwork_extension(picture.mime_type()),
    });

    TagFields {
        title: tag.title().map(|s| s.to_string()),
        artist: tag.artist().map(|s| s.to_string()),
        lyrics: tag.get_string(&ItemKey::Lyrics).map(str::to_string),
        artwork,
    }
}

/// File extension for an embedded picture, `.jpg` when unknown
pub fn artwork_extension<'a>(mime: impl Into<Option<&'a MimeType>>) -> &'static str {
    match mime.into() {
        Some(MimeType::Png) => ".png",
        Some(MimeType::Gif) => ".gif",
        Some(MimeType::Bmp) => ".bmp",
        Some(MimeType::Tiff) => ".tiff",
        _ => ".jpg",
    }
}
