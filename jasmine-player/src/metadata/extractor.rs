//! Metadata extraction
//!
//! [`MetadataExtractor::extract`] copies a resource into a scoped temporary
//! file, parses its tags, and writes embedded artwork to a second scoped
//! temporary file. Both files are `NamedTempFile`s owned by the call, so they
//! are removed on every return path.
//!
//! Extraction never fails: any I/O or parse error degrades to a fallback
//! result built from the locator's file name.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use jasmine_common::events::{UNKNOWN_ARTIST, UNKNOWN_TITLE};
use jasmine_common::Track;

use super::resource::{LocalResourceAccess, ResourceAccess};
use super::tag_reader::{AudioTags, LoftyTagReader, TagReader};
use crate::error::Result;

pub const NO_LYRICS_FOUND: &str = "No embedded lyrics found";
pub const NO_TAGS_FOUND: &str = "Could not read any tags";

const AUDIO_PREFIX: &str = "jasmine_audio_";
const ARTWORK_PREFIX: &str = "jasmine_artwork_";
const DEFAULT_AUDIO_EXTENSION: &str = ".mp3";

/// Metadata for one locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub title: String,
    pub artist: String,
    pub lyrics: Option<String>,
    /// Location the artwork was written to during extraction. The file is
    /// scoped to the call and no longer exists once `extract` returns.
    pub artwork_locator: Option<String>,
    pub duration_ms: u64,
}

impl ExtractionResult {
    /// Degraded result: title from the file name, unknown artist
    pub fn fallback(locator: &str) -> Self {
        Self {
            title: fallback_title(locator),
            artist: UNKNOWN_ARTIST.to_string(),
            lyrics: None,
            artwork_locator: None,
            duration_ms: 0,
        }
    }

    /// Single-item track for `locator`; the locator doubles as the id
    pub fn into_track(self, locator: &str) -> Track {
        let track = Track::new(locator, locator, self.title, self.artist, self.duration_ms);
        match self.artwork_locator {
            Some(artwork) => track.with_artwork(artwork),
            None => track,
        }
    }
}

/// Last path segment of a locator
fn file_name(locator: &str) -> &str {
    locator.rsplit('/').next().unwrap_or(locator)
}

/// File name without its extension, or "Unknown Title" when that is empty
pub fn fallback_title(locator: &str) -> String {
    let name = file_name(locator);
    let stem = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };
    if stem.is_empty() {
        UNKNOWN_TITLE.to_string()
    } else {
        stem.to_string()
    }
}

/// Extension for the local audio copy, `.mp3` when the locator has none
pub fn audio_extension(locator: &str) -> String {
    match file_name(locator).rsplit_once('.') {
        Some((_, ext)) if !ext.trim().is_empty() => format!(".{ext}"),
        _ => DEFAULT_AUDIO_EXTENSION.to_string(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct MetadataExtractor {
    resources: Arc<dyn ResourceAccess>,
    tags: Arc<dyn TagReader>,
    scratch_dir: PathBuf,
}

impl MetadataExtractor {
    pub fn new(
        resources: Arc<dyn ResourceAccess>,
        tags: Arc<dyn TagReader>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resources,
            tags,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Local files parsed with lofty
    pub fn local(scratch_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(LocalResourceAccess),
            Arc::new(LoftyTagReader),
            scratch_dir,
        )
    }

    /// Extract title, artist, lyrics and artwork; never fails
    pub fn extract(&self, locator: &str) -> ExtractionResult {
        match self.try_extract(locator) {
            Ok(result) => {
                debug!(
                    locator,
                    title = %result.title,
                    artist = %result.artist,
                    "Extracted metadata"
                );
                result
            }
            Err(e) => {
                warn!(
                    locator,
                    kind = e.kind(),
                    error = %e,
                    "Metadata extraction failed, using fallback"
                );
                ExtractionResult::fallback(locator)
            }
        }
    }

    /// Lyrics only, with textual fallbacks
    pub fn extract_lyrics(&self, locator: &str) -> String {
        match self.read_tags(locator) {
            Ok(AudioTags { fields: None, .. }) => NO_TAGS_FOUND.to_string(),
            Ok(AudioTags {
                fields: Some(fields),
                ..
            }) => non_blank(fields.lyrics).unwrap_or_else(|| NO_LYRICS_FOUND.to_string()),
            Err(e) => {
                warn!(locator, kind = e.kind(), error = %e, "Lyrics extraction failed");
                format!("Error reading lyrics: {} - {}", e.kind(), e)
            }
        }
    }

    fn try_extract(&self, locator: &str) -> Result<ExtractionResult> {
        let tags = self.read_tags(locator)?;
        let fields = tags.fields.unwrap_or_default();

        // Held until return so the locator stays valid while the result is built
        let artwork_file = match &fields.artwork {
            Some(artwork) => Some(self.scratch_file(ARTWORK_PREFIX, artwork.extension, |file| {
                file.write_all(&artwork.data)
            })?),
            None => None,
        };

        let result = ExtractionResult {
            title: non_blank(fields.title).unwrap_or_else(|| fallback_title(locator)),
            artist: non_blank(fields.artist).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            lyrics: non_blank(fields.lyrics),
            artwork_locator: artwork_file
                .as_ref()
                .map(|file| file.path().display().to_string()),
            duration_ms: tags.duration_ms,
        };
        Ok(result)
    }

    /// Copy the resource to a scoped local file and parse it
    fn read_tags(&self, locator: &str) -> Result<AudioTags> {
        let mut stream = self.resources.open_stream(locator)?;
        let audio_file = self.scratch_file(AUDIO_PREFIX, &audio_extension(locator), |file| {
            io::copy(&mut stream, file).map(|_| ())
        })?;
        self.tags.read_tags(audio_file.path())
    }

    fn scratch_file<F>(&self, prefix: &str, suffix: &str, fill: F) -> io::Result<NamedTempFile>
    where
        F: FnOnce(&mut std::fs::File) -> io::Result<()>,
    {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&self.scratch_dir)?;
        fill(file.as_file_mut())?;
        file.as_file_mut().flush()?;
        Ok(file)
    }
}
