//! Track and queue data model
//!
//! A [`Track`] is an immutable description of one playable item. Its identity
//! is its `id`; two tracks with the same `id` are the same queue item even if
//! their metadata was built from different sources.
//!
//! A [`QueueSnapshot`] is an ordered list of tracks plus the index of the item
//! that is current. An empty queue has no current index; a non-empty queue
//! always has one inside `0..len`.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A playable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Stable identity (catalog id, or the locator itself for ad-hoc items)
    pub id: String,

    /// Where the audio bytes live (path, `file://` URL, ...)
    pub source_locator: String,

    /// Display title
    pub title: String,

    /// Display artist
    pub artist: String,

    /// Cover artwork location, if any
    pub artwork_locator: Option<String>,

    /// Duration in milliseconds (0 when unknown)
    pub duration_ms: u64,
}

impl Track {
    /// Create a track without artwork
    pub fn new(
        id: impl Into<String>,
        source_locator: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            source_locator: source_locator.into(),
            title: title.into(),
            artist: artist.into(),
            artwork_locator: None,
            duration_ms,
        }
    }

    /// Attach an artwork locator
    pub fn with_artwork(mut self, artwork_locator: impl Into<String>) -> Self {
        self.artwork_locator = Some(artwork_locator.into());
        self
    }
}

/// Ordered queue contents plus the current position in it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    tracks: Vec<Track>,
    current_index: Option<usize>,
}

impl QueueSnapshot {
    /// Empty queue (no current item)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot, validating `current_index` against the track count
    ///
    /// An empty track list always yields the empty snapshot regardless of
    /// `current_index`.
    pub fn new(tracks: Vec<Track>, current_index: usize) -> Result<Self> {
        if tracks.is_empty() {
            return Ok(Self::empty());
        }
        if current_index >= tracks.len() {
            return Err(Error::InvalidInput(format!(
                "current index {} out of range for queue of {}",
                current_index,
                tracks.len()
            )));
        }
        Ok(Self {
            tracks,
            current_index: Some(current_index),
        })
    }

    /// Tracks in play order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Index of the current item, `None` for an empty queue
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Currently playing track
    pub fn current(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.tracks.get(i))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Position of the track with the given identity
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    /// Track ids in play order
    pub fn ids(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.id.as_str()).collect()
    }
}
