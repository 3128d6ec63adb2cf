//! Playback-related type definitions
//!
//! The observable playback snapshot and its supporting enums.

use serde::{Deserialize, Serialize};

use crate::track::{QueueSnapshot, Track};

/// Title shown when nothing is playing
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Artist shown when nothing is playing or the tag is missing
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Repeat mode enumeration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Next mode in the OFF → ALL → ONE → OFF cycle
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatMode::Off => write!(f, "off"),
            RepeatMode::All => write!(f, "all"),
            RepeatMode::One => write!(f, "one"),
        }
    }
}

/// Observable playback snapshot
///
/// Created empty when a session starts and replaced wholesale on every
/// resync. `position_ms` never exceeds `duration_ms`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub repeat_mode: RepeatMode,
    pub shuffle_active: bool,
    pub queue: QueueSnapshot,
    pub is_favorite: bool,
}

impl PlaybackState {
    /// Currently playing track, if any
    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current()
    }

    /// Title of the current track
    pub fn current_title(&self) -> &str {
        self.current_track()
            .map(|t| t.title.as_str())
            .unwrap_or(UNKNOWN_TITLE)
    }

    /// Artist of the current track
    pub fn current_artist(&self) -> &str {
        self.current_track()
            .map(|t| t.artist.as_str())
            .unwrap_or(UNKNOWN_ARTIST)
    }

    /// Artwork locator of the current track
    pub fn current_artwork(&self) -> Option<&str> {
        self.current_track()
            .and_then(|t| t.artwork_locator.as_deref())
    }
}
