//! Playback engine interface
//!
//! The engine is the external backend that decodes and outputs audio and owns
//! transport state. The session talks to it through [`PlaybackEngine`]:
//! commands are submitted fire-and-forget, their effects are only observed
//! through the notification channel plus a fresh [`EngineSnapshot`].

pub mod memory;

pub use memory::MemoryEngine;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use jasmine_common::events::RepeatMode;
use jasmine_common::{QueueSnapshot, Track};

/// Engine-side failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Connection not established or lost
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Engine refused the command
    #[error("command rejected: {0}")]
    Rejected(String),
}

/// Result type for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Display metadata attached to a queue item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub title: String,
    pub artist: String,
    pub artwork_uri: Option<String>,
}

/// Engine-native queue item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub media_id: String,
    pub uri: String,
    pub metadata: ItemMetadata,
    pub duration_ms: u64,
}

impl From<&Track> for QueueItem {
    fn from(track: &Track) -> Self {
        Self {
            media_id: track.id.clone(),
            uri: track.source_locator.clone(),
            metadata: ItemMetadata {
                title: track.title.clone(),
                artist: track.artist.clone(),
                artwork_uri: track.artwork_locator.clone(),
            },
            duration_ms: track.duration_ms,
        }
    }
}

impl From<&QueueItem> for Track {
    fn from(item: &QueueItem) -> Self {
        Self {
            id: item.media_id.clone(),
            source_locator: item.uri.clone(),
            title: item.metadata.title.clone(),
            artist: item.metadata.artist.clone(),
            artwork_locator: item.metadata.artwork_uri.clone(),
            duration_ms: item.duration_ms,
        }
    }
}

/// Outbound command to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Replace the whole queue atomically
    SetQueue {
        items: Vec<QueueItem>,
        start_index: usize,
        start_position_ms: u64,
    },
    Play,
    Pause,
    /// Seek within the current item
    SeekTo { position_ms: u64 },
    /// Jump to another queue item
    SeekToItem { index: usize, position_ms: u64 },
    SkipNext,
    SkipPrevious,
    MoveItem { from: usize, to: usize },
    SetRepeatMode(RepeatMode),
    /// The engine's own shuffle; kept off so ordering stays under session control
    SetNativeShuffle(bool),
}

impl EngineCommand {
    /// Replace-queue command built from tracks
    pub fn set_queue(tracks: &[Track], start_index: usize, start_position_ms: u64) -> Self {
        EngineCommand::SetQueue {
            items: tracks.iter().map(QueueItem::from).collect(),
            start_index,
            start_position_ms,
        }
    }
}

/// Authoritative engine state
///
/// Position and duration are raw engine values and may be negative or out of
/// range; the publisher clamps them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub items: Vec<QueueItem>,
    pub current_index: Option<usize>,
    pub position_ms: i64,
    pub duration_ms: i64,
    pub is_playing: bool,
    pub repeat_mode: RepeatMode,
}

impl EngineSnapshot {
    /// Current index as published: an engine that reports no (or an
    /// out-of-range) index on a non-empty queue is treated as being at 0
    pub fn resolved_index(&self) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        Some(
            self.current_index
                .filter(|&i| i < self.items.len())
                .unwrap_or(0),
        )
    }

    /// Queue contents as tracks
    pub fn queue(&self) -> QueueSnapshot {
        let tracks: Vec<Track> = self.items.iter().map(Track::from).collect();
        match self.resolved_index() {
            Some(index) => QueueSnapshot::new(tracks, index).unwrap_or_default(),
            None => QueueSnapshot::empty(),
        }
    }

    /// Item that is current, if any
    pub fn current_item(&self) -> Option<&QueueItem> {
        self.resolved_index().and_then(|i| self.items.get(i))
    }
}

/// Notification delivered on the engine's channel
///
/// Carries no payload guarantees; receivers re-fetch the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    StateChanged,
}

/// Inbound side of the engine notification channel
pub type EngineEvents = mpsc::UnboundedReceiver<EngineEvent>;

/// Control surface of an external playback engine
pub trait PlaybackEngine: Send + Sync {
    /// Submit a command; returns once queued, not once applied
    fn submit(&self, command: EngineCommand) -> EngineResult<()>;

    /// Read the full authoritative state
    fn snapshot(&self) -> EngineResult<EngineSnapshot>;

    /// Read only the playback position
    fn position_ms(&self) -> EngineResult<i64> {
        self.snapshot().map(|s| s.position_ms)
    }

    /// Release the connection; further calls may fail with `Unavailable`
    fn release(&self) {}
}
