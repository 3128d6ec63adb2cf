//! Published playback state
//!
//! [`StatePublisher`] holds the last-known [`PlaybackState`] and fans every
//! update out to any number of subscribers. Title, artist, artwork and the
//! favorite flag are read off the current snapshot on demand rather than
//! stored separately, so each update has exactly one source of truth.
//!
//! Writes are either a full resync (every field replaced from an engine
//! snapshot) or a position tick (only `position_ms`). Both clamp the
//! position into `0..=duration_ms`.

use tokio::sync::{broadcast, watch};
use tracing::trace;

use jasmine_common::events::{EventBus, PlaybackState, SessionEvent};

use crate::engine::EngineSnapshot;

/// Clamp a raw engine position into `0..=duration_ms`
pub fn clamp_position(raw_position_ms: i64, duration_ms: u64) -> u64 {
    if raw_position_ms <= 0 {
        0
    } else {
        (raw_position_ms as u64).min(duration_ms)
    }
}

/// Raw engine durations can be negative ("unknown")
fn clamp_duration(raw_duration_ms: i64) -> u64 {
    raw_duration_ms.max(0) as u64
}

pub struct StatePublisher {
    state: watch::Sender<PlaybackState>,
    lyrics: watch::Sender<Option<String>>,
    events: EventBus,
}

impl StatePublisher {
    /// Create a publisher holding the empty state
    pub fn new(event_capacity: usize) -> Self {
        let (state, _) = watch::channel(PlaybackState::default());
        let (lyrics, _) = watch::channel(None);
        Self {
            state,
            lyrics,
            events: EventBus::new(event_capacity),
        }
    }

    /// Subscribe to state snapshots; the receiver starts at the current value
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    /// Subscribe to lyrics text for the current track
    pub fn subscribe_lyrics(&self) -> watch::Receiver<Option<String>> {
        self.lyrics.subscribe()
    }

    /// Subscribe to session events
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Copy of the current snapshot
    pub fn current(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    pub fn current_title(&self) -> String {
        self.state.borrow().current_title().to_string()
    }

    pub fn current_artist(&self) -> String {
        self.state.borrow().current_artist().to_string()
    }

    pub fn current_artwork(&self) -> Option<String> {
        self.state.borrow().current_artwork().map(str::to_string)
    }

    pub fn is_current_favorite(&self) -> bool {
        self.state.borrow().is_favorite
    }

    pub fn lyrics(&self) -> Option<String> {
        self.lyrics.borrow().clone()
    }

    /// Replace the whole state from an engine snapshot
    pub fn publish_snapshot(
        &self,
        snapshot: &EngineSnapshot,
        shuffle_active: bool,
        is_favorite: bool,
    ) {
        let duration_ms = clamp_duration(snapshot.duration_ms);
        let state = PlaybackState {
            is_playing: snapshot.is_playing,
            position_ms: clamp_position(snapshot.position_ms, duration_ms),
            duration_ms,
            repeat_mode: snapshot.repeat_mode,
            shuffle_active,
            queue: snapshot.queue(),
            is_favorite,
        };

        let event = SessionEvent::StateResynced {
            current_track_id: state.current_track().map(|t| t.id.clone()),
            queue_len: state.queue.len(),
            is_playing: state.is_playing,
            timestamp: chrono::Utc::now(),
        };

        self.state.send_replace(state);
        self.events.emit_lossy(event);
    }

    /// Update only the position field
    pub fn publish_position(&self, raw_position_ms: i64) {
        let mut published = (0, 0);
        self.state.send_if_modified(|state| {
            let position_ms = clamp_position(raw_position_ms, state.duration_ms);
            published = (position_ms, state.duration_ms);
            if state.position_ms == position_ms {
                return false;
            }
            state.position_ms = position_ms;
            true
        });

        let (position_ms, duration_ms) = published;
        trace!(raw_position_ms, position_ms, "Position tick");
        self.events.emit_lossy(SessionEvent::PositionTick {
            position_ms,
            duration_ms,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Update only the favorite flag
    pub fn publish_favorite(&self, is_favorite: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.is_favorite != is_favorite;
            state.is_favorite = is_favorite;
            changed
        });
    }

    /// Publish lyrics (or a textual fallback) for `track_id`
    pub fn publish_lyrics(&self, track_id: Option<String>, lyrics: String) {
        self.lyrics.send_replace(Some(lyrics.clone()));
        self.events.emit_lossy(SessionEvent::LyricsUpdated {
            track_id,
            lyrics,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Back to the empty state (session teardown)
    pub fn reset(&self) {
        self.state.send_replace(PlaybackState::default());
        self.lyrics.send_replace(None);
    }
}
