//! Event types for the Jasmine event system
//!
//! Provides shared event definitions and the EventBus used by every frontend.

mod playback_types;

pub use playback_types::{PlaybackState, RepeatMode, UNKNOWN_ARTIST, UNKNOWN_TITLE};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Session event types
///
/// Emitted by a playback session next to its state snapshot. Serializable so
/// frontends can forward them as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Published state was replaced from the engine's snapshot
    StateResynced {
        /// Id of the current track after the resync
        current_track_id: Option<String>,
        /// Number of items in the queue
        queue_len: usize,
        /// Whether the engine reports playback in progress
        is_playing: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Position poll updated the published position
    ///
    /// NOTE: Emitted on every poll tick, subscribers should expect a high rate.
    PositionTick {
        /// Clamped position (milliseconds)
        position_ms: u64,
        /// Duration of the current track (milliseconds)
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Lyrics text for the current track changed
    LyricsUpdated {
        /// Track the lyrics belong to
        track_id: Option<String>,
        /// Lyrics or a textual fallback
        lyrics: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An engine was attached to the session
    EngineConnected {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The engine connection was lost or released
    EngineDisconnected {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SessionEvent {
    /// Short name of the event variant, for logs
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::StateResynced { .. } => "StateResynced",
            SessionEvent::PositionTick { .. } => "PositionTick",
            SessionEvent::LyricsUpdated { .. } => "LyricsUpdated",
            SessionEvent::EngineConnected { .. } => "EngineConnected",
            SessionEvent::EngineDisconnected { .. } => "EngineDisconnected",
        }
    }
}

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use jasmine_common::events::{EventBus, SessionEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SessionEvent::EngineConnected {
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(SessionEvent::EngineConnected { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
