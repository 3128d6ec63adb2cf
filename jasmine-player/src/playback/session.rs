//! Playback session
//!
//! [`PlaybackSession`] owns the engine connection and is the only writer of
//! the published [`PlaybackState`]. Commands are forwarded to the engine
//! fire-and-forget; their effects are observed later, when the engine's
//! notification triggers a full resync. Shuffle is the exception: the new
//! order is computed here (see [`queue_manager`]) and submitted as a queue
//! replacement.
//!
//! Commands never return errors. With no engine attached they are logged and
//! dropped; they are not queued for a later connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jasmine_common::events::{PlaybackState, RepeatMode, SessionEvent};
use jasmine_common::favorites::FavoritesStore;
use jasmine_common::Track;

use super::monitor;
use super::queue_manager::{self, ShuffleState};
use crate::config::PlayerConfig;
use crate::engine::{EngineCommand, EngineEvents, EngineSnapshot, PlaybackEngine};
use crate::error::{Error, Result};
use crate::metadata::MetadataExtractor;
use crate::state::StatePublisher;

pub const LYRICS_LOADING: &str = "Loading...";
pub const LYRICS_NO_URI: &str = "No URI found";

/// An attached engine
struct Connection {
    id: u64,
    engine: Arc<dyn PlaybackEngine>,
    /// Stops this connection's resync handler
    token: CancellationToken,
}

struct SessionInner {
    config: PlayerConfig,
    connection: RwLock<Option<Connection>>,
    next_connection_id: AtomicU64,
    shuffle: Mutex<ShuffleState>,
    publisher: StatePublisher,
    extractor: Arc<MetadataExtractor>,
    favorites: Arc<dyn FavoritesStore>,
    shutdown: CancellationToken,
    lyrics_generation: AtomicU64,
    metadata_generation: AtomicU64,
}

/// Controller for one playback session
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

impl PlaybackSession {
    /// Create a session with no engine attached and start position polling
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: PlayerConfig,
        extractor: Arc<MetadataExtractor>,
        favorites: Arc<dyn FavoritesStore>,
    ) -> Self {
        let poll_interval = config.poll_interval();
        let session = Self {
            inner: Arc::new(SessionInner {
                publisher: StatePublisher::new(config.event_capacity),
                config,
                connection: RwLock::new(None),
                next_connection_id: AtomicU64::new(1),
                shuffle: Mutex::new(ShuffleState::Normal),
                extractor,
                favorites,
                shutdown: CancellationToken::new(),
                lyrics_generation: AtomicU64::new(0),
                metadata_generation: AtomicU64::new(0),
            }),
        };

        let shutdown = session.inner.shutdown.clone();
        monitor::spawn_position_poller(session.clone(), poll_interval, shutdown);
        session
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn publisher(&self) -> &StatePublisher {
        &self.inner.publisher
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.inner.publisher.subscribe()
    }

    pub fn subscribe_lyrics(&self) -> watch::Receiver<Option<String>> {
        self.inner.publisher.subscribe_lyrics()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.publisher.subscribe_events()
    }

    /// Last published state
    pub fn state(&self) -> PlaybackState {
        self.inner.publisher.current()
    }

    pub fn is_connected(&self) -> bool {
        self.read_connection().is_some()
    }

    pub fn shuffle_active(&self) -> bool {
        self.lock_shuffle().is_active()
    }

    pub fn is_released(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// Attach an engine and its notification channel
    ///
    /// Replaces any previously attached engine. The engine's native shuffle
    /// is switched off and an initial resync is published.
    pub fn connect(&self, engine: Arc<dyn PlaybackEngine>, events: EngineEvents) {
        if self.is_released() {
            warn!("Connect after release ignored");
            return;
        }

        let id = self.inner.next_connection_id.fetch_add(1, Ordering::SeqCst);
        let token = self.inner.shutdown.child_token();

        let previous = self
            .inner
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Connection {
                id,
                engine: Arc::clone(&engine),
                token: token.clone(),
            });
        if let Some(previous) = previous {
            debug!(connection = previous.id, "Replacing engine connection");
            previous.token.cancel();
        }

        if let Err(e) = engine.submit(EngineCommand::SetNativeShuffle(false)) {
            warn!(error = %e, "Could not disable native shuffle");
        }

        // A saved order only survives onto an engine holding the same items
        let queue = engine.snapshot().map(|snapshot| snapshot.queue()).unwrap_or_default();
        let mut shuffle = self.lock_shuffle();
        if shuffle.is_active() && !shuffle.restorable_onto(&queue) {
            info!(connection = id, "Engine queue differs from saved order, shuffle reset");
            *shuffle = ShuffleState::Normal;
        }
        drop(shuffle);

        monitor::spawn_resync_handler(self.clone(), id, events, token);
        info!(connection = id, "Engine connected");
        self.inner
            .publisher
            .events()
            .emit_lossy(SessionEvent::EngineConnected {
                timestamp: chrono::Utc::now(),
            });

        self.resync();
    }

    /// Drop connection `id` if it is still the attached one
    pub(crate) fn detach(&self, id: u64) {
        let mut connection = self
            .inner
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if connection.as_ref().map(|c| c.id) != Some(id) {
            return;
        }
        if let Some(lost) = connection.take() {
            lost.token.cancel();
        }
        drop(connection);

        warn!(connection = id, "Engine notification channel closed, engine detached");
        self.inner
            .publisher
            .events()
            .emit_lossy(SessionEvent::EngineDisconnected {
                timestamp: chrono::Utc::now(),
            });
    }

    /// Tear the session down: stop polling, release the engine, reset state
    ///
    /// Idempotent; only the first call has an effect.
    pub fn release(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();

        let connection = self
            .inner
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(connection) = connection {
            connection.engine.release();
        }

        *self.lock_shuffle() = ShuffleState::Normal;
        self.inner.publisher.reset();
        self.inner
            .publisher
            .events()
            .emit_lossy(SessionEvent::EngineDisconnected {
                timestamp: chrono::Utc::now(),
            });
        info!("Playback session released");
    }

    // ------------------------------------------------------------------
    // Resync
    // ------------------------------------------------------------------

    /// Replace the published state with the engine's snapshot
    pub fn resync(&self) {
        let Some(engine) = self.engine() else {
            debug!("Resync skipped, no engine");
            return;
        };

        match engine.snapshot() {
            Ok(snapshot) => {
                let shuffle_active = self.shuffle_active();
                let is_favorite = self.is_favorite(&snapshot);
                self.inner
                    .publisher
                    .publish_snapshot(&snapshot, shuffle_active, is_favorite);
            }
            Err(e) => warn!(error = %e, "Resync failed"),
        }
    }

    pub(crate) fn favorites_changes(&self) -> watch::Receiver<std::collections::BTreeSet<String>> {
        self.inner.favorites.subscribe()
    }

    /// Republish the favorite flag after a favorites store change
    pub(crate) fn refresh_favorite(&self) {
        let is_favorite = self
            .inner
            .publisher
            .current()
            .current_track()
            .map(|t| self.inner.favorites.is_favorite(&t.id))
            .unwrap_or(false);
        self.inner.publisher.publish_favorite(is_favorite);
    }

    /// Publish the engine's current position
    pub(crate) fn poll_position(&self) {
        let Some(engine) = self.engine() else {
            return;
        };
        match engine.position_ms() {
            Ok(position_ms) => self.inner.publisher.publish_position(position_ms),
            Err(e) => tracing::trace!(error = %e, "Position poll failed"),
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Replace the queue with `tracks` and start playing at `start_index`
    pub fn load_and_play(&self, tracks: Vec<Track>, start_index: usize) {
        let result = self.try_load_and_play(&tracks, start_index);
        report("load_and_play", result);
    }

    /// Extract metadata for `locator` and play it as a one-item queue
    pub async fn play_from_uri(&self, locator: &str) {
        let generation = self.inner.metadata_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let extractor = Arc::clone(&self.inner.extractor);
        let owned = locator.to_string();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&owned)).await;

        let track = match extracted {
            Ok(result) => result.into_track(locator),
            Err(e) => {
                warn!(locator, error = %e, "Metadata task failed");
                return;
            }
        };

        if self.inner.metadata_generation.load(Ordering::SeqCst) != generation {
            debug!(locator, "Superseded play request dropped");
            return;
        }

        self.load_and_play(vec![track], 0);
    }

    pub fn toggle_play_pause(&self) {
        let result = self.snapshot().and_then(|snapshot| {
            self.submit(if snapshot.is_playing {
                EngineCommand::Pause
            } else {
                EngineCommand::Play
            })
        });
        report("toggle_play_pause", result);
    }

    pub fn pause(&self) {
        let result = self.submit(EngineCommand::Pause);
        report("pause", result);
    }

    pub fn resume(&self) {
        let result = self.submit(EngineCommand::Play);
        report("resume", result);
    }

    pub fn seek(&self, position_ms: u64) {
        let result = self.submit(EngineCommand::SeekTo { position_ms });
        report("seek", result);
    }

    pub fn skip_next(&self) {
        let result = self.submit(EngineCommand::SkipNext);
        report("skip_next", result);
    }

    /// Restart the current item past the rewind threshold, otherwise go back
    ///
    /// With no previous item to go back to, the current item is restarted.
    pub fn skip_previous(&self) {
        let result = self.snapshot().and_then(|snapshot| {
            let threshold_ms = self.inner.config.rewind_threshold_ms as i64;
            let past_threshold = snapshot.position_ms > threshold_ms;
            let has_previous = match snapshot.resolved_index() {
                Some(index) => index > 0 || snapshot.repeat_mode == RepeatMode::All,
                None => false,
            };

            if past_threshold || !has_previous {
                self.submit(EngineCommand::SeekTo { position_ms: 0 })
            } else {
                self.submit(EngineCommand::SkipPrevious)
            }
        });
        report("skip_previous", result);
    }

    /// Cycle OFF → ALL → ONE → OFF
    pub fn toggle_repeat_mode(&self) {
        let result = self.snapshot().and_then(|snapshot| {
            self.submit(EngineCommand::SetRepeatMode(snapshot.repeat_mode.next()))
        });
        report("toggle_repeat_mode", result);
    }

    pub fn move_queue_item(&self, from: usize, to: usize) {
        let result = self.snapshot().and_then(|snapshot| {
            queue_manager::validate_move(snapshot.items.len(), from, to)?;
            self.submit(EngineCommand::MoveItem { from, to })
        });
        report("move_queue_item", result);
    }

    /// Jump to queue item `index` and play it from the start
    pub fn play_from_queue(&self, index: usize) {
        let result = self.snapshot().and_then(|snapshot| {
            let len = snapshot.items.len();
            if index >= len {
                return Err(Error::InvalidIndex { index, len });
            }
            self.submit(EngineCommand::SeekToItem {
                index,
                position_ms: 0,
            })?;
            self.submit(EngineCommand::Play)
        });
        report("play_from_queue", result);
    }

    /// Switch between the natural and a shuffled queue order
    ///
    /// Shuffling keeps the current item at index 0 and saves the previous
    /// order; switching back restores that order around the current item.
    /// The playback position is carried across both transitions.
    pub fn toggle_shuffle(&self) {
        let result = self.try_toggle_shuffle();
        report("toggle_shuffle", result);
    }

    /// Add or remove the current item from favorites
    pub fn toggle_favorite(&self) {
        let Some(track) = self.inner.publisher.current().current_track().cloned() else {
            debug!("toggle_favorite: nothing playing");
            return;
        };

        let favorites = &self.inner.favorites;
        let result = if favorites.is_favorite(&track.id) {
            favorites.remove(&track.id)
        } else {
            favorites.add(&track.id)
        };

        match result {
            Ok(()) => self.refresh_favorite(),
            Err(e) => warn!(id = %track.id, error = %e, "Favorite update failed"),
        }
    }

    /// Read lyrics for the current item and publish them
    ///
    /// Publishes a loading marker first. When several loads overlap, only the
    /// most recently requested one publishes its result.
    pub async fn load_lyrics(&self) {
        let generation = self.inner.lyrics_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let publisher = &self.inner.publisher;

        let Some(track) = publisher.current().current_track().cloned() else {
            publisher.publish_lyrics(None, LYRICS_NO_URI.to_string());
            return;
        };
        publisher.publish_lyrics(Some(track.id.clone()), LYRICS_LOADING.to_string());

        let extractor = Arc::clone(&self.inner.extractor);
        let locator = track.source_locator.clone();
        let lyrics = tokio::task::spawn_blocking(move || extractor.extract_lyrics(&locator))
            .await
            .unwrap_or_else(|e| format!("Error reading lyrics: JoinError - {e}"));

        if self.inner.lyrics_generation.load(Ordering::SeqCst) != generation {
            debug!(id = %track.id, "Superseded lyrics result dropped");
            return;
        }
        publisher.publish_lyrics(Some(track.id), lyrics);
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn try_load_and_play(&self, tracks: &[Track], start_index: usize) -> Result<()> {
        if !tracks.is_empty() && start_index >= tracks.len() {
            return Err(Error::InvalidIndex {
                index: start_index,
                len: tracks.len(),
            });
        }
        let engine = self.require_engine()?;

        // A new queue invalidates any saved pre-shuffle order
        *self.lock_shuffle() = ShuffleState::Normal;

        engine.submit(EngineCommand::set_queue(tracks, start_index, 0))?;
        engine.submit(EngineCommand::Play)?;
        debug!(tracks = tracks.len(), start_index, "Queue loaded");
        Ok(())
    }

    fn try_toggle_shuffle(&self) -> Result<()> {
        let engine = self.require_engine()?;
        let snapshot = engine.snapshot()?;
        let position_ms = snapshot.position_ms.max(0) as u64;

        let mut shuffle = self.lock_shuffle();
        let next = match &*shuffle {
            ShuffleState::Normal => {
                let Some((shuffled, saved_order)) = queue_manager::shuffle(&snapshot.queue()) else {
                    debug!("Shuffle ignored, queue is empty");
                    return Ok(());
                };
                engine.submit(EngineCommand::set_queue(shuffled.tracks(), 0, position_ms))?;
                ShuffleState::Shuffled { saved_order }
            }
            ShuffleState::Shuffled { saved_order } => {
                let current_id = snapshot.current_item().map(|item| item.media_id.as_str());
                let (restored, index) = queue_manager::unshuffle(saved_order, current_id);
                engine.submit(EngineCommand::set_queue(restored.tracks(), index, position_ms))?;
                ShuffleState::Normal
            }
        };
        info!(shuffle = next.is_active(), position_ms, "Shuffle toggled");
        *shuffle = next;
        drop(shuffle);

        if snapshot.is_playing {
            engine.submit(EngineCommand::Play)?;
        }
        Ok(())
    }

    fn read_connection(&self) -> std::sync::RwLockReadGuard<'_, Option<Connection>> {
        self.inner
            .connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_shuffle(&self) -> std::sync::MutexGuard<'_, ShuffleState> {
        self.inner
            .shuffle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn engine(&self) -> Option<Arc<dyn PlaybackEngine>> {
        self.read_connection()
            .as_ref()
            .map(|c| Arc::clone(&c.engine))
    }

    fn require_engine(&self) -> Result<Arc<dyn PlaybackEngine>> {
        self.engine()
            .ok_or_else(|| Error::EngineUnavailable("no engine connected".to_string()))
    }

    fn snapshot(&self) -> Result<EngineSnapshot> {
        Ok(self.require_engine()?.snapshot()?)
    }

    fn submit(&self, command: EngineCommand) -> Result<()> {
        debug!(?command, "Submitting command");
        Ok(self.require_engine()?.submit(command)?)
    }

    fn is_favorite(&self, snapshot: &EngineSnapshot) -> bool {
        snapshot
            .current_item()
            .map(|item| self.inner.favorites.is_favorite(&item.media_id))
            .unwrap_or(false)
    }
}

/// Log the outcome of a command; failures become no-ops
fn report(command: &str, result: Result<()>) {
    if let Err(e) = result {
        warn!(command, kind = e.kind(), error = %e, "Command dropped");
    }
}
