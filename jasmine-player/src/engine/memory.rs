//! In-process reference engine
//!
//! Applies every [`EngineCommand`] to an in-memory [`EngineSnapshot`] and
//! emits one [`EngineEvent::StateChanged`] per applied command. No audio is
//! produced; position only moves through [`MemoryEngine::set_position`].
//! Submitted commands are recorded so callers can inspect exactly what the
//! session sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use jasmine_common::events::RepeatMode;

use crate::playback::queue_manager::shifted_index;

use super::{
    EngineCommand, EngineError, EngineEvent, EngineEvents, EngineResult, EngineSnapshot,
    PlaybackEngine,
};

pub struct MemoryEngine {
    state: Mutex<EngineSnapshot>,
    commands: Mutex<Vec<EngineCommand>>,
    events: Mutex<Option<mpsc::UnboundedSender<EngineEvent>>>,
    native_shuffle: AtomicBool,
}

impl MemoryEngine {
    /// Create an engine and the receiving end of its notification channel
    pub fn new() -> (Arc<Self>, EngineEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            state: Mutex::new(EngineSnapshot::default()),
            commands: Mutex::new(Vec::new()),
            events: Mutex::new(Some(tx)),
            native_shuffle: AtomicBool::new(true),
        });
        (engine, rx)
    }

    /// Commands received so far, in order
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget recorded commands
    pub fn clear_commands(&self) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Simulate playback progress (no notification, like a real engine)
    pub fn set_position(&self, position_ms: i64) {
        self.lock_state().position_ms = position_ms;
    }

    /// Overwrite the raw duration the engine reports
    pub fn set_duration(&self, duration_ms: i64) {
        self.lock_state().duration_ms = duration_ms;
    }

    /// Emit a notification without changing state
    pub fn notify(&self) {
        self.emit();
    }

    /// Whether the engine's own shuffle is on
    pub fn native_shuffle_enabled(&self) -> bool {
        self.native_shuffle.load(Ordering::SeqCst)
    }

    /// Simulate connection loss: closes the notification channel and makes
    /// every further call fail with `Unavailable`
    pub fn disconnect(&self) {
        let sender = self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            info!("Memory engine disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, EngineSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_connected(&self) -> EngineResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(EngineError::Unavailable("memory engine disconnected".to_string()))
        }
    }

    fn emit(&self) {
        if let Some(tx) = self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            let _ = tx.send(EngineEvent::StateChanged);
        }
    }

    fn apply(&self, command: &EngineCommand) -> EngineResult<()> {
        let mut state = self.lock_state();
        let len = state.items.len();

        match command {
            EngineCommand::SetQueue {
                items,
                start_index,
                start_position_ms,
            } => {
                state.items = items.clone();
                state.current_index = if items.is_empty() {
                    None
                } else if *start_index < items.len() {
                    Some(*start_index)
                } else {
                    Some(0)
                };
                if state.items.is_empty() {
                    state.is_playing = false;
                }
                state.position_ms = *start_position_ms as i64;
                refresh_duration(&mut state);
            }
            EngineCommand::Play => state.is_playing = len > 0,
            EngineCommand::Pause => state.is_playing = false,
            EngineCommand::SeekTo { position_ms } => state.position_ms = *position_ms as i64,
            EngineCommand::SeekToItem { index, position_ms } => {
                if *index >= len {
                    return Err(EngineError::Rejected(format!(
                        "item {index} out of range for queue of {len}"
                    )));
                }
                state.current_index = Some(*index);
                state.position_ms = *position_ms as i64;
                refresh_duration(&mut state);
            }
            EngineCommand::SkipNext => {
                if let Some(current) = state.current_index {
                    let next = if current + 1 < len {
                        Some(current + 1)
                    } else if state.repeat_mode == RepeatMode::All {
                        Some(0)
                    } else {
                        None
                    };
                    if let Some(next) = next {
                        state.current_index = Some(next);
                        state.position_ms = 0;
                        refresh_duration(&mut state);
                    }
                }
            }
            EngineCommand::SkipPrevious => {
                if let Some(current) = state.current_index {
                    let previous = if current > 0 {
                        current - 1
                    } else if state.repeat_mode == RepeatMode::All {
                        len - 1
                    } else {
                        current
                    };
                    state.current_index = Some(previous);
                    state.position_ms = 0;
                    refresh_duration(&mut state);
                }
            }
            EngineCommand::MoveItem { from, to } => {
                if *from >= len || *to >= len {
                    return Err(EngineError::Rejected(format!(
                        "move {from} -> {to} out of range for queue of {len}"
                    )));
                }
                let item = state.items.remove(*from);
                state.items.insert(*to, item);
                state.current_index = state
                    .current_index
                    .map(|current| shifted_index(current, *from, *to));
            }
            EngineCommand::SetRepeatMode(mode) => state.repeat_mode = *mode,
            EngineCommand::SetNativeShuffle(enabled) => {
                self.native_shuffle.store(*enabled, Ordering::SeqCst);
            }
        }

        trace!(
            current_index = ?state.current_index,
            position_ms = state.position_ms,
            is_playing = state.is_playing,
            "Memory engine state"
        );
        Ok(())
    }
}

fn refresh_duration(state: &mut EngineSnapshot) {
    state.duration_ms = state
        .current_item()
        .map(|item| item.duration_ms as i64)
        .unwrap_or(0);
}

impl PlaybackEngine for MemoryEngine {
    fn submit(&self, command: EngineCommand) -> EngineResult<()> {
        self.ensure_connected()?;
        debug!(?command, "Memory engine received command");

        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());

        self.apply(&command)?;
        self.emit();
        Ok(())
    }

    fn snapshot(&self) -> EngineResult<EngineSnapshot> {
        self.ensure_connected()?;
        Ok(self.lock_state().clone())
    }

    fn position_ms(&self) -> EngineResult<i64> {
        self.ensure_connected()?;
        Ok(self.lock_state().position_ms)
    }

    fn release(&self) {
        self.disconnect();
    }
}
