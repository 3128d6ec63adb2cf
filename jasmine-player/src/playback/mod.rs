//! Playback control: session, queue algorithms and background tasks

mod monitor;
pub mod queue_manager;
pub mod session;

pub use queue_manager::ShuffleState;
pub use session::{PlaybackSession, LYRICS_LOADING, LYRICS_NO_URI};
