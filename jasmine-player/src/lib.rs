//! # Jasmine Player Library (jasmine-player)
//!
//! Playback session controller for an external playback engine.
//!
//! **Components:**
//! - [`PlaybackSession`]: engine connection, commands, resync and polling
//! - [`playback::queue_manager`]: reversible shuffle and queue reordering
//! - [`MetadataExtractor`]: tag extraction through scoped temporary files
//! - [`StatePublisher`]: the published playback state and its subscribers
//!
//! [`engine::MemoryEngine`] is an in-process engine for the CLI and tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod playback;
pub mod state;

pub use config::PlayerConfig;
pub use error::{Error, Result};
pub use metadata::{ExtractionResult, MetadataExtractor};
pub use playback::PlaybackSession;
pub use state::StatePublisher;
