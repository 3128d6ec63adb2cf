//! # Jasmine Common Library
//!
//! Shared code for the Jasmine player frontends including:
//! - Track and queue data model
//! - Event types (SessionEvent enum) and the EventBus
//! - Configuration file resolution
//! - Favorites store collaborator

pub mod config;
pub mod error;
pub mod events;
pub mod favorites;
pub mod track;

pub use error::{Error, Result};
pub use track::{QueueSnapshot, Track};
