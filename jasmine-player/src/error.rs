//! Error types for jasmine-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

use crate::engine::EngineError;

/// Main error type for jasmine-player
#[derive(Error, Debug)]
pub enum Error {
    /// No engine attached, or the engine connection was lost
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Resource open/copy failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unreadable tag container
    #[error("Tag parse error: {0}")]
    Parse(String),

    /// Queue index outside the current queue
    #[error("Invalid index {index} for queue of {len}")]
    InvalidIndex { index: usize, len: usize },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] jasmine_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Unavailable(msg) => Error::EngineUnavailable(msg),
            EngineError::Rejected(msg) => {
                Error::Internal(format!("engine rejected command: {msg}"))
            }
        }
    }
}

impl Error {
    /// Short error kind name, used in user-facing fallback text
    pub fn kind(&self) -> &'static str {
        match self {
            Error::EngineUnavailable(_) => "EngineUnavailable",
            Error::Io(_) => "IoError",
            Error::Parse(_) => "ParseError",
            Error::InvalidIndex { .. } => "InvalidIndex",
            Error::Config(_) => "ConfigError",
            Error::Common(_) => "CommonError",
            Error::Internal(_) => "InternalError",
        }
    }
}

/// Convenience Result type using jasmine-player Error
pub type Result<T> = std::result::Result<T, Error>;
