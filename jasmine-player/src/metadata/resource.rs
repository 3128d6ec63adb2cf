//! Resource access
//!
//! Opens the byte stream behind a locator. Remote or content-addressed
//! sources plug in by implementing [`ResourceAccess`].

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

/// Opens readable streams for locators
pub trait ResourceAccess: Send + Sync {
    fn open_stream(&self, locator: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Local filesystem access for plain paths and `file://` URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalResourceAccess;

impl LocalResourceAccess {
    /// Filesystem path a locator refers to
    pub fn local_path(locator: &str) -> PathBuf {
        PathBuf::from(locator.strip_prefix("file://").unwrap_or(locator))
    }
}

impl ResourceAccess for LocalResourceAccess {
    fn open_stream(&self, locator: &str) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(Self::local_path(locator))?;
        Ok(Box::new(file))
    }
}
