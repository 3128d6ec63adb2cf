//! Shared fixtures for jasmine-player integration tests
//!
//! - Fake resources and tag readers for driving extraction down each branch
//! - Silent WAV generation via hound
//! - Session construction and bounded waits on published state

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use jasmine_common::events::PlaybackState;
use jasmine_common::favorites::{FavoritesStore, MemoryFavorites};
use jasmine_common::Track;
use jasmine_player::metadata::{AudioTags, ResourceAccess, TagFields, TagReader};
use jasmine_player::{Error, MetadataExtractor, PlaybackSession, PlayerConfig, Result};

pub const WAIT: Duration = Duration::from_secs(2);

/// Track with a predictable locator and a one-minute duration
pub fn track(id: &str) -> Track {
    Track::new(id, format!("/music/{id}.mp3"), id.to_uppercase(), "Artist", 60_000)
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn ids(state: &PlaybackState) -> Vec<String> {
    state.queue.tracks().iter().map(|t| t.id.clone()).collect()
}

/// Resource whose stream never opens
pub struct FailingResource;

impl ResourceAccess for FailingResource {
    fn open_stream(&self, locator: &str) -> io::Result<Box<dyn Read + Send>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("cannot open {locator}"),
        ))
    }
}

/// Resource that serves the same bytes for every locator
pub struct BytesResource(pub Vec<u8>);

impl ResourceAccess for BytesResource {
    fn open_stream(&self, _locator: &str) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.0.clone())))
    }
}

/// What [`FakeTagReader`] returns
#[derive(Clone)]
pub enum FakeOutcome {
    Tags(AudioTags),
    ParseError(String),
}

/// Tag reader with a canned outcome that records the files it was given
pub struct FakeTagReader {
    outcome: FakeOutcome,
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl FakeTagReader {
    pub fn new(outcome: FakeOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Paths passed to `read_tags`, with whether the file existed at the time
    pub fn seen(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().unwrap().clone()
    }
}

impl TagReader for FakeTagReader {
    fn read_tags(&self, path: &Path) -> Result<AudioTags> {
        self.seen
            .lock()
            .unwrap()
            .push((path.to_path_buf(), path.exists()));
        match &self.outcome {
            FakeOutcome::Tags(tags) => Ok(tags.clone()),
            FakeOutcome::ParseError(msg) => Err(Error::Parse(msg.clone())),
        }
    }
}

/// Tag reader that holds each read until the test opens its gate
///
/// Reads are told apart by the temp file's extension, which follows the
/// locator's. Title and lyrics are derived from that extension.
pub struct GatedTagReader {
    gates: Mutex<HashMap<String, std::sync::mpsc::Receiver<()>>>,
    entered: mpsc::UnboundedSender<String>,
}

impl GatedTagReader {
    /// Reader plus a receiver announcing each read (by extension) as it starts
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (entered, entered_rx) = mpsc::unbounded_channel();
        let reader = Arc::new(Self {
            gates: Mutex::new(HashMap::new()),
            entered,
        });
        (reader, entered_rx)
    }

    /// Hold reads of `extension` files until the returned sender fires
    pub fn gate(&self, extension: &str) -> std::sync::mpsc::Sender<()> {
        let (open, gate) = std::sync::mpsc::channel();
        self.gates
            .lock()
            .unwrap()
            .insert(extension.to_string(), gate);
        open
    }
}

impl TagReader for GatedTagReader {
    fn read_tags(&self, path: &Path) -> Result<AudioTags> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let gate = self.gates.lock().unwrap().remove(&extension);
        let _ = self.entered.send(extension.clone());
        if let Some(gate) = gate {
            let _ = gate.recv();
        }

        Ok(AudioTags {
            duration_ms: 1_000,
            fields: Some(TagFields {
                title: Some(format!("title {extension}")),
                lyrics: Some(format!("lyrics {extension}")),
                ..Default::default()
            }),
        })
    }
}

/// Wait (bounded) for the next announced read
pub async fn next_read(entered: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(WAIT, entered.recv())
        .await
        .expect("timed out waiting for a tag read")
        .expect("tag reader dropped")
}

/// Write a one-channel 16-bit silent WAV (no tag chunks)
pub fn write_silent_wav(path: &Path, duration_ms: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..(spec.sample_rate * duration_ms / 1000) {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Number of entries in `dir`
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// Config with a fast poll cadence
pub fn test_config(scratch_dir: &Path) -> PlayerConfig {
    PlayerConfig {
        poll_interval_ms: 20,
        scratch_dir: Some(scratch_dir.to_path_buf()),
        ..Default::default()
    }
}

pub struct TestSession {
    pub session: PlaybackSession,
    pub favorites: Arc<MemoryFavorites>,
    pub scratch: tempfile::TempDir,
}

impl TestSession {
    /// Session extracting local files with lofty
    pub fn new() -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let extractor = Arc::new(MetadataExtractor::local(scratch.path()));
        Self::with_extractor(scratch, extractor)
    }

    /// Session extracting through a fake tag reader
    pub fn with_tags(resource: Arc<dyn ResourceAccess>, tags: Arc<dyn TagReader>) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let extractor = Arc::new(MetadataExtractor::new(resource, tags, scratch.path()));
        Self::with_extractor(scratch, extractor)
    }

    fn with_extractor(scratch: tempfile::TempDir, extractor: Arc<MetadataExtractor>) -> Self {
        let favorites = Arc::new(MemoryFavorites::new());
        let store: Arc<dyn FavoritesStore> = favorites.clone();
        let session = PlaybackSession::new(test_config(scratch.path()), extractor, store);
        Self {
            session,
            favorites,
            scratch,
        }
    }
}

/// Wait (bounded) until the published state satisfies `predicate`
pub async fn wait_for_state<F>(
    rx: &mut watch::Receiver<PlaybackState>,
    predicate: F,
) -> PlaybackState
where
    F: FnMut(&PlaybackState) -> bool,
{
    tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for published state")
        .expect("state channel closed")
        .clone()
}
