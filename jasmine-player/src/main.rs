//! Jasmine Player (jasmine-player) - Command-line entry point
//!
//! - `metadata`: print extracted metadata as JSON
//! - `lyrics`: print embedded lyrics
//! - `play`: run a playback session against the in-process engine

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jasmine_common::favorites::MemoryFavorites;
use jasmine_player::engine::{MemoryEngine, PlaybackEngine};
use jasmine_player::{MetadataExtractor, PlaybackSession, PlayerConfig};

/// Command-line arguments for jasmine-player
#[derive(Parser, Debug)]
#[command(name = "jasmine-player")]
#[command(about = "Playback session controller")]
#[command(version)]
struct Args {
    /// Configuration file (overrides JASMINE_CONFIG and the platform file)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print title, artist, lyrics and artwork for each locator as JSON
    Metadata {
        #[arg(required = true)]
        locators: Vec<String>,
    },

    /// Print embedded lyrics for each locator
    Lyrics {
        #[arg(required = true)]
        locators: Vec<String>,
    },

    /// Queue the locators and play them on the in-process engine
    Play {
        #[arg(required = true)]
        locators: Vec<String>,

        /// How long to run before releasing the session
        #[arg(short, long, default_value = "10", env = "JASMINE_PLAY_SECONDS")]
        seconds: u64,

        /// Shuffle the queue after loading it
        #[arg(long)]
        shuffle: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(source = ?source, "Configuration loaded");

    let extractor = Arc::new(MetadataExtractor::local(config.scratch_dir()));

    match args.command {
        Command::Metadata { locators } => {
            for locator in locators {
                let extractor = Arc::clone(&extractor);
                let result = tokio::task::spawn_blocking(move || extractor.extract(&locator))
                    .await
                    .context("Metadata task failed")?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result).context("Failed to encode metadata")?
                );
            }
        }
        Command::Lyrics { locators } => {
            for locator in locators {
                let extractor = Arc::clone(&extractor);
                let lyrics = tokio::task::spawn_blocking(move || extractor.extract_lyrics(&locator))
                    .await
                    .context("Lyrics task failed")?;
                println!("{lyrics}");
            }
        }
        Command::Play {
            locators,
            seconds,
            shuffle,
        } => play(config, extractor, locators, Duration::from_secs(seconds), shuffle).await?,
    }

    Ok(())
}

/// Drive a session on the in-process engine, printing state changes
async fn play(
    config: PlayerConfig,
    extractor: Arc<MetadataExtractor>,
    locators: Vec<String>,
    run_for: Duration,
    shuffle: bool,
) -> Result<()> {
    let mut tracks = Vec::with_capacity(locators.len());
    for locator in locators {
        let extractor = Arc::clone(&extractor);
        let result = tokio::task::spawn_blocking({
            let locator = locator.clone();
            move || extractor.extract(&locator)
        })
        .await
        .context("Metadata task failed")?;
        tracks.push(result.into_track(&locator));
    }

    let tick = config.poll_interval();
    let session = PlaybackSession::new(config, extractor, Arc::new(MemoryFavorites::new()));
    let (engine, events) = MemoryEngine::new();
    session.connect(engine.clone(), events);
    session.load_and_play(tracks, 0);
    if shuffle {
        session.toggle_shuffle();
    }

    let mut state = session.subscribe();
    let mut clock = tokio::time::interval(tick);
    let deadline = tokio::time::sleep(run_for);
    tokio::pin!(deadline);

    let mut last_line = String::new();
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping");
                break;
            }
            _ = clock.tick() => {
                // The in-process engine produces no audio; advance its clock
                let snapshot = engine.snapshot()?;
                if snapshot.is_playing {
                    let position = snapshot.position_ms + tick.as_millis() as i64;
                    let has_next = snapshot
                        .current_index
                        .is_some_and(|index| index + 1 < snapshot.items.len());
                    if snapshot.duration_ms <= 0 || position < snapshot.duration_ms {
                        engine.set_position(position);
                    } else if has_next {
                        session.skip_next();
                    } else {
                        session.pause();
                    }
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = {
                    let s = state.borrow_and_update();
                    format!(
                        "{} - {} [{}/{} ms]{}{}",
                        s.current_title(),
                        s.current_artist(),
                        s.position_ms,
                        s.duration_ms,
                        if s.is_playing { "" } else { " (paused)" },
                        if s.shuffle_active { " (shuffle)" } else { "" },
                    )
                };
                if line != last_line {
                    println!("{line}");
                    last_line = line;
                }
            }
        }
    }

    session.release();
    info!("Session released");
    Ok(())
}
