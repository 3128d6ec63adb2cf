//! Playback session integration tests against the in-process engine

mod helpers;

use std::collections::BTreeSet;
use std::sync::Arc;

use jasmine_common::events::{PlaybackState, RepeatMode, SessionEvent};
use jasmine_common::favorites::FavoritesStore;
use jasmine_common::Track;
use jasmine_player::engine::{EngineCommand, MemoryEngine, PlaybackEngine};
use jasmine_player::metadata::{AudioTags, TagFields};
use jasmine_player::playback::{LYRICS_LOADING, LYRICS_NO_URI};
use jasmine_player::state::clamp_position;

use helpers::*;

fn connected() -> (TestSession, Arc<MemoryEngine>) {
    let test = TestSession::new();
    let (engine, events) = MemoryEngine::new();
    test.session.connect(engine.clone(), events);
    (test, engine)
}

async fn wait_for_detach(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>) {
    tokio::time::timeout(WAIT, async {
        loop {
            if let Ok(SessionEvent::EngineDisconnected { .. }) = events.recv().await {
                break;
            }
        }
    })
    .await
    .expect("engine was not detached");
}

fn current_is(id: &'static str) -> impl FnMut(&PlaybackState) -> bool {
    move |s| s.current_track().is_some_and(|t| t.id == id)
}

#[tokio::test]
async fn test_connect_disables_native_shuffle() {
    let (test, engine) = connected();

    assert!(test.session.is_connected());
    assert!(!engine.native_shuffle_enabled());
    assert_eq!(engine.commands(), vec![EngineCommand::SetNativeShuffle(false)]);
}

#[tokio::test]
async fn test_load_and_play_submits_queue_then_play() {
    let (test, engine) = connected();
    engine.clear_commands();

    test.session.load_and_play(tracks(&["a", "b", "c"]), 2);

    let commands = engine.commands();
    assert_eq!(commands.len(), 2);
    assert!(matches!(
        &commands[0],
        EngineCommand::SetQueue { items, start_index: 2, start_position_ms: 0 } if items.len() == 3
    ));
    assert_eq!(commands[1], EngineCommand::Play);

    let mut rx = test.session.subscribe();
    let state = wait_for_state(&mut rx, |s| s.is_playing).await;
    assert_eq!(state.queue.current_index(), Some(2));
    assert_eq!(state.current_title(), "C");
}

#[tokio::test]
async fn test_shuffle_round_trip_restores_order() {
    let (test, engine) = connected();
    let mut rx = test.session.subscribe();

    test.session.load_and_play(tracks(&["a", "b", "c"]), 1);
    wait_for_state(&mut rx, |s| s.is_playing).await;
    engine.set_position(12_345);

    test.session.toggle_shuffle();
    let shuffled = wait_for_state(&mut rx, |s| s.shuffle_active).await;

    assert_eq!(shuffled.queue.current_index(), Some(0));
    assert_eq!(shuffled.current_track().unwrap().id, "b");
    let rest: BTreeSet<String> = ids(&shuffled)[1..].iter().cloned().collect();
    assert_eq!(rest, BTreeSet::from(["a".to_string(), "c".to_string()]));
    assert_eq!(shuffled.position_ms, 12_345);
    assert!(shuffled.is_playing);

    test.session.toggle_shuffle();
    let restored = wait_for_state(&mut rx, |s| !s.shuffle_active).await;

    assert_eq!(ids(&restored), vec!["a", "b", "c"]);
    assert_eq!(restored.queue.current_index(), Some(1));
    assert_eq!(restored.position_ms, 12_345);
}

#[tokio::test]
async fn test_unshuffle_follows_current_item() {
    let (test, engine) = connected();
    let mut rx = test.session.subscribe();

    test.session.load_and_play(tracks(&["a", "b", "c", "d"]), 0);
    test.session.toggle_shuffle();
    let shuffled = wait_for_state(&mut rx, |s| s.shuffle_active).await;

    // Move on to whatever the shuffle put second
    let second = ids(&shuffled)[1].clone();
    engine.submit(EngineCommand::SkipNext).unwrap();
    wait_for_state(&mut rx, |s| s.queue.current_index() == Some(1)).await;

    test.session.toggle_shuffle();
    let restored = wait_for_state(&mut rx, |s| !s.shuffle_active).await;
    assert_eq!(ids(&restored), vec!["a", "b", "c", "d"]);
    assert_eq!(restored.current_track().unwrap().id, second);
}

#[tokio::test]
async fn test_shuffle_on_empty_queue_is_noop() {
    let (test, engine) = connected();
    engine.clear_commands();

    test.session.toggle_shuffle();

    assert!(!test.session.shuffle_active());
    assert!(engine.commands().is_empty());
}

#[tokio::test]
async fn test_new_queue_resets_shuffle() {
    let (test, _engine) = connected();

    test.session.load_and_play(tracks(&["a", "b"]), 0);
    test.session.toggle_shuffle();
    assert!(test.session.shuffle_active());

    test.session.load_and_play(tracks(&["x", "y"]), 0);
    assert!(!test.session.shuffle_active());
}

#[tokio::test]
async fn test_skip_previous_rewind_rule() {
    let (test, engine) = connected();
    test.session.load_and_play(tracks(&["a", "b", "c"]), 0);

    // First item at 500ms: nothing to go back to, restart instead
    engine.set_position(500);
    engine.clear_commands();
    test.session.skip_previous();
    assert_eq!(engine.commands(), vec![EngineCommand::SeekTo { position_ms: 0 }]);

    engine.submit(EngineCommand::SeekToItem { index: 1, position_ms: 500 }).unwrap();
    engine.clear_commands();
    test.session.skip_previous();
    assert_eq!(engine.commands(), vec![EngineCommand::SkipPrevious]);

    engine.submit(EngineCommand::SeekToItem { index: 1, position_ms: 3_000 }).unwrap();
    engine.clear_commands();
    test.session.skip_previous();
    assert_eq!(engine.commands(), vec![EngineCommand::SkipPrevious]);

    engine.set_position(3_001);
    engine.clear_commands();
    test.session.skip_previous();
    assert_eq!(engine.commands(), vec![EngineCommand::SeekTo { position_ms: 0 }]);
}

#[tokio::test]
async fn test_single_commands() {
    let (test, engine) = connected();
    test.session.load_and_play(tracks(&["a", "b"]), 0);
    engine.clear_commands();

    test.session.toggle_play_pause();
    test.session.toggle_play_pause();
    test.session.pause();
    test.session.resume();
    test.session.seek(42_000);
    test.session.skip_next();
    test.session.toggle_repeat_mode();
    test.session.toggle_repeat_mode();

    assert_eq!(
        engine.commands(),
        vec![
            EngineCommand::Pause,
            EngineCommand::Play,
            EngineCommand::Pause,
            EngineCommand::Play,
            EngineCommand::SeekTo { position_ms: 42_000 },
            EngineCommand::SkipNext,
            EngineCommand::SetRepeatMode(RepeatMode::All),
            EngineCommand::SetRepeatMode(RepeatMode::One),
        ]
    );
}

#[tokio::test]
async fn test_published_state_matches_engine() {
    let (test, engine) = connected();
    let mut rx = test.session.subscribe();

    test.session.load_and_play(tracks(&["a", "b", "c", "d"]), 1);
    test.session.seek(5_000);
    test.session.toggle_repeat_mode();
    test.session.move_queue_item(0, 3);

    let state = wait_for_state(&mut rx, |s| {
        s.repeat_mode == RepeatMode::All && ids(s) == ["b", "c", "d", "a"]
    })
    .await;

    let snapshot = engine.snapshot().unwrap();
    assert_eq!(state.queue, snapshot.queue());
    assert_eq!(state.is_playing, snapshot.is_playing);
    assert_eq!(state.repeat_mode, snapshot.repeat_mode);
    assert_eq!(state.duration_ms, snapshot.duration_ms as u64);
    assert_eq!(
        state.position_ms,
        clamp_position(snapshot.position_ms, snapshot.duration_ms as u64)
    );
    assert_eq!(state.current_track().unwrap().id, "b");
}

#[tokio::test]
async fn test_position_poll_is_clamped() {
    let (test, engine) = connected();
    let mut rx = test.session.subscribe();

    test.session.load_and_play(tracks(&["a"]), 0);
    wait_for_state(&mut rx, |s| s.duration_ms == 60_000).await;

    engine.set_position(30_000);
    wait_for_state(&mut rx, |s| s.position_ms == 30_000).await;

    engine.set_position(-5);
    wait_for_state(&mut rx, |s| s.position_ms == 0).await;

    engine.set_position(60_000 + 1_000);
    let state = wait_for_state(&mut rx, |s| s.position_ms == 60_000).await;
    assert!(state.position_ms <= state.duration_ms);
}

#[tokio::test]
async fn test_invalid_indices_are_rejected() {
    let (test, engine) = connected();
    test.session.load_and_play(tracks(&["a", "b"]), 0);
    engine.clear_commands();

    test.session.play_from_queue(5);
    test.session.move_queue_item(0, 2);
    test.session.move_queue_item(2, 0);
    test.session.move_queue_item(1, 1);
    assert!(engine.commands().is_empty());

    test.session.play_from_queue(1);
    assert_eq!(
        engine.commands(),
        vec![
            EngineCommand::SeekToItem { index: 1, position_ms: 0 },
            EngineCommand::Play,
        ]
    );
}

#[tokio::test]
async fn test_commands_without_engine_are_dropped() {
    let test = TestSession::new();

    test.session.load_and_play(tracks(&["a"]), 0);
    test.session.toggle_play_pause();
    test.session.skip_previous();
    test.session.toggle_shuffle();
    test.session.move_queue_item(0, 1);
    test.session.play_from_queue(0);

    assert_eq!(test.session.state(), Default::default());
    assert!(!test.session.shuffle_active());

    // Nothing was queued for a later connection
    let (engine, events) = MemoryEngine::new();
    test.session.connect(engine.clone(), events);
    assert_eq!(engine.commands(), vec![EngineCommand::SetNativeShuffle(false)]);
}

#[tokio::test]
async fn test_disconnect_and_reconnect() {
    let (test, engine) = connected();
    let mut events = test.session.subscribe_events();
    test.session.load_and_play(tracks(&["a", "b"]), 0);

    engine.disconnect();
    wait_for_detach(&mut events).await;
    assert!(!test.session.is_connected());

    // No-ops while detached
    test.session.skip_next();
    test.session.toggle_shuffle();

    let (replacement, replacement_events) = MemoryEngine::new();
    replacement
        .submit(EngineCommand::set_queue(&tracks(&["x", "y", "z"]), 2, 0))
        .unwrap();
    test.session.connect(replacement.clone(), replacement_events);

    let state = test.session.state();
    assert_eq!(ids(&state), vec!["x", "y", "z"]);
    assert_eq!(state.current_title(), "Z");
    assert!(!replacement.native_shuffle_enabled());
}

#[tokio::test]
async fn test_reconnect_to_other_queue_resets_shuffle() {
    let (test, engine) = connected();
    let mut rx = test.session.subscribe();
    let mut events = test.session.subscribe_events();

    test.session.load_and_play(tracks(&["a", "b", "c"]), 1);
    test.session.toggle_shuffle();
    wait_for_state(&mut rx, |s| s.shuffle_active).await;

    engine.disconnect();
    wait_for_detach(&mut events).await;

    let (replacement, replacement_events) = MemoryEngine::new();
    replacement
        .submit(EngineCommand::set_queue(&tracks(&["x", "y"]), 0, 0))
        .unwrap();
    test.session.connect(replacement.clone(), replacement_events);

    let state = test.session.state();
    assert_eq!(ids(&state), vec!["x", "y"]);
    assert!(!state.shuffle_active);
    assert!(!test.session.shuffle_active());

    // The old saved order must never reach the new engine
    test.session.toggle_shuffle();
    let mut queued: Vec<String> = replacement
        .snapshot()
        .unwrap()
        .items
        .iter()
        .map(|item| item.media_id.clone())
        .collect();
    queued.sort();
    assert_eq!(queued, vec!["x", "y"]);
    assert!(test.session.shuffle_active());
}

#[tokio::test]
async fn test_reconnect_to_same_items_keeps_shuffle() {
    let (test, engine) = connected();
    let mut rx = test.session.subscribe();
    let mut events = test.session.subscribe_events();

    test.session.load_and_play(tracks(&["a", "b", "c"]), 1);
    test.session.toggle_shuffle();
    let shuffled = wait_for_state(&mut rx, |s| s.shuffle_active).await;

    engine.disconnect();
    wait_for_detach(&mut events).await;

    let (replacement, replacement_events) = MemoryEngine::new();
    replacement
        .submit(EngineCommand::set_queue(shuffled.queue.tracks(), 0, 0))
        .unwrap();
    test.session.connect(replacement.clone(), replacement_events);
    assert!(test.session.state().shuffle_active);

    test.session.toggle_shuffle();
    let restored = replacement.snapshot().unwrap();
    let order: Vec<&str> = restored.items.iter().map(|i| i.media_id.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c"]);
    assert_eq!(restored.current_item().unwrap().media_id, "b");
    assert!(!test.session.shuffle_active());
}

#[tokio::test]
async fn test_favorites_follow_store() {
    let (test, _engine) = connected();
    let mut rx = test.session.subscribe();

    test.session.load_and_play(tracks(&["a", "b"]), 0);
    wait_for_state(&mut rx, |s| s.current_track().is_some()).await;
    assert!(!test.session.publisher().is_current_favorite());

    test.session.toggle_favorite();
    assert!(test.favorites.is_favorite("a"));
    assert!(test.session.publisher().is_current_favorite());

    // Edits made elsewhere are picked up too
    test.favorites.remove("a").unwrap();
    wait_for_state(&mut rx, |s| !s.is_favorite).await;

    test.favorites.add("a").unwrap();
    wait_for_state(&mut rx, |s| s.is_favorite).await;

    test.session.toggle_favorite();
    assert!(!test.favorites.is_favorite("a"));
    assert!(!test.session.state().is_favorite);
}

#[tokio::test]
async fn test_lyrics_published_for_current_item() {
    let tags = FakeTagReader::new(FakeOutcome::Tags(AudioTags {
        duration_ms: 1_000,
        fields: Some(TagFields {
            lyrics: Some("la la la".to_string()),
            ..Default::default()
        }),
    }));
    let test = TestSession::with_tags(Arc::new(BytesResource(b"audio".to_vec())), tags);

    test.session.load_lyrics().await;
    assert_eq!(test.session.publisher().lyrics().as_deref(), Some(LYRICS_NO_URI));

    let (engine, events) = MemoryEngine::new();
    test.session.connect(engine, events);
    test.session.load_and_play(tracks(&["a"]), 0);
    let mut rx = test.session.subscribe();
    wait_for_state(&mut rx, |s| s.current_track().is_some()).await;

    let mut session_events = test.session.subscribe_events();
    test.session.load_lyrics().await;
    assert_eq!(test.session.publisher().lyrics().as_deref(), Some("la la la"));

    let mut updates = Vec::new();
    while let Ok(event) = session_events.try_recv() {
        if let SessionEvent::LyricsUpdated { lyrics, track_id, .. } = event {
            assert_eq!(track_id.as_deref(), Some("a"));
            updates.push(lyrics);
        }
    }
    assert_eq!(updates, vec![LYRICS_LOADING.to_string(), "la la la".to_string()]);
}

#[tokio::test]
async fn test_newest_lyrics_request_wins() {
    let (reader, mut entered) = GatedTagReader::new();
    let test = TestSession::with_tags(Arc::new(BytesResource(b"audio".to_vec())), reader.clone());
    let (engine, events) = MemoryEngine::new();
    test.session.connect(engine, events);
    let mut rx = test.session.subscribe();

    test.session.load_and_play(
        vec![
            Track::new("a", "/music/a.ogg", "A", "Artist", 60_000),
            Track::new("b", "/music/b.flac", "B", "Artist", 60_000),
        ],
        0,
    );
    wait_for_state(&mut rx, current_is("a")).await;

    let open_older = reader.gate("ogg");
    let open_newer = reader.gate("flac");

    let session = test.session.clone();
    let older = tokio::spawn(async move { session.load_lyrics().await });
    assert_eq!(next_read(&mut entered).await, "ogg");

    test.session.play_from_queue(1);
    wait_for_state(&mut rx, current_is("b")).await;

    let session = test.session.clone();
    let newer = tokio::spawn(async move { session.load_lyrics().await });
    assert_eq!(next_read(&mut entered).await, "flac");

    open_newer.send(()).unwrap();
    newer.await.unwrap();
    assert_eq!(test.session.publisher().lyrics().as_deref(), Some("lyrics flac"));

    // The older request finishes last but was superseded
    open_older.send(()).unwrap();
    older.await.unwrap();
    assert_eq!(test.session.publisher().lyrics().as_deref(), Some("lyrics flac"));
}

#[tokio::test]
async fn test_newest_play_from_uri_request_wins() {
    let (reader, mut entered) = GatedTagReader::new();
    let test = TestSession::with_tags(Arc::new(BytesResource(b"audio".to_vec())), reader.clone());
    let (engine, events) = MemoryEngine::new();
    test.session.connect(engine.clone(), events);
    engine.clear_commands();
    let mut rx = test.session.subscribe();

    let open_older = reader.gate("ogg");
    let open_newer = reader.gate("flac");

    let session = test.session.clone();
    let older = tokio::spawn(async move { session.play_from_uri("/music/old.ogg").await });
    assert_eq!(next_read(&mut entered).await, "ogg");

    let session = test.session.clone();
    let newer = tokio::spawn(async move { session.play_from_uri("/music/new.flac").await });
    assert_eq!(next_read(&mut entered).await, "flac");

    open_newer.send(()).unwrap();
    newer.await.unwrap();
    wait_for_state(&mut rx, current_is("/music/new.flac")).await;

    open_older.send(()).unwrap();
    older.await.unwrap();

    let queue_loads = engine
        .commands()
        .iter()
        .filter(|c| matches!(c, EngineCommand::SetQueue { .. }))
        .count();
    assert_eq!(queue_loads, 1);

    let state = test.session.state();
    assert_eq!(ids(&state), vec!["/music/new.flac"]);
    assert_eq!(state.current_title(), "title flac");
}

#[tokio::test]
async fn test_play_from_uri_uses_extracted_metadata() {
    let tags = FakeTagReader::new(FakeOutcome::Tags(AudioTags {
        duration_ms: 215_000,
        fields: Some(TagFields {
            title: Some("Song Title".to_string()),
            artist: Some("Band".to_string()),
            ..Default::default()
        }),
    }));
    let test = TestSession::with_tags(Arc::new(BytesResource(b"audio".to_vec())), tags);
    let (engine, events) = MemoryEngine::new();
    test.session.connect(engine, events);
    let mut rx = test.session.subscribe();

    test.session.play_from_uri("file:///downloads/song.flac").await;

    let state = wait_for_state(&mut rx, |s| s.is_playing).await;
    let current = state.current_track().unwrap();
    assert_eq!(current.id, "file:///downloads/song.flac");
    assert_eq!(current.title, "Song Title");
    assert_eq!(current.artist, "Band");
    assert_eq!(state.duration_ms, 215_000);
    assert_eq!(state.queue.len(), 1);
}

#[tokio::test]
async fn test_play_from_uri_falls_back_on_missing_file() {
    let test = TestSession::new();
    let (engine, events) = MemoryEngine::new();
    test.session.connect(engine, events);
    let mut rx = test.session.subscribe();

    test.session.play_from_uri("/nonexistent/dir/Lost Track.mp3").await;

    let state = wait_for_state(&mut rx, |s| s.is_playing).await;
    assert_eq!(state.current_title(), "Lost Track");
    assert_eq!(state.current_artist(), "Unknown Artist");
    assert_eq!(state.current_artwork(), None);
}

#[tokio::test]
async fn test_release_tears_down() {
    let (test, engine) = connected();
    let mut rx = test.session.subscribe();
    test.session.load_and_play(tracks(&["a", "b"]), 0);
    test.session.toggle_shuffle();
    wait_for_state(&mut rx, |s| s.shuffle_active).await;

    test.session.release();

    assert!(test.session.is_released());
    assert!(!test.session.is_connected());
    assert!(!test.session.shuffle_active());
    assert!(!engine.is_connected());
    assert_eq!(test.session.state(), Default::default());
    assert_eq!(test.session.publisher().current_title(), "Unknown Title");

    // Second release and late connects are ignored
    test.session.release();
    let (late, late_events) = MemoryEngine::new();
    test.session.connect(late.clone(), late_events);
    assert!(!test.session.is_connected());
    assert!(late.commands().is_empty());
}
