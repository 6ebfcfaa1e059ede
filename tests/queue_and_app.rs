// Queue semantics and app-level reconciliation: pointer movement, shuffle
// round trips, removal adjustments, repeat handling, and the error-skip path.
// App tests run against a recording stub engine, so nothing here spawns mpv.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;

use tunefeed::action::Action;
use tunefeed::api::feed::{SortOption, TimeWindow};
use tunefeed::app::App;
use tunefeed::config::Config;
use tunefeed::db::Database;
use tunefeed::player::queue::Queue;
use tunefeed::player::{EngineState, PlayerControl, RepeatMode};
use tunefeed::playlist::{Playlist, Track};

/// Engine stub that records every load. `get_volume` always fails, like a
/// live engine whose socket isn't up yet.
#[derive(Default)]
struct FakePlayer {
    loads: Arc<Mutex<Vec<(String, f64)>>>,
}

#[async_trait]
impl PlayerControl for FakePlayer {
    fn set_action_tx(&mut self, _tx: mpsc::UnboundedSender<Action>) {}

    async fn load(&mut self, watch_url: &str, volume: f64) -> anyhow::Result<()> {
        self.loads.lock().unwrap().push((watch_url.to_string(), volume));
        Ok(())
    }

    async fn play(&self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn pause(&self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn toggle_pause(&self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn seek_to(&self, _secs: f64) -> anyhow::Result<()> {
        Ok(())
    }
    async fn set_volume(&self, _volume: f64) -> anyhow::Result<()> {
        Ok(())
    }
    async fn get_volume(&self) -> anyhow::Result<f64> {
        Err(anyhow::anyhow!("engine not running"))
    }
    async fn background(&self) {}
    async fn foreground(&self) {}
    fn set_playing_hint(&self, _playing: bool) {}
}

fn make_track(n: usize) -> Track {
    Track {
        id: format!("track-{}", n),
        video_id: format!("aaaaaaaaa{:02}", n),
        title: format!("Track {}", n),
        artist: Some("Artist".to_string()),
        source_url: None,
        thumbnail_url: None,
        added_at: 1_700_000_000_000 + n as i64,
    }
}

fn make_tracks(count: usize) -> Vec<Track> {
    (0..count).map(make_track).collect()
}

fn make_playlist(id: &str, created_at: i64, tracks: Vec<Track>) -> Playlist {
    Playlist {
        id: id.to_string(),
        name: format!("indieheads - hot ({})", id),
        topic: "indieheads".to_string(),
        sort: SortOption::Hot,
        window: TimeWindow::Week,
        tracks,
        created_at,
        last_updated: created_at,
    }
}

/// App over a throwaway database and a stub engine, plus the stub's load log.
/// The TempDir must outlive the App.
fn recording_app() -> (App, TempDir, Arc<Mutex<Vec<(String, f64)>>>) {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(&dir.path().join("test.db")).unwrap();
    let player = FakePlayer::default();
    let loads = player.loads.clone();
    let app = App::with_player(Config::default(), db, Box::new(player)).unwrap();
    (app, dir, loads)
}

fn test_app() -> (App, TempDir) {
    let (app, dir, _) = recording_app();
    (app, dir)
}

// ── Queue ────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_queue_degrades_to_noops() {
    let mut queue = Queue::new();
    assert!(queue.is_empty());
    assert!(queue.current().is_none());
    assert!(queue.next().is_none());
    assert!(queue.previous().is_none());
    assert_eq!(queue.current_index(), 0);

    queue.toggle_shuffle();
    queue.remove("nothing");
    assert!(queue.current().is_none());
}

#[test]
fn test_load_tracks_resets_pointer_and_shuffle() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(3));
    queue.set_current_index(2);
    queue.toggle_shuffle();

    queue.load_tracks(make_tracks(5));
    assert_eq!(queue.len(), 5);
    assert_eq!(queue.current_index(), 0);
    assert!(!queue.is_shuffled());
}

#[test]
fn test_next_wraps_back_to_start() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(3));

    let visited: Vec<String> = (0..3).map(|_| queue.next().unwrap().id.clone()).collect();
    assert_eq!(visited, ["track-1", "track-2", "track-0"]);
    assert_eq!(queue.current_index(), 0);
}

#[test]
fn test_previous_wraps_to_end() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(3));

    assert_eq!(queue.previous().unwrap().id, "track-2");
    assert_eq!(queue.previous().unwrap().id, "track-1");
}

#[test]
fn test_set_current_index_out_of_range_is_ignored() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(3));
    queue.set_current_index(1);

    assert!(queue.set_current_index(3).is_none());
    assert_eq!(queue.current_index(), 1);
}

#[test]
fn test_remove_before_current_keeps_playing_track() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(3));
    queue.set_current_index(1);

    queue.remove("track-0");
    assert_eq!(queue.current_index(), 0);
    assert_eq!(queue.current().unwrap().id, "track-1");
}

#[test]
fn test_remove_current_last_clamps_pointer() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(3));
    queue.set_current_index(2);

    queue.remove("track-2");
    assert_eq!(queue.current_index(), 1);
    assert_eq!(queue.current().unwrap().id, "track-1");
}

#[test]
fn test_remove_last_remaining_track_empties_queue() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(1));

    queue.remove("track-0");
    assert!(queue.is_empty());
    assert!(queue.current().is_none());
    assert_eq!(queue.current_index(), 0);
}

#[test]
fn test_shuffle_keeps_playing_track_at_slot_zero() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(10));
    queue.set_current_index(4);

    queue.toggle_shuffle();
    assert!(queue.is_shuffled());
    assert_eq!(queue.current_index(), 0);
    assert_eq!(queue.current().unwrap().id, "track-4");
    assert_eq!(queue.len(), 10);
}

#[test]
fn test_unshuffle_restores_order_and_relocates_pointer() {
    let mut queue = Queue::new();
    let original = make_tracks(10);
    queue.load_tracks(original.clone());
    queue.set_current_index(4);

    queue.toggle_shuffle();
    queue.toggle_shuffle();

    assert!(!queue.is_shuffled());
    assert_eq!(queue.tracks(), &original[..]);
    assert_eq!(queue.current_index(), 4, "pointer relocated by track id");
}

#[test]
fn test_unshuffle_falls_back_to_start_when_current_was_removed() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(5));
    queue.set_current_index(2);

    queue.toggle_shuffle();
    queue.remove("track-2");
    queue.toggle_shuffle();

    assert_eq!(queue.current_index(), 0);
    assert_eq!(queue.len(), 4);
}

#[test]
fn test_add_track_survives_shuffle_round_trip() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(3));

    queue.toggle_shuffle();
    queue.add_track(make_track(9));
    queue.toggle_shuffle();

    assert_eq!(queue.len(), 4);
    assert!(queue.tracks().iter().any(|t| t.id == "track-9"));
}

#[test]
fn test_clear_resets_everything() {
    let mut queue = Queue::new();
    queue.load_tracks(make_tracks(3));
    queue.set_current_index(2);
    queue.toggle_shuffle();

    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(queue.current_index(), 0);
    assert!(!queue.is_shuffled());
}

// ── App reconciliation ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_playlist_ready_persists_and_loads_queue() {
    let (mut app, _dir) = test_app();

    let playlist = make_playlist("pl-1", 100, make_tracks(3));
    app.handle_action(Action::PlaylistReady(playlist)).await.unwrap();

    assert_eq!(app.queue.len(), 3);
    assert_eq!(app.queue.current_index(), 0);
    assert_eq!(app.playlists.len(), 1);
    assert_eq!(app.active_playlist.as_ref().unwrap().id, "pl-1");
}

#[tokio::test]
async fn test_load_playlist_by_position() {
    let (mut app, _dir) = test_app();

    app.handle_action(Action::PlaylistReady(make_playlist("pl-old", 100, make_tracks(2))))
        .await
        .unwrap();
    app.handle_action(Action::PlaylistReady(make_playlist("pl-new", 200, make_tracks(4))))
        .await
        .unwrap();

    // History lists most recent first, so position 2 is the older one.
    app.handle_action(Action::LoadPlaylist("2".to_string())).await.unwrap();
    assert_eq!(app.active_playlist.as_ref().unwrap().id, "pl-old");
    assert_eq!(app.queue.len(), 2);
}

#[tokio::test]
async fn test_load_unknown_playlist_surfaces_error() {
    let (mut app, _dir) = test_app();

    app.handle_action(Action::LoadPlaylist("nope".to_string())).await.unwrap();
    app.flush_actions().await;

    assert!(app.error_message.is_some());
    assert!(app.queue.is_empty());
}

#[tokio::test]
async fn test_delete_playlist_clears_active() {
    let (mut app, _dir) = test_app();

    app.handle_action(Action::PlaylistReady(make_playlist("pl-1", 100, make_tracks(2))))
        .await
        .unwrap();
    app.handle_action(Action::DeletePlaylist("pl-1".to_string())).await.unwrap();

    assert!(app.playlists.is_empty());
    assert!(app.active_playlist.is_none());
}

#[tokio::test]
async fn test_track_end_advances_queue() {
    let (mut app, _dir) = test_app();
    app.queue.load_tracks(make_tracks(3));
    app.queue.set_current_index(1);

    app.handle_action(Action::EngineState(EngineState::Ended)).await.unwrap();
    assert_eq!(app.queue.current_index(), 2);
}

#[tokio::test]
async fn test_track_end_with_repeat_one_stays_put() {
    let (mut app, _dir) = test_app();
    app.queue.load_tracks(make_tracks(3));
    app.queue.set_current_index(1);
    app.repeat_mode = RepeatMode::One;

    app.handle_action(Action::EngineState(EngineState::Ended)).await.unwrap();
    assert_eq!(app.queue.current_index(), 1);
}

#[tokio::test]
async fn test_track_end_wraps_at_queue_end() {
    let (mut app, _dir) = test_app();
    app.queue.load_tracks(make_tracks(3));
    app.queue.set_current_index(2);

    app.handle_action(Action::EngineState(EngineState::Ended)).await.unwrap();
    assert_eq!(app.queue.current_index(), 0);
}

#[tokio::test]
async fn test_background_pause_is_not_authoritative() {
    let (mut app, _dir) = test_app();
    app.is_playing = true;
    app.in_background = true;

    app.handle_action(Action::EngineState(EngineState::Paused)).await.unwrap();
    assert!(app.is_playing, "background pauses are transient");

    app.in_background = false;
    app.handle_action(Action::EngineState(EngineState::Paused)).await.unwrap();
    assert!(!app.is_playing, "foreground pauses stick");
}

#[tokio::test(start_paused = true)]
async fn test_engine_error_skips_after_delay() {
    let (mut app, _dir) = test_app();
    app.queue.load_tracks(make_tracks(3));

    app.handle_action(Action::EngineError("resolver failed".to_string()))
        .await
        .unwrap();
    assert_eq!(app.queue.current_index(), 0, "skip is delayed, not immediate");

    tokio::time::sleep(tokio::time::Duration::from_millis(1100)).await;
    app.flush_actions().await;
    assert_eq!(app.queue.current_index(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_track_advances_exactly_once() {
    // A failing track produces two engine signals: the error event, then the
    // process exit (reported as Ended). Only the delayed skip may advance.
    let (mut app, _dir) = test_app();
    app.queue.load_tracks(make_tracks(3));

    app.handle_action(Action::EngineError("resolver failed".to_string()))
        .await
        .unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
    app.handle_action(Action::EngineState(EngineState::Ended)).await.unwrap();
    assert_eq!(app.queue.current_index(), 0, "exit after an error must not advance");

    tokio::time::sleep(tokio::time::Duration::from_millis(600)).await;
    app.flush_actions().await;
    assert_eq!(app.queue.current_index(), 1, "one failed track, one advance");

    // The next track ending normally advances again.
    app.handle_action(Action::EngineState(EngineState::Ended)).await.unwrap();
    assert_eq!(app.queue.current_index(), 2);
}

#[tokio::test]
async fn test_remove_current_track_moves_to_successor() {
    let (mut app, _dir) = test_app();
    app.queue.load_tracks(make_tracks(2));

    app.handle_action(Action::RemoveTrack("track-0".to_string())).await.unwrap();
    assert_eq!(app.queue.len(), 1);
    assert_eq!(app.queue.current().unwrap().id, "track-1");
}

#[tokio::test]
async fn test_remove_last_track_stops_playback() {
    let (mut app, _dir) = test_app();
    app.queue.load_tracks(make_tracks(1));
    app.is_playing = true;

    app.handle_action(Action::RemoveTrack("track-0".to_string())).await.unwrap();
    assert!(app.queue.is_empty());
    assert!(!app.is_playing);
}

#[tokio::test]
async fn test_clear_queue_stops_playback() {
    let (mut app, _dir) = test_app();
    app.queue.load_tracks(make_tracks(3));
    app.is_playing = true;

    app.handle_action(Action::ClearQueue).await.unwrap();
    assert!(app.queue.is_empty());
    assert!(!app.is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_error_message_clears_itself() {
    let (mut app, _dir) = test_app();

    app.handle_action(Action::ShowError("boom".to_string())).await.unwrap();
    assert_eq!(app.error_message.as_deref(), Some("boom"));

    tokio::time::sleep(tokio::time::Duration::from_millis(5100)).await;
    app.flush_actions().await;
    assert!(app.error_message.is_none());
}

// ── Preference persistence ───────────────────────────────────────────────────

#[tokio::test]
async fn test_repeat_mode_cycles_and_persists() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");

    {
        let db = Database::open_at(&db_path).unwrap();
        let mut app = App::with_db(Config::default(), db).unwrap();
        assert_eq!(app.repeat_mode, RepeatMode::Off);
        app.handle_action(Action::CycleRepeat).await.unwrap();
        assert_eq!(app.repeat_mode, RepeatMode::One);
    }

    let db = Database::open_at(&db_path).unwrap();
    let app = App::with_db(Config::default(), db).unwrap();
    assert_eq!(app.repeat_mode, RepeatMode::One, "restored from the database");
}

#[tokio::test]
async fn test_sort_and_window_prefs_persist() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");

    {
        let db = Database::open_at(&db_path).unwrap();
        let mut app = App::with_db(Config::default(), db).unwrap();
        app.handle_action(Action::SetSort(SortOption::Top)).await.unwrap();
        app.handle_action(Action::SetWindow(TimeWindow::Month)).await.unwrap();
    }

    let db = Database::open_at(&db_path).unwrap();
    let app = App::with_db(Config::default(), db).unwrap();
    assert_eq!(app.sort, SortOption::Top);
    assert_eq!(app.window, TimeWindow::Month);
}

#[tokio::test]
async fn test_restored_volume_reaches_the_engine() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    {
        let db = Database::open_at(&db_path).unwrap();
        db.set_pref("volume", "40").unwrap();
    }

    let db = Database::open_at(&db_path).unwrap();
    let player = FakePlayer::default();
    let loads = player.loads.clone();
    let mut app = App::with_player(Config::default(), db, Box::new(player)).unwrap();
    assert_eq!(app.volume, 40.0);

    app.handle_action(Action::PlaylistReady(make_playlist("pl-1", 100, make_tracks(2))))
        .await
        .unwrap();

    let recorded = loads.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].1, 40.0, "playback starts at the restored volume");
}

#[tokio::test]
async fn test_volume_steps_persist_without_a_live_engine() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");

    {
        let db = Database::open_at(&db_path).unwrap();
        let mut app =
            App::with_player(Config::default(), db, Box::new(FakePlayer::default())).unwrap();
        assert_eq!(app.volume, 80.0);
        app.handle_action(Action::VolumeDown).await.unwrap();
        app.handle_action(Action::VolumeDown).await.unwrap();
        assert_eq!(app.volume, 70.0);
    }

    let db = Database::open_at(&db_path).unwrap();
    let app = App::with_player(Config::default(), db, Box::new(FakePlayer::default())).unwrap();
    assert_eq!(app.volume, 70.0, "restored from the database");
}
