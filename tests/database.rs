// Persistence: preference storage and the bounded playlist history.

use tempfile::TempDir;

use tunefeed::api::feed::{SortOption, TimeWindow};
use tunefeed::db::{Database, HISTORY_LIMIT};
use tunefeed::playlist::{Playlist, Track};

fn test_db() -> (Database, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(&dir.path().join("test.db")).unwrap();
    (db, dir)
}

fn make_playlist(id: &str, created_at: i64) -> Playlist {
    Playlist {
        id: id.to_string(),
        name: format!("playlist {}", id),
        topic: "indieheads".to_string(),
        sort: SortOption::Top,
        window: TimeWindow::Month,
        tracks: vec![Track {
            id: format!("{}-t0", id),
            video_id: "aaaaaaaaa00".to_string(),
            title: "Song".to_string(),
            artist: Some("Artist".to_string()),
            source_url: Some("https://www.reddit.com/r/indieheads/comments/x/y/".to_string()),
            thumbnail_url: Some("https://img.youtube.com/vi/aaaaaaaaa00/mqdefault.jpg".to_string()),
            added_at: created_at,
        }],
        created_at,
        last_updated: created_at,
    }
}

#[test]
fn test_prefs_roundtrip_and_overwrite() {
    let (db, _dir) = test_db();

    assert!(db.get_pref("volume").unwrap().is_none());

    db.set_pref("volume", "80").unwrap();
    assert_eq!(db.get_pref("volume").unwrap().as_deref(), Some("80"));

    db.set_pref("volume", "55").unwrap();
    assert_eq!(db.get_pref("volume").unwrap().as_deref(), Some("55"));
}

#[test]
fn test_playlist_roundtrip() {
    let (db, _dir) = test_db();

    db.save_playlist(&make_playlist("pl-1", 100)).unwrap();
    let loaded = db.list_playlists().unwrap();

    assert_eq!(loaded.len(), 1);
    let playlist = &loaded[0];
    assert_eq!(playlist.id, "pl-1");
    assert_eq!(playlist.sort, SortOption::Top);
    assert_eq!(playlist.window, TimeWindow::Month);
    assert_eq!(playlist.tracks.len(), 1);
    assert_eq!(playlist.tracks[0].artist.as_deref(), Some("Artist"));
}

#[test]
fn test_playlists_listed_most_recent_first() {
    let (db, _dir) = test_db();

    db.save_playlist(&make_playlist("pl-old", 100)).unwrap();
    db.save_playlist(&make_playlist("pl-new", 300)).unwrap();
    db.save_playlist(&make_playlist("pl-mid", 200)).unwrap();

    let ids: Vec<String> = db.list_playlists().unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, ["pl-new", "pl-mid", "pl-old"]);
}

#[test]
fn test_saving_same_id_replaces_instead_of_duplicating() {
    let (db, _dir) = test_db();

    db.save_playlist(&make_playlist("pl-1", 100)).unwrap();
    let mut updated = make_playlist("pl-1", 100);
    updated.name = "renamed".to_string();
    db.save_playlist(&updated).unwrap();

    let loaded = db.list_playlists().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "renamed");
}

#[test]
fn test_history_evicts_oldest_beyond_limit() {
    let (db, _dir) = test_db();

    for i in 0..(HISTORY_LIMIT + 2) {
        db.save_playlist(&make_playlist(&format!("pl-{:02}", i), i as i64)).unwrap();
    }

    let loaded = db.list_playlists().unwrap();
    assert_eq!(loaded.len(), HISTORY_LIMIT);
    let ids: Vec<&str> = loaded.iter().map(|p| p.id.as_str()).collect();
    assert!(!ids.contains(&"pl-00"), "oldest evicted");
    assert!(!ids.contains(&"pl-01"), "second-oldest evicted");
    assert_eq!(ids[0], "pl-11", "newest kept");
}

#[test]
fn test_delete_playlist() {
    let (db, _dir) = test_db();

    db.save_playlist(&make_playlist("pl-1", 100)).unwrap();
    db.save_playlist(&make_playlist("pl-2", 200)).unwrap();
    db.delete_playlist("pl-1").unwrap();

    let ids: Vec<String> = db.list_playlists().unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, ["pl-2"]);
}

#[test]
fn test_reopen_preserves_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");

    {
        let db = Database::open_at(&path).unwrap();
        db.set_pref("sort", "top").unwrap();
        db.save_playlist(&make_playlist("pl-1", 100)).unwrap();
    }

    let db = Database::open_at(&path).unwrap();
    assert_eq!(db.get_pref("sort").unwrap().as_deref(), Some("top"));
    assert_eq!(db.list_playlists().unwrap().len(), 1);
}
