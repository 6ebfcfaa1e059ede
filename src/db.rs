// SQLite persistence for preferences and playlist history.
// Data lives in ~/.local/share/tunefeed/tunefeed.db.
//
// The live queue and current index are deliberately not persisted; every
// session starts from an empty queue.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

use crate::api::feed::{SortOption, TimeWindow};
use crate::playlist::{Playlist, Track};

/// Most-recent playlists kept; older ones are evicted on save.
pub const HISTORY_LIMIT: usize = 10;

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the SQLite database.
    pub fn open() -> anyhow::Result<Self> {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tunefeed");
        std::fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join("tunefeed.db");
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open at an explicit path; used by integration tests.
    pub fn open_at(path: &std::path::Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> anyhow::Result<()> {
        let sql = include_str!("../migrations/001_init.sql");
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    // ── Preferences ──

    pub fn get_pref(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM prefs WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_pref(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO prefs (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    // ── Playlist history ──

    /// Insert or replace a playlist, then evict everything beyond the most
    /// recent [`HISTORY_LIMIT`].
    pub fn save_playlist(&self, playlist: &Playlist) -> anyhow::Result<()> {
        let tracks_json = serde_json::to_string(&playlist.tracks)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO playlists
             (id, name, topic, sort, time_window, tracks_json, created_at, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                playlist.id,
                playlist.name,
                playlist.topic,
                playlist.sort.as_str(),
                playlist.window.as_str(),
                tracks_json,
                playlist.created_at,
                playlist.last_updated,
            ],
        )?;
        tx.execute(
            "DELETE FROM playlists WHERE id NOT IN
             (SELECT id FROM playlists ORDER BY created_at DESC, id LIMIT ?1)",
            params![HISTORY_LIMIT as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Stored playlists, most recent first.
    pub fn list_playlists(&self) -> anyhow::Result<Vec<Playlist>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, topic, sort, time_window, tracks_json, created_at, last_updated
             FROM playlists ORDER BY created_at DESC, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?;

        let mut playlists = Vec::new();
        for row in rows {
            let (id, name, topic, sort, window, tracks_json, created_at, last_updated) = row?;
            let tracks: Vec<Track> = serde_json::from_str(&tracks_json)?;
            playlists.push(Playlist {
                id,
                name,
                topic,
                sort: SortOption::parse(&sort).unwrap_or(SortOption::Hot),
                window: TimeWindow::parse(&window).unwrap_or(TimeWindow::Week),
                tracks,
                created_at,
                last_updated,
            });
        }
        Ok(playlists)
    }

    pub fn delete_playlist(&self, id: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM playlists WHERE id = ?1", params![id])?;
        Ok(())
    }
}
