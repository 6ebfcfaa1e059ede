// Playback and queue reconciliation: starting tracks, reacting to engine
// events, volume.

use crate::action::Action;
use crate::app::App;
use crate::player::{EngineState, RepeatMode};

/// Pause before skipping a failed track, so a run of dead links doesn't turn
/// into a tight loop.
const ERROR_SKIP_DELAY_MS: u64 = 1000;

impl App {
    /// React to a fresh playlist: persist it to history, swap the queue, and
    /// start playback from the top. Any prior playback is stopped first so a
    /// stale instance can't keep playing over the new one.
    pub(super) async fn playlist_ready(&mut self, playlist: crate::playlist::Playlist) -> anyhow::Result<()> {
        let _ = self.player.stop().await;
        self.is_loading = false;
        self.db.save_playlist(&playlist)?;
        self.playlists = self.db.list_playlists()?;
        self.queue.load_tracks(playlist.tracks.clone());
        println!(
            "playlist \"{}\" ready: {} tracks",
            playlist.name,
            playlist.tracks.len()
        );
        self.active_playlist = Some(playlist);
        self.start_current_track().await?;
        Ok(())
    }

    /// Load a stored playlist into the queue. `id` may be the playlist's UUID
    /// or its 1-based position in the history listing.
    pub(super) async fn load_playlist(&mut self, id: &str) -> anyhow::Result<()> {
        let playlist = if let Ok(index) = id.parse::<usize>() {
            self.playlists.get(index.wrapping_sub(1)).cloned()
        } else {
            self.playlists.iter().find(|p| p.id == id).cloned()
        };
        let Some(playlist) = playlist else {
            self.action_tx().send(Action::ShowError(format!("no such playlist: {}", id)))?;
            return Ok(());
        };

        let _ = self.player.stop().await;
        self.queue.load_tracks(playlist.tracks.clone());
        self.active_playlist = Some(playlist);
        self.start_current_track().await?;
        Ok(())
    }

    /// Rebuild a stored playlist with its topic and the current sort/window
    /// preferences.
    pub(super) fn refresh_playlist(&mut self, id: &str) -> anyhow::Result<()> {
        let Some(playlist) = self.playlists.iter().find(|p| p.id == id) else {
            self.action_tx().send(Action::ShowError(format!("no such playlist: {}", id)))?;
            return Ok(());
        };
        self.action_tx().send(Action::GeneratePlaylist {
            topic: playlist.topic.clone(),
            sort: Some(self.sort),
            window: Some(self.window),
            target: super::DEFAULT_TARGET_TRACKS,
        })?;
        Ok(())
    }

    pub(super) async fn remove_track(&mut self, track_id: &str) -> anyhow::Result<()> {
        let was_current = self.queue.current().is_some_and(|t| t.id == track_id);
        self.queue.remove(track_id);
        if self.queue.is_empty() {
            let _ = self.player.stop().await;
            self.is_playing = false;
        } else if was_current {
            self.start_current_track().await?;
        }
        Ok(())
    }

    /// Point the player at the current track.
    pub(super) async fn start_current_track(&mut self) -> anyhow::Result<()> {
        let Some(track) = self.queue.current() else {
            return Ok(());
        };
        let url = track.watch_url();
        let title = track.display_title();

        self.is_loading = true;
        println!("▶ {}", title);
        let volume = self.volume;
        if let Err(e) = self.player.load(&url, volume).await {
            self.action_tx().send(Action::ShowError(e.to_string()))?;
        }
        Ok(())
    }

    /// Reconcile an asynchronous engine state change with the queue.
    pub(super) async fn handle_engine_state(&mut self, state: EngineState) -> anyhow::Result<()> {
        match state {
            EngineState::Ended => {
                // An error termination surfaces twice: the error event, then
                // the process exit. The delayed skip owns the advance.
                if self.error_skip_pending {
                    return Ok(());
                }
                if self.repeat_mode == RepeatMode::One {
                    // Same track, same index, from the top.
                    self.start_current_track().await?;
                } else if self.queue.next().is_some() {
                    self.start_current_track().await?;
                } else {
                    self.is_playing = false;
                }
            }
            EngineState::Playing => {
                self.is_loading = false;
                self.is_playing = true;
                self.player.set_playing_hint(true);
            }
            EngineState::Paused => {
                // In the background a pause isn't authoritative; the
                // keep-alive re-issues play while the playing hint holds.
                if !self.in_background {
                    self.is_playing = false;
                    self.player.set_playing_hint(false);
                }
            }
            EngineState::Buffering => self.is_loading = true,
            EngineState::Cued => self.is_loading = false,
            EngineState::Unstarted => {}
        }
        Ok(())
    }

    /// A broken link never halts the session: wait briefly, then skip. The
    /// failing track is not retried.
    pub(super) fn handle_engine_error(&mut self, detail: String) {
        tracing::warn!(%detail, "engine error, skipping track");
        self.is_loading = false;
        self.error_skip_pending = true;
        let tx = self.action_tx();
        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(ERROR_SKIP_DELAY_MS)).await;
            tx.send(Action::NextTrack).ok();
        });
    }

    /// Step the volume and persist the result. The engine's live value wins
    /// when it answers; otherwise the step applies to the restored preference
    /// so the next spawn picks it up.
    pub(super) async fn adjust_volume(&mut self, delta: f64) -> anyhow::Result<()> {
        let current = self.player.get_volume().await.unwrap_or(self.volume);
        let target = (current + delta).clamp(0.0, 100.0);
        let _ = self.player.set_volume(target).await;
        self.volume = target;
        self.db.set_pref("volume", &target.to_string())?;
        Ok(())
    }
}
