// Playback engine adapter: drives mpv over its JSON IPC socket. yt-dlp (via
// mpv's ytdl hook) resolves the video-host URL to a playable stream. The
// adapter is a thin control surface; queue decisions live in the app.

pub mod ipc;
pub mod queue;

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::action::Action;
use self::ipc::MpvProcess;

/// Engine playback states, as reported over the action channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

/// Repeat behavior when a track ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::One,
            RepeatMode::One => RepeatMode::All,
            RepeatMode::All => RepeatMode::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::One => "one",
            RepeatMode::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(RepeatMode::Off),
            "one" => Some(RepeatMode::One),
            "all" => Some(RepeatMode::All),
            _ => None,
        }
    }
}

/// Keep-alive interval while backgrounded.
const KEEPALIVE_INTERVAL_MS: u64 = 1000;

/// The engine seam. Production is [`MpvPlayer`]; tests substitute a stub so
/// app-level tests never spawn a process.
#[async_trait]
pub trait PlayerControl: Send {
    fn set_action_tx(&mut self, tx: mpsc::UnboundedSender<Action>);

    /// Start playing a URL at the given volume, replacing any prior playback.
    async fn load(&mut self, watch_url: &str, volume: f64) -> anyhow::Result<()>;

    async fn play(&self) -> anyhow::Result<()>;
    async fn pause(&self) -> anyhow::Result<()>;
    async fn toggle_pause(&self) -> anyhow::Result<()>;
    async fn stop(&self) -> anyhow::Result<()>;
    async fn seek_to(&self, secs: f64) -> anyhow::Result<()>;
    async fn set_volume(&self, volume: f64) -> anyhow::Result<()>;
    async fn get_volume(&self) -> anyhow::Result<f64>;
    async fn background(&self);
    async fn foreground(&self);
    fn set_playing_hint(&self, playing: bool);
}

#[derive(Clone)]
pub struct MpvPlayer {
    pub socket_path: PathBuf,
    action_tx: Option<mpsc::UnboundedSender<Action>>,
    child: MpvProcess,
    /// Whether playback is supposed to be running; drives the keep-alive.
    playing_hint: Arc<AtomicBool>,
    keepalive: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl MpvPlayer {
    pub fn new() -> Self {
        let pid = std::process::id();
        Self {
            socket_path: PathBuf::from(format!("/tmp/tunefeed-mpv-{}.sock", pid)),
            action_tx: None,
            child: Arc::new(tokio::sync::Mutex::new(None)),
            playing_hint: Arc::new(AtomicBool::new(false)),
            keepalive: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    pub async fn mute(&self) -> anyhow::Result<()> {
        self.send_command(r#"{"command":["set_property","mute",true]}"#)
            .await?;
        Ok(())
    }

    pub async fn unmute(&self) -> anyhow::Result<()> {
        self.send_command(r#"{"command":["set_property","mute",false]}"#)
            .await?;
        Ok(())
    }

    pub async fn current_time(&self) -> anyhow::Result<f64> {
        self.get_f64_property("playback-time").await
    }

    pub async fn duration(&self) -> anyhow::Result<f64> {
        self.get_f64_property("duration").await
    }

    async fn send_command(&self, cmd: &str) -> anyhow::Result<String> {
        ipc::send_command(&self.socket_path, cmd).await
    }

    async fn get_f64_property(&self, name: &str) -> anyhow::Result<f64> {
        let response = self
            .send_command(&format!(r#"{{"command":["get_property","{}"]}}"#, name))
            .await?;
        let val: serde_json::Value = serde_json::from_str(&response)?;
        val.get("data")
            .and_then(|d| d.as_f64())
            .ok_or_else(|| anyhow::anyhow!("no data for property {}", name))
    }
}

#[async_trait]
impl PlayerControl for MpvPlayer {
    fn set_action_tx(&mut self, tx: mpsc::UnboundedSender<Action>) {
        self.action_tx = Some(tx);
    }

    /// Spawn mpv for the given URL, replacing any prior instance so two
    /// tracks never play over each other. The volume is applied at spawn so a
    /// restored preference takes effect before the first sample plays.
    async fn load(&mut self, watch_url: &str, volume: f64) -> anyhow::Result<()> {
        if let Some(tx) = &self.action_tx {
            tx.send(Action::PlaybackLoading).ok();
        }

        self.stop().await?;

        // Remove stale socket
        let _ = std::fs::remove_file(&self.socket_path);

        let child = Command::new("mpv")
            .arg("--no-video")
            .arg("--no-terminal")
            .arg(format!("--volume={}", volume.clamp(0.0, 100.0)))
            .arg(format!("--input-ipc-server={}", self.socket_path.display()))
            .arg(watch_url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        *self.child.lock().await = Some(child);
        self.playing_hint.store(true, Ordering::Relaxed);

        ipc::spawn_exit_monitor(self.child.clone(), self.action_tx.clone());
        ipc::spawn_event_reader(self.socket_path.clone(), self.action_tx.clone());
        ipc::spawn_position_poller(self.socket_path.clone(), self.action_tx.clone());

        Ok(())
    }

    async fn play(&self) -> anyhow::Result<()> {
        self.playing_hint.store(true, Ordering::Relaxed);
        self.send_command(r#"{"command":["set_property","pause",false]}"#)
            .await?;
        Ok(())
    }

    async fn pause(&self) -> anyhow::Result<()> {
        self.playing_hint.store(false, Ordering::Relaxed);
        self.send_command(r#"{"command":["set_property","pause",true]}"#)
            .await?;
        Ok(())
    }

    async fn toggle_pause(&self) -> anyhow::Result<()> {
        self.send_command(r#"{"command":["cycle","pause"]}"#).await?;
        Ok(())
    }

    /// Stop playback by quitting mpv. Clears the child slot first so the exit
    /// monitor doesn't mistake this for a natural track end.
    async fn stop(&self) -> anyhow::Result<()> {
        self.playing_hint.store(false, Ordering::Relaxed);
        {
            let mut guard = self.child.lock().await;
            if let Some(ref mut child) = *guard {
                let _ = child.start_kill();
            }
            *guard = None;
        }
        let _ = self.send_command(r#"{"command":["quit"]}"#).await;
        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }

    /// Seek to an absolute position in seconds.
    async fn seek_to(&self, secs: f64) -> anyhow::Result<()> {
        self.send_command(&format!(
            r#"{{"command":["seek","{}","absolute"]}}"#,
            secs
        ))
        .await?;
        Ok(())
    }

    async fn set_volume(&self, volume: f64) -> anyhow::Result<()> {
        let target = volume.clamp(0.0, 100.0);
        self.send_command(&format!(
            r#"{{"command":["set_property","volume",{}]}}"#,
            target
        ))
        .await?;
        Ok(())
    }

    async fn get_volume(&self) -> anyhow::Result<f64> {
        self.get_f64_property("volume").await
    }

    /// Entering the background: start the keep-alive that re-issues play while
    /// playback is supposed to be running. Some environments pause audio for
    /// backgrounded sessions.
    async fn background(&self) {
        let mut slot = self.keepalive.lock().await;
        if slot.is_some() {
            return;
        }
        let socket_path = self.socket_path.clone();
        let playing = self.playing_hint.clone();
        *slot = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_millis(KEEPALIVE_INTERVAL_MS))
                    .await;
                if playing.load(Ordering::Relaxed) {
                    let _ = ipc::send_command(
                        &socket_path,
                        r#"{"command":["set_property","pause",false]}"#,
                    )
                    .await;
                }
            }
        }));
    }

    /// Back to the foreground: cancel the keep-alive timer and resume once if
    /// playback was expected.
    async fn foreground(&self) {
        if let Some(handle) = self.keepalive.lock().await.take() {
            handle.abort();
        }
        if self.playing_hint.load(Ordering::Relaxed) {
            let _ = self.play().await;
        }
    }

    fn set_playing_hint(&self, playing: bool) {
        self.playing_hint.store(playing, Ordering::Relaxed);
    }
}

impl Default for MpvPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        // Kill the mpv process if still running
        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(ref mut child) = *guard {
                let _ = child.start_kill();
            }
            *guard = None;
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
