// Low-level mpv IPC: socket communication and background tasks that turn mpv
// events into engine events on the action channel.

use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::action::Action;
use crate::player::EngineState;

pub type MpvProcess = std::sync::Arc<tokio::sync::Mutex<Option<Child>>>;

// How long to wait for mpv's IPC socket to appear (20 * 100ms = 2s).
const SOCKET_POLL_ATTEMPTS: u32 = 20;
const SOCKET_POLL_INTERVAL_MS: u64 = 100;

/// Wait for the IPC socket to appear on disk (up to 2 seconds).
pub async fn wait_for_socket(path: &Path) {
    for _ in 0..SOCKET_POLL_ATTEMPTS {
        if path.exists() {
            return;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(SOCKET_POLL_INTERVAL_MS)).await;
    }
}

/// Send a single JSON command over a fresh IPC connection, return the response line.
pub async fn send_command(socket_path: &Path, cmd: &str) -> anyhow::Result<String> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to connect to mpv IPC socket: {}", e))?;
    let msg = format!("{}\n", cmd);
    stream.write_all(msg.as_bytes()).await?;
    let mut reader = BufReader::new(stream);
    let mut response = String::new();
    reader.read_line(&mut response).await?;
    Ok(response)
}

/// Poll the child process and report Ended when it exits on its own.
/// A deliberate stop clears the child slot first, so no event is sent then.
/// Error terminations also end in a process exit; the coordinator ignores
/// that Ended while an error skip is pending.
pub fn spawn_exit_monitor(child: MpvProcess, tx: Option<mpsc::UnboundedSender<Action>>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            let mut guard = child.lock().await;
            match guard.as_mut().and_then(|c| c.try_wait().ok()) {
                Some(Some(_)) => {
                    *guard = None;
                    if let Some(tx) = &tx {
                        tx.send(Action::EngineState(EngineState::Ended)).ok();
                    }
                    break;
                }
                Some(None) => {} // still running
                None => break,   // no child or wait error
            }
        }
    });
}

/// Poll playback-time once per second and forward it as PlaybackPosition.
pub fn spawn_position_poller(socket_path: PathBuf, tx: Option<mpsc::UnboundedSender<Action>>) {
    tokio::spawn(async move {
        wait_for_socket(&socket_path).await;
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
            let Ok(response) = send_command(
                &socket_path,
                r#"{"command":["get_property","playback-time"]}"#,
            )
            .await
            else {
                break;
            };

            if let Ok(val) = serde_json::from_str::<serde_json::Value>(&response) {
                if let Some(pos) = val.get("data").and_then(|d| d.as_f64()) {
                    if let Some(tx) = &tx {
                        tx.send(Action::PlaybackPosition(pos)).ok();
                    }
                }
            }
        }
    });
}

/// Read mpv's event stream and map it onto engine state changes.
///
/// file-loaded → Cued, playback-restart → Playing, pause property toggles →
/// Paused/Playing, end-file with an error reason → EngineError. A plain
/// end-of-file is not forwarded; the exit monitor reports it as Ended.
pub fn spawn_event_reader(socket_path: PathBuf, tx: Option<mpsc::UnboundedSender<Action>>) {
    tokio::spawn(async move {
        wait_for_socket(&socket_path).await;

        let Ok(stream) = UnixStream::connect(&socket_path).await else {
            return;
        };
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let observe = r#"{"command":["observe_property",1,"pause"]}"#;
        if writer
            .write_all(format!("{}\n", observe).as_bytes())
            .await
            .is_err()
        {
            return;
        }

        let send = |action: Action| {
            if let Some(tx) = &tx {
                tx.send(action).ok();
            }
        };

        while let Ok(Some(line)) = lines.next_line().await {
            let Ok(val) = serde_json::from_str::<serde_json::Value>(&line) else {
                continue;
            };
            match val.get("event").and_then(|e| e.as_str()) {
                Some("file-loaded") => send(Action::EngineState(EngineState::Cued)),
                Some("playback-restart") => send(Action::EngineState(EngineState::Playing)),
                Some("seek") => send(Action::EngineState(EngineState::Buffering)),
                Some("end-file") => {
                    let reason = val.get("reason").and_then(|r| r.as_str()).unwrap_or("");
                    if reason == "error" {
                        let detail = val
                            .get("file_error")
                            .and_then(|e| e.as_str())
                            .unwrap_or("playback failed")
                            .to_string();
                        send(Action::EngineError(detail));
                    }
                }
                Some("property-change") => {
                    if val.get("name").and_then(|n| n.as_str()) == Some("pause") {
                        match val.get("data").and_then(|d| d.as_bool()) {
                            Some(true) => send(Action::EngineState(EngineState::Paused)),
                            Some(false) => send(Action::EngineState(EngineState::Playing)),
                            None => {}
                        }
                    }
                }
                _ => {}
            }
        }
    });
}
