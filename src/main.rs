// Entry point: checks runtime deps (mpv, yt-dlp), loads config, and runs the
// interactive shell.

mod action;
mod api;
mod app;
mod config;
mod db;
mod error;
mod logging;
mod player;
mod playlist;

use clap::Parser;

use crate::action::Action;
use crate::api::feed::{SortOption, TimeWindow};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "tunefeed", about = "Build playlists from forum feed video links and play them")]
struct Cli {
    /// Topic to build a playlist from at startup
    topic: Option<String>,
    /// Ranking mode: hot, new, top, rising
    #[arg(long)]
    sort: Option<String>,
    /// Recency window for top: hour, day, week, month, year, all
    #[arg(long)]
    time: Option<String>,
    /// Target track count
    #[arg(long, default_value_t = app::DEFAULT_TARGET_TRACKS)]
    count: usize,
}

fn check_dependencies() {
    if which::which("mpv").is_err() {
        eprintln!("Error: mpv is required but not found. Install it first.");
        std::process::exit(1);
    }

    if which::which("yt-dlp").is_err() {
        eprintln!("Warning: yt-dlp not found. Video-host playback may not work.");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    check_dependencies();

    let config = Config::load().unwrap_or_default();
    logging::init()?;

    let mut app = app::App::new(config)?;

    if let Some(topic) = cli.topic {
        app.action_tx().send(Action::GeneratePlaylist {
            topic,
            sort: cli.sort.as_deref().and_then(SortOption::parse),
            window: cli.time.as_deref().and_then(TimeWindow::parse),
            target: cli.count,
        })?;
    }

    app.run().await?;

    Ok(())
}
