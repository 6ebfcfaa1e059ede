// Central coordinator: owns the queue, the player, the feed pipeline, and the
// database. Runs the event loop (stdin command → Action → handle_action).

mod fetch;
mod input;
mod playback;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::action::Action;
use crate::api::comments::Comment;
use crate::api::feed::{FeedClient, SortOption, TimeWindow};
use crate::api::gateway::FetchGateway;
use crate::config::Config;
use crate::db::Database;
use crate::player::queue::Queue;
use crate::player::{MpvPlayer, PlayerControl, RepeatMode};
use crate::playlist::{Playlist, PlaylistBuilder};

/// Default number of tracks a generated playlist aims for.
pub const DEFAULT_TARGET_TRACKS: usize = 50;

pub struct App {
    running: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,

    pub(crate) builder: PlaylistBuilder,
    pub(crate) feed_client: FeedClient,
    pub(crate) player: Box<dyn PlayerControl>,
    pub(crate) db: Database,

    // Session state
    pub queue: Queue,
    pub playlists: Vec<Playlist>,
    pub active_playlist: Option<Playlist>,
    pub comments: Option<Vec<Comment>>,
    pub repeat_mode: RepeatMode,
    pub sort: SortOption,
    pub window: TimeWindow,
    pub volume: f64,
    pub is_playing: bool,
    pub is_loading: bool,
    pub in_background: bool,
    pub position: f64,
    pub error_message: Option<String>,
    /// Set while a delayed error-skip is scheduled. The engine reports an
    /// error termination twice (error event, then process exit); only the
    /// delayed skip may advance the queue.
    pub(crate) error_skip_pending: bool,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let db = Database::open()?;
        Self::with_db(config, db)
    }

    /// Construct with an explicit database, so tests get isolated state.
    pub fn with_db(config: Config, db: Database) -> anyhow::Result<Self> {
        Self::with_player(config, db, Box::new(MpvPlayer::new()))
    }

    /// Construct with an explicit playback engine; tests inject a stub here.
    pub fn with_player(
        config: Config,
        db: Database,
        mut player: Box<dyn PlayerControl>,
    ) -> anyhow::Result<Self> {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let gateway = FetchGateway::new(&config.fetch);
        let feed_client = FeedClient::new(gateway, &config.feed);
        let builder = PlaylistBuilder::new(feed_client.clone());

        player.set_action_tx(action_tx.clone());

        let repeat_mode = db
            .get_pref("repeat_mode")?
            .and_then(|v| RepeatMode::parse(&v))
            .unwrap_or_default();
        let sort = db
            .get_pref("sort")?
            .and_then(|v| SortOption::parse(&v))
            .unwrap_or(SortOption::Hot);
        let window = db
            .get_pref("time_window")?
            .and_then(|v| TimeWindow::parse(&v))
            .unwrap_or(TimeWindow::Week);
        let volume = db
            .get_pref("volume")?
            .and_then(|v| v.parse().ok())
            .unwrap_or(80.0);
        let playlists = db.list_playlists()?;

        Ok(Self {
            running: true,
            action_tx,
            action_rx,
            builder,
            feed_client,
            player,
            db,
            queue: Queue::new(),
            playlists,
            active_playlist: None,
            comments: None,
            repeat_mode,
            sort,
            window,
            volume,
            is_playing: false,
            is_loading: false,
            in_background: false,
            position: 0.0,
            error_message: None,
            error_skip_pending: false,
        })
    }

    pub fn action_tx(&self) -> mpsc::UnboundedSender<Action> {
        self.action_tx.clone()
    }

    /// Interactive loop: stdin commands on one side, actions on the other.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("tunefeed ready. Type `help` for commands.");
        let tx = self.action_tx.clone();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while self.running {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            match input::parse_command(&line) {
                                input::Parsed::Action(action) => { tx.send(action)?; }
                                input::Parsed::Help => input::print_help(),
                                input::Parsed::Status => self.print_status(),
                                input::Parsed::Empty => {}
                                input::Parsed::Unknown(cmd) => {
                                    println!("unknown command: {} (try `help`)", cmd);
                                }
                            }
                        }
                        None => self.action_tx.send(Action::Quit)?,
                    }
                }
                Some(action) = self.action_rx.recv() => {
                    self.handle_action(action).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn handle_action(&mut self, action: Action) -> anyhow::Result<()> {
        match action {
            Action::Quit => {
                let _ = self.player.stop().await;
                self.running = false;
            }

            // Playlist lifecycle
            Action::GeneratePlaylist {
                topic,
                sort,
                window,
                target,
            } => {
                let sort = sort.unwrap_or(self.sort);
                let window = window.unwrap_or(self.window);
                self.is_loading = true;
                println!("building playlist from \"{}\" ({})…", topic, sort.as_str());
                self.spawn_generate(topic, sort, window, target);
            }
            Action::PlaylistReady(playlist) => self.playlist_ready(playlist).await?,
            Action::LoadPlaylist(id) => self.load_playlist(&id).await?,
            Action::DeletePlaylist(id) => {
                self.db.delete_playlist(&id)?;
                self.playlists = self.db.list_playlists()?;
                if self.active_playlist.as_ref().is_some_and(|p| p.id == id) {
                    self.active_playlist = None;
                }
                println!("playlist deleted");
            }
            Action::RefreshPlaylist(id) => self.refresh_playlist(&id)?,

            // Queue edits
            Action::PlayTrackAt(index) => {
                if self.queue.set_current_index(index).is_some() {
                    self.start_current_track().await?;
                }
            }
            Action::NextTrack => {
                self.error_skip_pending = false;
                if self.queue.next().is_some() {
                    self.start_current_track().await?;
                }
            }
            Action::PrevTrack => {
                if self.queue.previous().is_some() {
                    self.start_current_track().await?;
                }
            }
            Action::RemoveTrack(track_id) => self.remove_track(&track_id).await?,
            Action::ToggleShuffle => {
                // Shuffle is one atomic transition; no other queue operation
                // can observe a half-updated pointer.
                self.queue.toggle_shuffle();
                println!(
                    "shuffle {}",
                    if self.queue.is_shuffled() { "on" } else { "off" }
                );
            }
            Action::ClearQueue => {
                self.queue.clear();
                let _ = self.player.stop().await;
                self.is_playing = false;
            }

            // Playback controls
            Action::TogglePlayPause => {
                let _ = self.player.toggle_pause().await;
            }
            Action::Stop => {
                let _ = self.player.stop().await;
                self.is_playing = false;
            }
            Action::CycleRepeat => {
                self.repeat_mode = self.repeat_mode.cycle();
                self.db.set_pref("repeat_mode", self.repeat_mode.as_str())?;
                println!("repeat: {}", self.repeat_mode.as_str());
            }
            Action::SeekTo(secs) => {
                let _ = self.player.seek_to(secs).await;
            }
            Action::VolumeUp => self.adjust_volume(5.0).await?,
            Action::VolumeDown => self.adjust_volume(-5.0).await?,

            // Engine events
            Action::PlaybackLoading => self.is_loading = true,
            Action::PlaybackPosition(pos) => self.position = pos,
            Action::EngineState(state) => self.handle_engine_state(state).await?,
            Action::EngineError(detail) => self.handle_engine_error(detail),

            // Visibility
            Action::Background => {
                self.in_background = true;
                self.player.background().await;
            }
            Action::Foreground => {
                self.in_background = false;
                self.player.foreground().await;
            }

            // Comments
            Action::LoadComments { permalink } => self.spawn_fetch_comments(permalink),
            Action::CommentsLoaded(comments) => {
                input::print_comments(&comments);
                self.comments = Some(comments);
            }

            // Preferences
            Action::SetSort(sort) => {
                self.sort = sort;
                self.db.set_pref("sort", sort.as_str())?;
            }
            Action::SetWindow(window) => {
                self.window = window;
                self.db.set_pref("time_window", window.as_str())?;
            }

            // Errors
            Action::ShowError(msg) => {
                tracing::warn!(%msg, "surfacing error");
                println!("error: {}", msg);
                self.error_message = Some(msg);
                self.is_loading = false;
                let tx = self.action_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                    tx.send(Action::ClearError).ok();
                });
            }
            Action::ClearError => self.error_message = None,
        }
        Ok(())
    }

    fn print_status(&self) {
        match self.queue.current() {
            Some(track) => {
                println!(
                    "[{}/{}] {} {}",
                    self.queue.current_index() + 1,
                    self.queue.len(),
                    track.display_title(),
                    if self.is_playing { "(playing)" } else { "(stopped)" },
                );
            }
            None => println!("queue empty"),
        }
        for (i, playlist) in self.playlists.iter().enumerate() {
            println!("  {}: {} [{} tracks]", i + 1, playlist.name, playlist.tracks.len());
        }
    }

    /// Drain pending actions synchronously; used by integration tests.
    pub async fn flush_actions(&mut self) {
        while let Ok(action) = self.action_rx.try_recv() {
            let _ = self.handle_action(action).await;
        }
    }
}
